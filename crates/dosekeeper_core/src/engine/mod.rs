//! Dose readiness and audit engine.
//!
//! # Responsibility
//! - Resolve effective dosing frequency (`frequency`).
//! - Compute readiness from the last dose and `now` (`readiness`).
//! - Diff assignment updates into audit entries (`audit`).
//! - Normalize and bound administration timestamps (`temporal`).
//! - Guard assignment identity uniqueness (`conflict`).
//!
//! # Invariants
//! - Rule functions are pure: no I/O, no shared state, and `now` is an
//!   argument. Only `SystemClock` reads the wall clock.
//! - Failures are returned as `EngineError` variants, never panics.

pub mod audit;
pub mod clock;
pub mod conflict;
pub mod error;
pub mod frequency;
pub mod lookup;
pub mod readiness;
pub mod temporal;
