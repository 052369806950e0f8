//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate engine rules and repository calls into use-case APIs.
//! - Read "now" from an injected `Clock`.
//! - Log mutations and failures as metadata-only events.

pub mod administration_service;
pub mod assignment_service;
pub mod catalog_service;
pub mod inventory_service;
