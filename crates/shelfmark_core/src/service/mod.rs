//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep callers decoupled from storage details.

pub mod catalog_service;
pub mod loan_service;
pub mod review_service;
pub mod stats_service;
