//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate record store calls into request/response operations.
//! - Keep transport layers decoupled from storage details.

pub mod registry_service;
