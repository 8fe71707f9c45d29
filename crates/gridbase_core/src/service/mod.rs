//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Publish committed changes on the injected event bus.
//! - Keep API layers decoupled from storage details.

pub mod grid_service;
