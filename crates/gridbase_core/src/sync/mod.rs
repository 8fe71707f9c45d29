//! Live-update relay between writers and observers of a table.
//!
//! # Responsibility
//! - Fan committed table changes out to every connected observer.
//! - Stay injectable: services receive a bus handle, never a global.

pub mod event_bus;
