//! Grid domain model.
//!
//! # Responsibility
//! - Define the records shared by repository, service and view layers.
//! - Keep column type rules in one closed sum type.
//!
//! # Invariants
//! - Every domain object is identified by a stable UUID.
//! - Row and column order is carried only by `Rank` values.

pub mod column;
pub mod grid;
