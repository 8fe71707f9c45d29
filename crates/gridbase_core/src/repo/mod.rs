//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for grids.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Rank writes happen only here, one record per write.
//! - Repository APIs return semantic errors (`*NotFound`, `StaleNeighbor`,
//!   `DuplicateRank`) in addition to DB transport errors.

pub mod grid_repo;
