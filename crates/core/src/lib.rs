//! Domain core for the Perfolio profile service.
//!
//! Pure logic and the seams the persistence and HTTP layers plug into.
//! Nothing in this crate talks to a database directly.

pub mod error;
pub mod types;
pub mod widgets;
