//! Rowboat Core - Primitives for parallel delimited-text reading
//!
//! This crate provides the pure, I/O-free building blocks shared by the
//! reader driver and its collaborators:
//!
//! - Chunk coordinates with boundary-certainty flags
//! - The chunking planner
//! - Delimiter dialect and record-shape policies
//! - Error types
//! - Security limits

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod coords;
pub mod dialect;
pub mod error;
pub mod limits;
pub mod plan;

// Re-export commonly used types
pub use coords::ChunkCoordinates;
pub use dialect::{Dialect, HeaderMode, RaggedMode};
pub use error::{ReadError, Result};
pub use limits::Limits;
pub use plan::ChunkPlan;
