//! Common utilities for Nexus.
//!
//! This crate provides the foundational pieces shared by the archive and
//! catalogue crates:
//!
//! - [`BinaryReader`] - Bounds-checked little-endian reading from byte slices
//! - [`Error`] - Errors raised while reading binary records

mod error;
mod reader;

pub use error::{Error, Result};
pub use reader::BinaryReader;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
