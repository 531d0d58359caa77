//! Nexus - catalogue ingestion core.
//!
//! This crate provides a unified interface to the Nexus library crates used
//! by the governance console's catalogue upload workflow.
//!
//! # Crates
//!
//! - [`nexus_common`] - Common utilities (bounded binary reading)
//! - [`nexus_zip`] - ZIP central directory indexing
//! - [`nexus_catalogue`] - Catalogue CSV parsing and validation
//!
//! On top of those it adds the host-side pieces of the workflow:
//!
//! - [`session`] - Background indexing where the latest selection wins
//! - [`draft`] - Best-effort cache of the last validated catalogue
//!
//! # Example
//!
//! ```no_run
//! use nexus::prelude::*;
//!
//! let session = IndexSession::new();
//! let token = session.select_zip(FileBlob::open("images.zip")?);
//! let index = session.wait(token)?;
//!
//! let csv = std::fs::read_to_string("catalogue.csv")?;
//! let outcome = validate_csv(&csv, Some(&index), &ValidatorConfig::default());
//! println!("{}", outcome.summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod draft;
mod error;
pub mod session;

pub use error::{Error, Result};

// Re-export all sub-crates
pub use nexus_catalogue as catalogue;
pub use nexus_common as common;
pub use nexus_zip as zip;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::draft::{Draft, DraftStore};
    pub use crate::session::{IndexSession, SelectionToken, SessionEvent};
    pub use nexus_catalogue::{
        parse_csv, validate, validate_csv, ErrorKind, NormalizedCatalogue, ValidationError,
        ValidationOutcome, ValidatorConfig,
    };
    pub use nexus_zip::{build_index, ArchiveIndex, BlobSource, FileBlob};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
