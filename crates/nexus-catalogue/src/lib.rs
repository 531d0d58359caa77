//! Catalogue CSV validation.
//!
//! A catalogue upload is a CSV file describing products plus a ZIP archive
//! holding their images under `garments/{id}/`. This crate checks the CSV
//! against the fixed catalogue schema and cross-checks every referenced
//! image against an [`ArchiveIndex`](nexus_zip::ArchiveIndex).
//!
//! - [`parse_csv`] - Trimmed, ragged-tolerant CSV reading into a [`ParsedTable`]
//! - [`validate`] - Schema, row and image checks producing a [`ValidationOutcome`]
//! - [`NormalizedCatalogue`] - Re-serialized CSV in schema order plus extra columns
//!
//! Validation failures are data, not errors: every violated rule yields one
//! [`ValidationError`] and the caller decides how many to show.
//!
//! # Example
//!
//! ```
//! use nexus_catalogue::{parse_csv, validate, ValidatorConfig};
//!
//! let table = parse_csv("id,Name\n1,Shirt\n");
//! let outcome = validate(&table, None, &ValidatorConfig::default());
//!
//! assert!(!outcome.is_valid());
//! println!("{}", outcome.summary());
//! ```

mod config;
mod error;
mod normalize;
mod report;
pub mod schema;
mod table;
mod validator;

pub use config::ValidatorConfig;
pub use error::{Error, Result};
pub use normalize::{ExtraColumns, ExtraRecord, NormalizedCatalogue};
pub use report::{ErrorKind, ImageType, ValidationError};
pub use table::{parse_csv, ParsedTable, Row};
pub use validator::{validate, validate_csv, ValidationOutcome};
