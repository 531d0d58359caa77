//! Best-effort cache of the last validated catalogue.
//!
//! A validated catalogue is kept in three fixed slots so that an operator
//! can pick the upload up again after a restart. Writing the cache must
//! never fail a validation, so [`DraftStore::save`] logs I/O problems and
//! reports them only through its return value.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use nexus_catalogue::{NormalizedCatalogue, Result};

/// Slot holding the normalized CSV text.
pub const CSV_SLOT: &str = "catalogue_csv";
/// Slot holding the original CSV file name.
pub const FILENAME_SLOT: &str = "catalogue_filename";
/// Slot holding the extra-columns JSON.
pub const EXTRAS_SLOT: &str = "catalogue_extras";

/// A cached, validated catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    /// Name of the CSV file the operator selected.
    pub filename: String,
    /// Normalized CSV text.
    pub csv: String,
    /// Extra-columns JSON, if the CSV had columns outside the schema.
    pub extras: Option<String>,
}

impl Draft {
    /// Capture a validated catalogue.
    ///
    /// Fails only if the catalogue cannot be written as CSV. Extra columns
    /// that cannot be serialized are left out of the draft.
    pub fn from_catalogue(
        filename: impl Into<String>,
        catalogue: &NormalizedCatalogue,
    ) -> Result<Self> {
        let extras = catalogue.extra.as_ref().and_then(|extra| match extra.to_json() {
            Ok(json) => Some(json),
            Err(e) => {
                warn!(error = %e, "could not serialize extra columns");
                None
            }
        });

        Ok(Self {
            filename: filename.into(),
            csv: catalogue.to_csv()?,
            extras,
        })
    }
}

/// Directory-backed key-value store with one file per slot.
#[derive(Debug, Clone)]
pub struct DraftStore {
    dir: PathBuf,
}

impl DraftStore {
    /// Use `dir` for the slots. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the slots.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Overwrite all slots with `draft`.
    ///
    /// Returns `false` if the draft could not be written.
    pub fn save(&self, draft: &Draft) -> bool {
        match self.try_save(draft) {
            Ok(()) => {
                debug!(dir = %self.dir.display(), "saved catalogue draft");
                true
            }
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "failed to save catalogue draft");
                false
            }
        }
    }

    /// Read the cached draft.
    ///
    /// Returns `None` unless both the CSV and file name slots are present.
    pub fn load(&self) -> Option<Draft> {
        let csv = fs::read_to_string(self.slot(CSV_SLOT)).ok()?;
        let filename = fs::read_to_string(self.slot(FILENAME_SLOT)).ok()?;
        let extras = fs::read_to_string(self.slot(EXTRAS_SLOT)).ok();

        Some(Draft {
            filename,
            csv,
            extras,
        })
    }

    /// Remove every slot. Missing slots are ignored.
    pub fn clear(&self) {
        for name in [CSV_SLOT, FILENAME_SLOT, EXTRAS_SLOT] {
            remove_slot(&self.slot(name));
        }
    }

    fn try_save(&self, draft: &Draft) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.slot(CSV_SLOT), &draft.csv)?;
        fs::write(self.slot(FILENAME_SLOT), &draft.filename)?;

        match &draft.extras {
            Some(json) => fs::write(self.slot(EXTRAS_SLOT), json)?,
            None => remove_slot(&self.slot(EXTRAS_SLOT)),
        }
        Ok(())
    }

    fn slot(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

fn remove_slot(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove draft slot"),
    }
}
