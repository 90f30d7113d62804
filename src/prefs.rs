//! Persistence for the [`Preferences`] record.
//!
//! The record is stored as JSON in a single file whose location is given when the
//! [`PreferenceStore`] is created. A missing file is not an error: it loads as the empty
//! record. A file that exists but cannot be parsed is reported as
//! [`Error::MalformedPersistedState`] and is never silently replaced.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::{debug, trace};

use crate::{errors::Error, types::Preferences};

/// Conventional name of the preferences file, relative to the working directory
pub const DEFAULT_PREFERENCES_FILE: &str = "dashboard_config.json";

/// Loads and saves [`Preferences`] at a fixed location.
///
/// # Limitations
/// Last writer wins. There is no locking between processes sharing the same file.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    /// Creates a store backed by the file at `path`. Nothing is read or written yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the location of the preferences file
    #[must_use]
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored record.
    ///
    /// Returns [`Preferences::default`] if the file does not exist.
    /// # Errors
    /// - [`Error::Io`] if the file exists but cannot be read
    /// - [`Error::MalformedPersistedState`] if the file content is not a valid record
    pub fn load(&self) -> Result<Preferences, Error> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No preferences at {}, using empty preferences", self.path.display());
                return Ok(Preferences::default());
            }
            Err(source) => {
                return Err(Error::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let preferences: Preferences =
            serde_json::from_slice(&data).map_err(|source| Error::MalformedPersistedState {
                path: self.path.clone(),
                source,
            })?;
        trace!("Loaded {preferences:?} from {}", self.path.display());
        Ok(preferences)
    }

    /// Writes `preferences` to the file, replacing whatever was there.
    /// # Errors
    /// [`Error::Io`] if the file cannot be written
    pub fn save(&self, preferences: &Preferences) -> Result<(), Error> {
        let data = serde_json::to_string_pretty(preferences).map_err(Error::Encode)?;
        fs::write(&self.path, data).map_err(|source| Error::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!("Saved preferences to {}", self.path.display());
        Ok(())
    }
}
