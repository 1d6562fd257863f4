//! JSON file storage for the collection.
//!
//! The [`JsonStore`] struct reads the collection once at the start of a run
//! and writes it once at the end.
//!
//! **Guarantees:**
//! - A missing or blank file loads as an empty collection
//! - A corrupt file is handled per [`CorruptStatePolicy`]
//! - `save` writes to a temp file and renames it, so the previous good state
//!   survives a failed write

use std::path::PathBuf;

use feedcollector_shared::{Collection, CollectorError, CorruptStatePolicy, Result, write_atomic};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::{debug, info, instrument, warn};

/// Handle to the on-disk collection file.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
    on_corrupt: CorruptStatePolicy,
}

impl JsonStore {
    /// Create a store for `path`. Nothing is read until [`JsonStore::load`].
    pub fn new(path: impl Into<PathBuf>, on_corrupt: CorruptStatePolicy) -> Self {
        Self {
            path: path.into(),
            on_corrupt,
        }
    }

    /// Load the stored collection.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Collection> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no stored collection, starting empty");
                return Ok(Collection::empty());
            }
            Err(e) => return Err(CollectorError::storage_read(&self.path, e.to_string())),
        };

        if content.trim().is_empty() {
            debug!("stored collection is blank, starting empty");
            return Ok(Collection::empty());
        }

        match serde_json::from_str::<Collection>(&content) {
            Ok(collection) => {
                info!(items = collection.len(), "loaded collection");
                Ok(collection)
            }
            Err(e) => match self.on_corrupt {
                CorruptStatePolicy::Fail => {
                    Err(CollectorError::storage_read(&self.path, e.to_string()))
                }
                CorruptStatePolicy::Reset => {
                    warn!(error = %e, "stored collection is corrupt, starting empty");
                    Ok(Collection::empty())
                }
            },
        }
    }

    /// Persist the collection, replacing the previous file atomically.
    #[instrument(skip_all, fields(path = %self.path.display(), items = collection.len()))]
    pub fn save(&self, collection: &Collection) -> Result<()> {
        let bytes = encode(collection)?;
        write_atomic(&self.path, &bytes)
            .map_err(|e| CollectorError::storage_write(&self.path, e))?;
        debug!(bytes = bytes.len(), "saved collection");
        Ok(())
    }
}

/// Serialize a collection the way it is stored: 4-space indent, trailing newline.
pub fn encode(collection: &Collection) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = Serializer::with_formatter(&mut buf, formatter);
    collection
        .serialize(&mut ser)
        .map_err(|e| CollectorError::validation(format!("JSON serialization failed: {e}")))?;
    buf.push(b'\n');
    Ok(buf)
}
