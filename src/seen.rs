use crate::error::StoreError;
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Identifiers of listings that have already been notified.
///
/// Members are kept ordered so persisting the same membership always writes
/// the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenSet {
    identifiers: BTreeSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.identifiers.contains(identifier)
    }

    /// Adds an identifier in memory only. Returns false if it was already present.
    pub fn add(&mut self, identifier: impl Into<String>) -> bool {
        self.identifiers.insert(identifier.into())
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.identifiers.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for SeenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            identifiers: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Durable storage for a [`SeenSet`]
pub trait SeenStore: Send + Sync {
    /// Load the stored set. A store that was never written yields an empty set.
    fn load(&self) -> Result<SeenSet, StoreError>;

    /// Replace the stored set with `set`
    fn persist(&self, set: &SeenSet) -> Result<(), StoreError>;
}

impl<T: SeenStore + ?Sized> SeenStore for Arc<T> {
    fn load(&self) -> Result<SeenSet, StoreError> {
        (**self).load()
    }

    fn persist(&self, set: &SeenSet) -> Result<(), StoreError> {
        (**self).persist(set)
    }
}

/// Stores the seen set as a JSON array of strings in a single file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Sibling file the new contents are written to before being renamed into place
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "seen".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl SeenStore for JsonFileStore {
    fn load(&self) -> Result<SeenSet, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                ::log::info!(
                    "No seen store at {}, starting with an empty set",
                    self.path.display()
                );
                return Ok(SeenSet::new());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let identifiers: Vec<String> =
            serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        ::log::debug!(
            "Loaded {} seen identifiers from {}",
            identifiers.len(),
            self.path.display()
        );
        Ok(identifiers.into_iter().collect())
    }

    fn persist(&self, set: &SeenSet) -> Result<(), StoreError> {
        let identifiers: Vec<&str> = set.iter().collect();
        let json = serde_json::to_string_pretty(&identifiers)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
            }
        }

        let staging = self.staging_path();
        fs::write(&staging, json).map_err(|e| self.write_error(e))?;
        fs::rename(&staging, &self.path).map_err(|e| self.write_error(e))?;

        ::log::debug!(
            "Persisted {} seen identifiers to {}",
            set.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Keeps the seen set in memory without touching disk
#[derive(Debug, Default)]
pub struct MemoryStore {
    stored: Mutex<Option<SeenSet>>,
    persist_count: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `set`
    pub fn with_set(set: SeenSet) -> Self {
        Self {
            stored: Mutex::new(Some(set)),
            persist_count: Mutex::new(0),
        }
    }

    /// The last persisted set, if any
    pub fn stored(&self) -> Option<SeenSet> {
        self.stored.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of times `persist` was called
    pub fn persist_count(&self) -> usize {
        *self.persist_count.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SeenStore for MemoryStore {
    fn load(&self) -> Result<SeenSet, StoreError> {
        Ok(self.stored().unwrap_or_default())
    }

    fn persist(&self, set: &SeenSet) -> Result<(), StoreError> {
        *self.stored.lock().unwrap_or_else(|e| e.into_inner()) = Some(set.clone());
        *self.persist_count.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}
