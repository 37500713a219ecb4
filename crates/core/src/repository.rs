//! Storage for finished presentations.
//!
//! Presentations are persisted in the joined text format and re-hydrated on
//! load, so what comes back out is exactly what a re-parse of the stored
//! content yields.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::export::TextExporter;
use crate::types::{Presentation, PresentationSummary, StoredPresentation};

/// Extension of stored presentation files.
const STORED_EXTENSION: &str = "json";

/// History of past presentations.
pub trait PresentationRepository {
    /// Insert or replace a presentation.
    fn save(&self, presentation: &Presentation) -> Result<()>;

    /// Summaries of all stored presentations, newest first.
    fn list(&self) -> Result<Vec<PresentationSummary>>;

    /// Load one presentation by id.
    fn get(&self, id: &str) -> Result<Option<Presentation>>;
}

fn newest_first(summaries: &mut [PresentationSummary]) {
    summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// In-process repository.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    exporter: TextExporter,
    entries: RwLock<HashMap<String, StoredPresentation>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresentationRepository for MemoryRepository {
    fn save(&self, presentation: &Presentation) -> Result<()> {
        let stored = self.exporter.to_stored(presentation);
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(stored.id.clone(), stored);
        Ok(())
    }

    fn list(&self) -> Result<Vec<PresentationSummary>> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut summaries: Vec<PresentationSummary> =
            entries.values().map(summary_of).collect();
        newest_first(&mut summaries);
        Ok(summaries)
    }

    fn get(&self, id: &str) -> Result<Option<Presentation>> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries
            .get(id)
            .cloned()
            .map(|stored| self.exporter.from_stored(stored)))
    }
}

fn summary_of(stored: &StoredPresentation) -> PresentationSummary {
    PresentationSummary {
        id: stored.id.clone(),
        title: stored.title.clone(),
        status: stored.status,
        output_file_path: stored.output_file_path.clone(),
        created_at: stored.created_at,
    }
}

/// Repository keeping one JSON file per presentation in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    root: PathBuf,
    exporter: TextExporter,
}

impl DirectoryRepository {
    /// Open a repository rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            exporter: TextExporter::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid presentation id {:?}", id),
            )));
        }
        Ok(self.root.join(format!("{}.{}", id, STORED_EXTENSION)))
    }

    fn read_stored(&self, path: &Path) -> Result<StoredPresentation> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

impl PresentationRepository for DirectoryRepository {
    fn save(&self, presentation: &Presentation) -> Result<()> {
        let path = self.path_for(&presentation.id)?;
        let stored = self.exporter.to_stored(presentation);
        let data = serde_json::to_string_pretty(&stored)?;

        // Write then rename so a crash never leaves a half-written entry.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path)?;

        log::debug!("Saved presentation {} to {}", presentation.id, path.display());
        Ok(())
    }

    fn list(&self) -> Result<Vec<PresentationSummary>> {
        let mut summaries = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(STORED_EXTENSION) {
                continue;
            }
            match self.read_stored(&path) {
                Ok(stored) => summaries.push(summary_of(&stored)),
                Err(e) => log::warn!("Skipping unreadable entry {}: {}", path.display(), e),
            }
        }

        newest_first(&mut summaries);
        Ok(summaries)
    }

    fn get(&self, id: &str) -> Result<Option<Presentation>> {
        let path = match self.path_for(id) {
            Ok(path) => path,
            Err(_) => return Ok(None),
        };
        if !path.exists() {
            return Ok(None);
        }

        let stored = self.read_stored(&path)?;
        Ok(Some(self.exporter.from_stored(stored)))
    }
}
