//! One JSON file per owner under a data directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::core::types::{OwnerId, Result};
use crate::storage::ShapePersistence;
use crate::storage::schema::OwnerDocument;

/// Directory of `<owner-uuid>.json` files
#[derive(Clone, Debug)]
pub struct ShapeStore {
    dir: PathBuf,
}

impl ShapeStore {
    /// Open (and create if needed) the data directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `owner`'s shapes
    pub fn path_for(&self, owner: OwnerId) -> PathBuf {
        self.dir.join(format!("{owner}.json"))
    }

    /// Read an owner's document. A missing file is an empty document.
    pub fn load(&self, owner: OwnerId) -> Result<OwnerDocument> {
        let path = self.path_for(owner);
        match fs::read_to_string(&path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(OwnerDocument::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write an owner's document, replacing the previous file atomically
    pub fn save(&self, owner: OwnerId, doc: &OwnerDocument) -> Result<()> {
        let path = self.path_for(owner);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(doc)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        log::debug!("Saved {} shapes for {owner} to {}", doc.len(), path.display());
        Ok(())
    }

    /// Owners that have a file in the directory
    pub fn owners(&self) -> Result<Vec<OwnerId>> {
        let mut owners = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match OwnerId::parse_str(stem) {
                Ok(id) => owners.push(id),
                Err(_) => log::warn!("Ignoring {}: not an owner file", path.display()),
            }
        }
        owners.sort();
        Ok(owners)
    }
}

impl ShapePersistence for ShapeStore {
    fn load(&self, owner: OwnerId) -> Result<OwnerDocument> {
        ShapeStore::load(self, owner)
    }

    fn flush(&self, owner: OwnerId, doc: OwnerDocument) {
        if let Err(e) = self.save(owner, &doc) {
            log::error!("Failed to save shapes for {owner}: {e}");
        }
    }

    fn sync(&self) {}
}
