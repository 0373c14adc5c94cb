//! Upload store: accepted files on disk plus an in-memory index.
//!
//! Records are written once and only read afterwards. Ids have the form
//! `{uuid}_{sanitised filename}` and are only ever looked up in the index,
//! never joined onto a path directly.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

use crate::error::UploadError;

/// Metadata for one accepted file.
#[derive(Debug, Clone)]
pub struct Upload {
    pub id: String,
    pub original_name: String,
    pub size: usize,
    pub content_type: String,
    pub location: PathBuf,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    index: Arc<RwLock<HashMap<String, Upload>>>,
}

impl UploadStore {
    /// Create the store, making sure the upload directory exists.
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            index: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist bytes under a fresh id and index the record.
    pub async fn save(&self, original_name: &str, data: &[u8]) -> Result<Upload, UploadError> {
        let safe_name = secure_filename(original_name);
        let id = format!("{}_{}", Uuid::new_v4().simple(), safe_name);
        let location = self.root.join(&id);

        tokio::fs::write(&location, data).await?;

        let upload = Upload {
            content_type: content_type_for(&safe_name),
            id: id.clone(),
            original_name: safe_name,
            size: data.len(),
            location,
            sha256: format!("{:x}", Sha256::digest(data)),
        };

        self.index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, upload.clone());
        tracing::debug!("UploadStore: stored '{}' ({} bytes)", upload.id, upload.size);
        Ok(upload)
    }

    pub fn get(&self, id: &str) -> Option<Upload> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Fetch the record and its bytes.
    pub async fn load(&self, id: &str) -> Result<(Upload, Vec<u8>), UploadError> {
        let upload = self
            .get(id)
            .ok_or_else(|| UploadError::NotFound(id.to_string()))?;

        let data = match tokio::fs::read(&upload.location).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UploadError::NotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok((upload, data))
    }
}

/// Keep only the final path component and a conservative character set.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() && ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn content_type_for(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
