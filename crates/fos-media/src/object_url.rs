//! Object URLs
//!
//! `URL.createObjectURL` / `URL.revokeObjectURL` for blobs.

use std::collections::HashMap;

use crate::blob::Blob;

/// Registry of live `blob:` URLs
#[derive(Debug)]
pub struct ObjectUrlRegistry {
    origin: String,
    blobs: HashMap<String, Blob>,
    next_id: u64,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::with_origin("null")
    }

    pub fn with_origin(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            blobs: HashMap::new(),
            next_id: 1,
        }
    }

    /// Create a blob URL
    pub fn create_object_url(&mut self, blob: Blob) -> String {
        let url = format!("blob:{}/{}", self.origin, self.next_id);
        self.next_id += 1;
        self.blobs.insert(url.clone(), blob);
        url
    }

    /// Revoke a blob URL. Returns false if it was not live.
    pub fn revoke_object_url(&mut self, url: &str) -> bool {
        self.blobs.remove(url).is_some()
    }

    /// Look up the blob behind a live URL
    pub fn resolve(&self, url: &str) -> Option<&Blob> {
        self.blobs.get(url)
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.blobs.contains_key(url)
    }

    /// Number of live URLs
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl Default for ObjectUrlRegistry {
    fn default() -> Self {
        Self::new()
    }
}
