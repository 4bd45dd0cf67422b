//! Blob and File
//!
//! Binary payloads picked by the user or produced by conversion.

use std::sync::Arc;

use crate::resource::MediaResource;

/// Blob - immutable raw binary data
#[derive(Debug, Clone, Default)]
pub struct Blob {
    data: Arc<Vec<u8>>,
    mime_type: String,
    /// Decodable container behind this blob, if it is a media file
    media: Option<Arc<MediaResource>>,
}

impl Blob {
    pub fn new(data: Vec<u8>, mime_type: &str) -> Self {
        Self {
            data: Arc::new(data),
            mime_type: mime_type.to_string(),
            media: None,
        }
    }

    pub fn from_text(text: &str, mime_type: &str) -> Self {
        Self::new(text.as_bytes().to_vec(), mime_type)
    }

    pub fn from_media(resource: MediaResource, mime_type: &str) -> Self {
        Self {
            data: Arc::new(Vec::new()),
            mime_type: mime_type.to_string(),
            media: Some(Arc::new(resource)),
        }
    }

    /// Get size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Convert to text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).to_string()
    }

    pub fn media(&self) -> Option<&Arc<MediaResource>> {
        self.media.as_ref()
    }
}

/// File - extends Blob with filename
#[derive(Debug, Clone)]
pub struct File {
    blob: Blob,
    name: String,
    last_modified: u64, // Unix timestamp ms
}

impl File {
    pub fn new(blob: Blob, name: &str) -> Self {
        Self {
            blob,
            name: name.to_string(),
            last_modified: 0,
        }
    }

    pub fn text_file(name: &str, contents: &str) -> Self {
        Self::new(Blob::from_text(contents, mime_for_name(name)), name)
    }

    pub fn video(name: &str, resource: MediaResource) -> Self {
        Self::new(Blob::from_media(resource, mime_for_name(name)), name)
    }

    pub fn with_last_modified(mut self, last_modified: u64) -> Self {
        self.last_modified = last_modified;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name without its final extension
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }

    pub fn last_modified(&self) -> u64 {
        self.last_modified
    }

    pub fn size(&self) -> usize {
        self.blob.size()
    }

    pub fn mime_type(&self) -> &str {
        self.blob.mime_type()
    }

    pub fn as_blob(&self) -> &Blob {
        &self.blob
    }

    pub fn into_blob(self) -> Blob {
        self.blob
    }
}

fn mime_for_name(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("ogv") => "video/ogg",
        Some("srt") => "application/x-subrip",
        Some("vtt") => "text/vtt",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem() {
        assert_eq!(File::text_file("movie.srt", "").stem(), "movie");
        assert_eq!(File::text_file("my.movie.en.srt", "").stem(), "my.movie.en");
        assert_eq!(File::text_file("noext", "").stem(), "noext");
        assert_eq!(File::text_file(".hidden", "").stem(), ".hidden");
    }

    #[test]
    fn test_mime_from_name() {
        assert_eq!(File::text_file("a.srt", "x").mime_type(), "application/x-subrip");
        assert_eq!(File::video("clip.MP4", MediaResource::new(10.0)).mime_type(), "video/mp4");
    }

    #[test]
    fn test_blob_text() {
        let blob = Blob::from_text("WEBVTT", "text/vtt");
        assert_eq!(blob.size(), 6);
        assert_eq!(blob.text(), "WEBVTT");
        assert!(blob.media().is_none());
    }
}
