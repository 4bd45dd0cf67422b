//! Video Loader
//!
//! Owns the single outstanding video object URL.

use fos_media::{File, HTMLMediaElement, ObjectUrlRegistry};

/// Video loader
#[derive(Debug, Default)]
pub struct VideoLoader {
    current_url: Option<String>,
}

impl VideoLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// URL of the loaded video
    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// Point the video at `file` and start playback. The previous video
    /// URL is revoked and the `<track>` attachment dropped.
    pub fn load(
        &mut self,
        file: File,
        urls: &mut ObjectUrlRegistry,
        video: &mut HTMLMediaElement,
    ) -> String {
        let name = file.name().to_string();
        let media = file.as_blob().media().cloned();
        let url = urls.create_object_url(file.into_blob());

        if let Some(previous) = self.current_url.replace(url.clone()) {
            urls.revoke_object_url(&previous);
            tracing::debug!(url = %previous, "revoked previous video URL");
        }

        video.clear_track_source();
        video.load(&url, media);
        video.controls = true;
        tracing::info!(file = %name, %url, "video loaded");

        if let Err(e) = video.play() {
            tracing::warn!(error = %e, "playback did not start");
        }
        url
    }
}
