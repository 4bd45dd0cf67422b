//! Caption Renderer
//!
//! Custom caption overlay driven by `cuechange` on exactly one native
//! text track. Native rendering stays off; tracks are only an event
//! source.

use fos_media::{ListenerId, TextTrackList};

/// On-screen caption surface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionOverlay {
    /// Text node content; kept while the cue is hidden
    text: String,
    /// Suppressed because no cue is active
    cue_hidden: bool,
    /// Container visibility
    visible: bool,
}

impl CaptionOverlay {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_cue_hidden(&self) -> bool {
        self.cue_hidden
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether caption text is actually on screen
    pub fn is_showing(&self) -> bool {
        self.visible && !self.cue_hidden && !self.text.is_empty()
    }

    /// What is on screen, if anything
    pub fn displayed_text(&self) -> Option<&str> {
        self.is_showing().then_some(self.text.as_str())
    }
}

/// Caption renderer
#[derive(Debug)]
pub struct CaptionRenderer {
    listener: ListenerId,
    attached: Option<usize>,
    enabled: bool,
    overlay: CaptionOverlay,
}

impl CaptionRenderer {
    pub fn new(listener: ListenerId, enabled: bool) -> Self {
        Self {
            listener,
            attached: None,
            enabled,
            overlay: CaptionOverlay {
                cue_hidden: true,
                ..Default::default()
            },
        }
    }

    pub fn listener(&self) -> ListenerId {
        self.listener
    }

    /// Track index currently feeding the overlay
    pub fn attached(&self) -> Option<usize> {
        self.attached
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn overlay(&self) -> &CaptionOverlay {
        &self.overlay
    }

    /// Move the cue-change listener to `index`. Returns false if there
    /// is no such track, in which case nothing stays attached.
    pub fn attach_to(&mut self, tracks: &mut TextTrackList, index: usize) -> bool {
        self.detach(tracks);
        let Some(track) = tracks.get_mut(index) else {
            tracing::warn!(index, "cannot attach captions: no such text track");
            return false;
        };
        track.add_cue_change_listener(self.listener);
        self.attached = Some(index);
        tracing::debug!(index, "caption renderer attached");
        true
    }

    /// Remove the listener from every track
    pub fn detach(&mut self, tracks: &mut TextTrackList) {
        for track in tracks.iter_mut() {
            track.remove_cue_change_listener(self.listener);
        }
        self.attached = None;
    }

    /// `cuechange` handler
    pub fn on_cue_change(&mut self, tracks: &TextTrackList, index: usize) {
        if self.attached != Some(index) {
            return;
        }
        self.render_current(tracks);
    }

    /// Show the first active cue of the attached track, or hide the cue
    pub fn render_current(&mut self, tracks: &TextTrackList) {
        let text = self
            .attached
            .and_then(|index| tracks.get(index))
            .and_then(|track| track.active_cues().next())
            .map(|cue| cue.content().rendered_text())
            .unwrap_or_default();

        if text.is_empty() {
            self.overlay.cue_hidden = true;
            return;
        }
        self.overlay.text = text;
        self.overlay.cue_hidden = false;
        if self.enabled {
            self.overlay.visible = true;
        }
    }

    /// Caption toggle. Enabling re-renders the current cue right away.
    pub fn set_enabled(&mut self, enabled: bool, tracks: &TextTrackList) {
        self.enabled = enabled;
        self.overlay.visible = enabled;
        if enabled && self.attached.is_some() {
            self.render_current(tracks);
        }
    }

    /// Show the container if captions are enabled
    pub fn show(&mut self) {
        self.overlay.visible = self.enabled;
    }

    /// Hide the cue until the next render. Text and the enabled setting stay.
    pub fn suppress(&mut self) {
        self.overlay.cue_hidden = true;
    }

    pub fn hide(&mut self) {
        self.overlay.visible = false;
        self.overlay.cue_hidden = true;
    }

    /// Back to a blank overlay for a new video
    pub fn reset(&mut self, tracks: &mut TextTrackList, enabled: bool) {
        self.detach(tracks);
        self.enabled = enabled;
        self.overlay = CaptionOverlay {
            cue_hidden: true,
            ..Default::default()
        };
    }
}
