//! Text Tracks
//!
//! TextTrack, TextTrackCue and TextTrackList.
//!
//! Tracks carry a cue-change listener set with DOM `addEventListener`
//! semantics: a listener is identified by its [`ListenerId`], adding the
//! same listener twice keeps a single registration and removing a
//! listener that is not registered does nothing.

use crate::webvtt::CueFragment;

/// Text track kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextTrackKind {
    #[default]
    Subtitles,
    Captions,
    Descriptions,
    Chapters,
    Metadata,
}

impl TextTrackKind {
    /// Parse the DOM `kind` attribute value
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "subtitles" => Some(Self::Subtitles),
            "captions" => Some(Self::Captions),
            "descriptions" => Some(Self::Descriptions),
            "chapters" => Some(Self::Chapters),
            "metadata" => Some(Self::Metadata),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subtitles => "subtitles",
            Self::Captions => "captions",
            Self::Descriptions => "descriptions",
            Self::Chapters => "chapters",
            Self::Metadata => "metadata",
        }
    }
}

/// Text track mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextTrackMode {
    #[default]
    Disabled,
    /// Cues load and fire events but are not rendered natively
    Hidden,
    Showing,
}

impl TextTrackMode {
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

/// Where a text track comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSource {
    /// Backed by a `<track>` child element
    Element,
    /// Packaged inside the media resource
    InBand,
}

/// Cue-change listener handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u32);

/// Text track cue
#[derive(Debug, Clone, PartialEq)]
pub struct TextTrackCue {
    pub id: String,
    pub start_time: f64,
    pub end_time: f64,
    pub pause_on_exit: bool,
    /// Raw cue payload
    pub text: String,
    /// Parsed cue markup, when the cue was built from WebVTT
    pub fragment: Option<CueFragment>,
}

/// Displayable content of a cue, resolved once per cue
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CueContent<'a> {
    PlainText(&'a str),
    Rich(&'a CueFragment),
    Empty,
}

impl CueContent<'_> {
    /// Text to put on screen for this cue
    pub fn rendered_text(&self) -> String {
        match self {
            CueContent::PlainText(text) => (*text).to_string(),
            CueContent::Rich(fragment) => fragment.text_content(),
            CueContent::Empty => String::new(),
        }
    }
}

impl TextTrackCue {
    pub fn new(start_time: f64, end_time: f64, text: &str) -> Self {
        Self {
            id: String::new(),
            start_time,
            end_time,
            pause_on_exit: false,
            text: text.to_string(),
            fragment: None,
        }
    }

    pub fn with_fragment(mut self, fragment: CueFragment) -> Self {
        self.fragment = Some(fragment);
        self
    }

    /// Plain text wins when present, rich content is the fallback
    pub fn content(&self) -> CueContent<'_> {
        if !self.text.is_empty() {
            CueContent::PlainText(&self.text)
        } else if let Some(fragment) = &self.fragment {
            CueContent::Rich(fragment)
        } else {
            CueContent::Empty
        }
    }

    pub fn is_active_at(&self, time: f64) -> bool {
        self.start_time <= time && self.end_time > time
    }
}

/// Text track
#[derive(Debug, Clone)]
pub struct TextTrack {
    pub id: String,
    pub kind: TextTrackKind,
    pub label: String,
    pub language: String,
    pub source: TrackSource,
    mode: TextTrackMode,
    cues: Vec<TextTrackCue>,
    active_cues: Vec<usize>,
    listeners: Vec<ListenerId>,
}

impl TextTrack {
    pub fn new(kind: TextTrackKind, label: &str, language: &str) -> Self {
        Self {
            id: String::new(),
            kind,
            label: label.to_string(),
            language: language.to_string(),
            source: TrackSource::InBand,
            mode: TextTrackMode::Disabled,
            cues: Vec::new(),
            active_cues: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: TrackSource) -> Self {
        self.source = source;
        self
    }

    pub fn mode(&self) -> TextTrackMode {
        self.mode
    }

    /// Set the mode. Disabling drops the active cue set.
    pub fn set_mode(&mut self, mode: TextTrackMode) {
        if self.mode != mode {
            tracing::trace!(track = %self.label, ?mode, "text track mode change");
        }
        self.mode = mode;
        if !mode.is_active() {
            self.active_cues.clear();
        }
    }

    pub fn add_cue(&mut self, cue: TextTrackCue) {
        self.cues.push(cue);
    }

    pub fn remove_cue(&mut self, id: &str) {
        self.cues.retain(|c| c.id != id);
        self.active_cues.clear();
    }

    pub fn replace_cues(&mut self, cues: Vec<TextTrackCue>) {
        self.cues = cues;
        self.active_cues.clear();
    }

    pub fn clear_cues(&mut self) {
        self.cues.clear();
        self.active_cues.clear();
    }

    pub fn cues(&self) -> &[TextTrackCue] {
        &self.cues
    }

    /// Currently active cues, in cue order
    pub fn active_cues(&self) -> impl Iterator<Item = &TextTrackCue> {
        self.active_cues.iter().filter_map(|&i| self.cues.get(i))
    }

    /// Recompute the active cue set. Returns true when it changed,
    /// which is when a `cuechange` event fires.
    pub fn update_active(&mut self, current_time: f64) -> bool {
        if !self.mode.is_active() {
            return false;
        }
        let active: Vec<usize> = self.cues.iter()
            .enumerate()
            .filter(|(_, c)| c.is_active_at(current_time))
            .map(|(i, _)| i)
            .collect();
        if active == self.active_cues {
            return false;
        }
        self.active_cues = active;
        true
    }

    pub fn add_cue_change_listener(&mut self, listener: ListenerId) {
        if !self.listeners.contains(&listener) {
            self.listeners.push(listener);
        }
    }

    pub fn remove_cue_change_listener(&mut self, listener: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| *l != listener);
        before != self.listeners.len()
    }

    pub fn has_cue_change_listener(&self, listener: ListenerId) -> bool {
        self.listeners.contains(&listener)
    }

    pub fn cue_change_listeners(&self) -> &[ListenerId] {
        &self.listeners
    }
}

/// Track list
#[derive(Debug, Clone, Default)]
pub struct TextTrackList {
    pub tracks: Vec<TextTrack>,
}

impl TextTrackList {
    pub fn new() -> Self { Self::default() }
    pub fn length(&self) -> usize { self.tracks.len() }
    pub fn is_empty(&self) -> bool { self.tracks.is_empty() }
    pub fn get(&self, index: usize) -> Option<&TextTrack> { self.tracks.get(index) }
    pub fn get_mut(&mut self, index: usize) -> Option<&mut TextTrack> { self.tracks.get_mut(index) }
    pub fn get_by_id(&self, id: &str) -> Option<&TextTrack> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextTrack> {
        self.tracks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TextTrack> {
        self.tracks.iter_mut()
    }

    pub fn push(&mut self, track: TextTrack) -> usize {
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    /// Drop every in-band track, keeping element-backed ones in place
    pub fn remove_in_band(&mut self) {
        self.tracks.retain(|t| t.source == TrackSource::Element);
    }

    /// Indices of tracks that have `listener` registered
    pub fn tracks_with_listener(&self, listener: ListenerId) -> Vec<usize> {
        self.tracks.iter()
            .enumerate()
            .filter(|(_, t)| t.has_cue_change_listener(listener))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webvtt::parse_cue_text;

    fn hello_track() -> TextTrack {
        let mut track = TextTrack::new(TextTrackKind::Subtitles, "English", "en");
        track.add_cue(TextTrackCue::new(0.0, 5.0, "Hello"));
        track.add_cue(TextTrackCue::new(5.0, 8.0, "World"));
        track
    }

    #[test]
    fn test_text_track() {
        let mut track = hello_track();
        track.set_mode(TextTrackMode::Hidden);

        assert!(track.update_active(2.5));
        assert_eq!(track.active_cues().count(), 1);
        assert_eq!(track.active_cues().next().unwrap().text, "Hello");
    }

    #[test]
    fn test_disabled_track_has_no_active_cues() {
        let mut track = hello_track();
        assert!(!track.update_active(2.5));
        assert_eq!(track.active_cues().count(), 0);

        track.set_mode(TextTrackMode::Hidden);
        track.update_active(2.5);
        track.set_mode(TextTrackMode::Disabled);
        assert_eq!(track.active_cues().count(), 0);
    }

    #[test]
    fn test_cue_change_fires_only_on_change() {
        let mut track = hello_track();
        track.set_mode(TextTrackMode::Hidden);
        assert!(track.update_active(1.0));
        assert!(!track.update_active(2.0));
        assert!(track.update_active(6.0));
        assert!(track.update_active(9.0));
        assert_eq!(track.active_cues().count(), 0);
    }

    #[test]
    fn test_listener_registration_is_idempotent() {
        let mut track = hello_track();
        let listener = ListenerId(7);

        track.add_cue_change_listener(listener);
        track.add_cue_change_listener(listener);
        assert_eq!(track.cue_change_listeners().len(), 1);

        assert!(track.remove_cue_change_listener(listener));
        assert!(!track.remove_cue_change_listener(listener));
        assert!(!track.has_cue_change_listener(listener));
    }

    #[test]
    fn test_cue_content_prefers_plain_text() {
        let plain = TextTrackCue::new(0.0, 1.0, "plain");
        assert_eq!(plain.content(), CueContent::PlainText("plain"));

        let rich = TextTrackCue::new(0.0, 1.0, "")
            .with_fragment(parse_cue_text("<i>rich</i> text"));
        assert_eq!(rich.content().rendered_text(), "rich text");

        let empty = TextTrackCue::new(0.0, 1.0, "");
        assert_eq!(empty.content(), CueContent::Empty);
        assert_eq!(empty.content().rendered_text(), "");
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(TextTrackKind::parse("Captions"), Some(TextTrackKind::Captions));
        assert_eq!(TextTrackKind::parse("chapters"), Some(TextTrackKind::Chapters));
        assert_eq!(TextTrackKind::parse("karaoke"), None);
    }

    #[test]
    fn test_remove_in_band_keeps_element_tracks() {
        let mut list = TextTrackList::new();
        list.push(TextTrack::new(TextTrackKind::Subtitles, "", "").with_source(TrackSource::Element));
        list.push(TextTrack::new(TextTrackKind::Subtitles, "en", "en"));
        list.push(TextTrack::new(TextTrackKind::Captions, "fr", "fr"));

        list.remove_in_band();
        assert_eq!(list.length(), 1);
        assert_eq!(list.get(0).unwrap().source, TrackSource::Element);
    }
}
