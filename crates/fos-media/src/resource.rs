//! Media Resources
//!
//! What the decoder finds inside a loaded container: its duration and
//! the in-band text tracks it carries, with the point at which each
//! track becomes enumerable.

use crate::tracks::{TextTrackCue, TextTrackKind};

/// When an in-band track shows up in `textTracks`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackExposure {
    /// Together with `loadedmetadata`
    WithMetadata,
    /// This many milliseconds after the load started
    AfterMs(u64),
    /// Only once decoding starts
    OnPlayback,
}

/// In-band text track description
#[derive(Debug, Clone)]
pub struct InBandTrack {
    pub kind: TextTrackKind,
    pub label: String,
    pub language: String,
    pub cues: Vec<TextTrackCue>,
    pub exposure: TrackExposure,
}

impl InBandTrack {
    pub fn new(kind: TextTrackKind, label: &str, language: &str) -> Self {
        Self {
            kind,
            label: label.to_string(),
            language: language.to_string(),
            cues: Vec::new(),
            exposure: TrackExposure::WithMetadata,
        }
    }

    pub fn with_cue(mut self, start: f64, end: f64, text: &str) -> Self {
        self.cues.push(TextTrackCue::new(start, end, text));
        self
    }

    pub fn with_exposure(mut self, exposure: TrackExposure) -> Self {
        self.exposure = exposure;
        self
    }
}

/// Decodable media container
#[derive(Debug, Clone)]
pub struct MediaResource {
    /// Duration in seconds
    pub duration: f64,
    pub in_band_tracks: Vec<InBandTrack>,
}

impl MediaResource {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            in_band_tracks: Vec::new(),
        }
    }

    pub fn with_track(mut self, track: InBandTrack) -> Self {
        self.in_band_tracks.push(track);
        self
    }
}
