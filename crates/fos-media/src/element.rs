//! Media Elements
//!
//! HTMLMediaElement, HTMLVideoElement and the `<track>` child element.
//!
//! Decoding is simulated on a caller-driven clock: [`HTMLMediaElement::advance`]
//! moves time forward, exposes in-band tracks as the container reveals
//! them, materializes cues for tracks that were switched on, finishes
//! pending `<track>` loads and queues the resulting [`MediaEvent`]s.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::object_url::ObjectUrlRegistry;
use crate::resource::{MediaResource, TrackExposure};
use crate::tracks::{TextTrack, TextTrackKind, TextTrackList, TrackSource};
use crate::webvtt::parse_webvtt;
use crate::MediaError;

/// Network state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NetworkState {
    #[default]
    Empty = 0,
    Idle = 1,
    Loading = 2,
    NoSource = 3,
}

/// Ready state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    #[default]
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

/// Event queued by a media element
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    LoadedMetadata,
    Play,
    /// Playback actually started after `play()`
    Playing,
    /// `cuechange` on the text track at this index
    CueChange(usize),
    /// `load` on the `<track>` element
    TrackLoad,
    /// `error` on the `<track>` element
    TrackError(String),
    Ended,
    Error(String),
}

/// Simulated decoder latencies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderTiming {
    /// Load start to `loadedmetadata`
    pub metadata_ms: u64,
    /// Track switched on to cues available
    pub cue_materialize_ms: u64,
    /// `<track>` src set to `load`; `None` never finishes
    pub track_load_ms: Option<u64>,
}

impl Default for DecoderTiming {
    fn default() -> Self {
        Self {
            metadata_ms: 100,
            cue_materialize_ms: 200,
            track_load_ms: Some(50),
        }
    }
}

/// `<track>` ready state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackReadyState {
    #[default]
    None,
    Loading,
    Loaded,
    Error,
}

/// HTML `<track>` element. Its text track lives at index 0 of the
/// owning media element's track list.
#[derive(Debug, Clone, Default)]
pub struct HTMLTrackElement {
    pub id: String,
    pub kind: TextTrackKind,
    pub srclang: String,
    src: String,
    ready_state: TrackReadyState,
    load_started_at: Option<u64>,
}

impl HTMLTrackElement {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn ready_state(&self) -> TrackReadyState {
        self.ready_state
    }

    /// Whether a resource is attached
    pub fn has_source(&self) -> bool {
        !self.src.is_empty()
    }
}

#[derive(Debug, Clone)]
struct InBandState {
    resource_index: usize,
    native_index: usize,
    activated_at: Option<u64>,
    materialized: bool,
}

/// Base media element
#[derive(Debug)]
pub struct HTMLMediaElement {
    // Source
    pub src: String,
    resource: Option<Arc<MediaResource>>,

    // State
    pub network_state: NetworkState,
    pub ready_state: ReadyState,
    pub error: Option<String>,

    // Playback
    pub current_time: f64,
    pub duration: f64,
    pub paused: bool,
    pub ended: bool,
    pub controls: bool,
    playing: bool,

    // Text tracks
    pub text_tracks: TextTrackList,
    track_element: HTMLTrackElement,
    in_band: Vec<InBandState>,
    exposed: Vec<bool>,

    // Decoder clock
    timing: DecoderTiming,
    clock_ms: u64,
    load_started_at: u64,
    events: VecDeque<MediaEvent>,
}

impl HTMLMediaElement {
    pub fn new() -> Self {
        Self::with_timing(DecoderTiming::default())
    }

    pub fn with_timing(timing: DecoderTiming) -> Self {
        let track_element = HTMLTrackElement::new("caption-track");
        let mut text_tracks = TextTrackList::new();
        text_tracks.push(
            TextTrack::new(track_element.kind, "", &track_element.srclang)
                .with_source(TrackSource::Element),
        );
        Self {
            src: String::new(),
            resource: None,
            network_state: NetworkState::Empty,
            ready_state: ReadyState::HaveNothing,
            error: None,
            current_time: 0.0,
            duration: f64::NAN,
            paused: true,
            ended: false,
            controls: false,
            playing: false,
            text_tracks,
            track_element,
            in_band: Vec::new(),
            exposed: Vec::new(),
            timing,
            clock_ms: 0,
            load_started_at: 0,
            events: VecDeque::new(),
        }
    }

    /// Index of the `<track>` element's text track
    pub const TRACK_ELEMENT_INDEX: usize = 0;

    pub fn track_element(&self) -> &HTMLTrackElement {
        &self.track_element
    }

    /// Load media from `src`; `resource` is what the URL resolved to
    pub fn load(&mut self, src: &str, resource: Option<Arc<MediaResource>>) {
        self.src = src.to_string();
        self.current_time = 0.0;
        self.duration = f64::NAN;
        self.paused = true;
        self.playing = false;
        self.ended = false;
        self.error = None;
        self.ready_state = ReadyState::HaveNothing;
        self.text_tracks.remove_in_band();
        self.in_band.clear();
        self.events.clear();
        self.load_started_at = self.clock_ms;

        match resource {
            Some(resource) => {
                self.exposed = vec![false; resource.in_band_tracks.len()];
                self.resource = Some(resource);
                self.network_state = NetworkState::Loading;
            }
            None => {
                self.exposed.clear();
                self.resource = None;
                self.network_state = NetworkState::NoSource;
                let message = format!("Unsupported source: {}", src);
                self.error = Some(message.clone());
                self.events.push_back(MediaEvent::Error(message));
            }
        }
    }

    /// Play media. Playback starts once metadata is available.
    pub fn play(&mut self) -> Result<(), MediaError> {
        if self.src.is_empty() {
            return Err(MediaError::InvalidState("No source".into()));
        }
        if self.resource.is_none() {
            return Err(MediaError::NotSupported(self.src.clone()));
        }
        if self.paused {
            self.paused = false;
            self.ended = false;
            self.events.push_back(MediaEvent::Play);
        }
        Ok(())
    }

    /// Pause media
    pub fn pause(&mut self) {
        self.paused = true;
        self.playing = false;
    }

    /// Seek to time
    pub fn seek(&mut self, time: f64) {
        let limit = if self.duration.is_nan() { 0.0 } else { self.duration };
        self.current_time = time.clamp(0.0, limit);
    }

    /// Point the `<track>` element at a new resource and start loading it
    pub fn set_track_src(&mut self, src: &str) {
        self.track_element.src = src.to_string();
        self.track_element.ready_state = TrackReadyState::Loading;
        self.track_element.load_started_at = Some(self.clock_ms);
        if let Some(track) = self.text_tracks.get_mut(Self::TRACK_ELEMENT_INDEX) {
            track.clear_cues();
        }
    }

    /// Drop the `<track>` element's resource; the element itself stays
    pub fn clear_track_source(&mut self) {
        self.track_element.src.clear();
        self.track_element.ready_state = TrackReadyState::None;
        self.track_element.load_started_at = None;
        if let Some(track) = self.text_tracks.get_mut(Self::TRACK_ELEMENT_INDEX) {
            track.clear_cues();
        }
    }

    /// Take all queued events
    pub fn drain_events(&mut self) -> Vec<MediaEvent> {
        self.events.drain(..).collect()
    }

    /// Whether `playing` has fired since the last pause or load
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn has_metadata(&self) -> bool {
        self.ready_state >= ReadyState::HaveMetadata
    }

    /// Advance the decoder clock
    pub fn advance(&mut self, delta_ms: u64, urls: &ObjectUrlRegistry) {
        // Mode changes made since the last call happened at this instant
        let previous = self.clock_ms;
        self.clock_ms += delta_ms;
        self.poll_track_element(urls);

        let Some(resource) = self.resource.clone() else {
            self.update_cues();
            return;
        };
        let since_load = self.clock_ms - self.load_started_at;

        if !self.has_metadata() && since_load >= self.timing.metadata_ms {
            self.ready_state = ReadyState::HaveMetadata;
            self.network_state = NetworkState::Idle;
            self.duration = resource.duration;
            self.expose_tracks(&resource, since_load);
            self.events.push_back(MediaEvent::LoadedMetadata);
        } else if self.has_metadata() {
            self.expose_tracks(&resource, since_load);
        }

        if self.has_metadata() && !self.paused {
            self.ready_state = ReadyState::HaveEnoughData;
            if !self.playing {
                self.playing = true;
                self.events.push_back(MediaEvent::Playing);
            }
            self.current_time += delta_ms as f64 / 1000.0;
            if self.current_time >= self.duration {
                self.current_time = self.duration;
                self.paused = true;
                self.playing = false;
                self.ended = true;
                self.events.push_back(MediaEvent::Ended);
            }
        }

        self.materialize_cues(&resource, previous);
        self.update_cues();
    }

    fn expose_tracks(&mut self, resource: &MediaResource, since_load: u64) {
        let playing = !self.paused;
        for (i, track) in resource.in_band_tracks.iter().enumerate() {
            if self.exposed.get(i).copied().unwrap_or(true) {
                continue;
            }
            let visible = match track.exposure {
                TrackExposure::WithMetadata => true,
                TrackExposure::AfterMs(ms) => since_load >= ms,
                TrackExposure::OnPlayback => playing,
            };
            if !visible {
                continue;
            }
            let native = TextTrack::new(track.kind, &track.label, &track.language);
            let native_index = self.text_tracks.push(native);
            self.exposed[i] = true;
            self.in_band.push(InBandState {
                resource_index: i,
                native_index,
                activated_at: None,
                materialized: false,
            });
            tracing::trace!(
                index = native_index,
                label = %track.label,
                "in-band text track exposed"
            );
        }
    }

    fn materialize_cues(&mut self, resource: &MediaResource, switched_at: u64) {
        for state in &mut self.in_band {
            if state.materialized {
                continue;
            }
            let Some(track) = self.text_tracks.get_mut(state.native_index) else {
                continue;
            };
            if !track.mode().is_active() {
                continue;
            }
            let activated_at = *state.activated_at.get_or_insert(switched_at);
            if self.clock_ms < activated_at + self.timing.cue_materialize_ms {
                continue;
            }
            if let Some(source) = resource.in_band_tracks.get(state.resource_index) {
                track.replace_cues(source.cues.clone());
            }
            state.materialized = true;
        }
    }

    fn poll_track_element(&mut self, urls: &ObjectUrlRegistry) {
        if self.track_element.ready_state != TrackReadyState::Loading {
            return;
        }
        let (Some(started), Some(latency)) =
            (self.track_element.load_started_at, self.timing.track_load_ms)
        else {
            return;
        };
        if self.clock_ms < started + latency {
            return;
        }

        let parsed = match urls.resolve(&self.track_element.src) {
            Some(blob) => parse_webvtt(&blob.text()).map_err(|e| e.to_string()),
            None => Err(format!("Cannot fetch {}", self.track_element.src)),
        };
        match parsed {
            Ok(cues) => {
                if let Some(track) = self.text_tracks.get_mut(Self::TRACK_ELEMENT_INDEX) {
                    track.replace_cues(cues);
                }
                self.track_element.ready_state = TrackReadyState::Loaded;
                self.events.push_back(MediaEvent::TrackLoad);
            }
            Err(message) => {
                self.track_element.ready_state = TrackReadyState::Error;
                self.events.push_back(MediaEvent::TrackError(message));
            }
        }
    }

    fn update_cues(&mut self) {
        let now = self.current_time;
        for (index, track) in self.text_tracks.iter_mut().enumerate() {
            if track.update_active(now) {
                self.events.push_back(MediaEvent::CueChange(index));
            }
        }
    }
}

impl Default for HTMLMediaElement {
    fn default() -> Self {
        Self::new()
    }
}

/// HTML Video Element
#[derive(Debug, Default)]
pub struct HTMLVideoElement {
    pub base: HTMLMediaElement,
    pub width: u32,
    pub height: u32,
    pub poster: String,
}

impl HTMLVideoElement {
    pub fn new() -> Self {
        Self::with_timing(DecoderTiming::default())
    }

    pub fn with_timing(timing: DecoderTiming) -> Self {
        Self {
            base: HTMLMediaElement::with_timing(timing),
            width: 0,
            height: 0,
            poster: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::Blob;
    use crate::resource::InBandTrack;
    use crate::tracks::TextTrackMode;

    fn resource() -> Arc<MediaResource> {
        Arc::new(
            MediaResource::new(10.0)
                .with_track(InBandTrack::new(TextTrackKind::Subtitles, "English", "en").with_cue(0.0, 2.0, "hi"))
                .with_track(
                    InBandTrack::new(TextTrackKind::Captions, "", "de")
                        .with_exposure(TrackExposure::OnPlayback),
                ),
        )
    }

    #[test]
    fn test_video_element() {
        let video = HTMLVideoElement::new();
        assert!(video.base.paused);
        assert_eq!(video.base.text_tracks.length(), 1);
        assert_eq!(video.base.text_tracks.get(0).unwrap().source, TrackSource::Element);
    }

    #[test]
    fn test_metadata_exposes_tracks() {
        let urls = ObjectUrlRegistry::new();
        let mut media = HTMLMediaElement::new();
        media.load("blob:null/1", Some(resource()));

        media.advance(50, &urls);
        assert!(media.drain_events().is_empty());

        media.advance(50, &urls);
        assert_eq!(media.drain_events(), vec![MediaEvent::LoadedMetadata]);
        assert_eq!(media.duration, 10.0);
        // OnPlayback track is still hidden
        assert_eq!(media.text_tracks.length(), 2);

        media.play().unwrap();
        media.advance(10, &urls);
        assert_eq!(media.text_tracks.length(), 3);
    }

    #[test]
    fn test_cues_materialize_after_activation() {
        let urls = ObjectUrlRegistry::new();
        let mut media = HTMLMediaElement::new();
        media.load("blob:null/1", Some(resource()));
        media.advance(100, &urls);
        media.drain_events();

        assert!(media.text_tracks.get(1).unwrap().cues().is_empty());
        media.text_tracks.get_mut(1).unwrap().set_mode(TextTrackMode::Hidden);
        media.advance(100, &urls);
        assert!(media.text_tracks.get(1).unwrap().cues().is_empty());

        media.advance(200, &urls);
        assert_eq!(media.text_tracks.get(1).unwrap().cues().len(), 1);
        assert_eq!(media.drain_events(), vec![MediaEvent::CueChange(1)]);
    }

    #[test]
    fn test_track_element_load() {
        let mut urls = ObjectUrlRegistry::new();
        let url = urls.create_object_url(Blob::from_text("WEBVTT\n\n00:00.000 --> 00:05.000\nHello\n", "text/vtt"));
        let mut media = HTMLMediaElement::new();

        media.set_track_src(&url);
        assert_eq!(media.track_element().ready_state(), TrackReadyState::Loading);
        media.advance(50, &urls);
        assert_eq!(media.drain_events(), vec![MediaEvent::TrackLoad]);
        assert_eq!(media.text_tracks.get(0).unwrap().cues().len(), 1);

        media.clear_track_source();
        assert!(!media.track_element().has_source());
        assert!(media.text_tracks.get(0).unwrap().cues().is_empty());
    }

    #[test]
    fn test_track_element_error() {
        let urls = ObjectUrlRegistry::new();
        let mut media = HTMLMediaElement::new();
        media.set_track_src("blob:null/missing");
        media.advance(50, &urls);
        assert!(matches!(media.drain_events().as_slice(), [MediaEvent::TrackError(_)]));
        assert_eq!(media.track_element().ready_state(), TrackReadyState::Error);
    }

    #[test]
    fn test_hung_track_load_never_fires() {
        let mut urls = ObjectUrlRegistry::new();
        let url = urls.create_object_url(Blob::from_text("WEBVTT\n", "text/vtt"));
        let mut media = HTMLMediaElement::with_timing(DecoderTiming { track_load_ms: None, ..Default::default() });
        media.set_track_src(&url);
        media.advance(10_000, &urls);
        assert!(media.drain_events().is_empty());
    }

    #[test]
    fn test_play_requires_source() {
        let mut media = HTMLMediaElement::new();
        assert!(media.play().is_err());

        media.load("blob:null/gone", None);
        assert!(matches!(media.drain_events().as_slice(), [MediaEvent::Error(_)]));
        assert!(media.play().is_err());
    }

    #[test]
    fn test_playback_ends() {
        let urls = ObjectUrlRegistry::new();
        let mut media = HTMLMediaElement::new();
        media.load("blob:null/1", Some(Arc::new(MediaResource::new(1.0))));
        media.play().unwrap();
        media.advance(100, &urls);
        media.advance(1500, &urls);
        assert!(media.ended);
        assert_eq!(media.current_time, 1.0);
        assert_eq!(media.drain_events(), vec![MediaEvent::Play, MediaEvent::LoadedMetadata, MediaEvent::Playing, MediaEvent::Ended]);
    }
}
