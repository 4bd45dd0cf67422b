//! fOS Media
//!
//! Media APIs for the fOS player.
//!
//! Features:
//! - HTMLVideoElement with a `<track>` child and in-band text tracks
//! - TextTrack / TextTrackCue with cue-change listeners
//! - WebVTT cue parsing
//! - Blob, File and object URLs

pub mod blob;
pub mod element;
pub mod object_url;
pub mod resource;
pub mod tracks;
pub mod webvtt;

pub use blob::{Blob, File};
pub use element::{
    DecoderTiming, HTMLMediaElement, HTMLTrackElement, HTMLVideoElement,
    MediaEvent, NetworkState, ReadyState, TrackReadyState,
};
pub use object_url::ObjectUrlRegistry;
pub use resource::{InBandTrack, MediaResource, TrackExposure};
pub use tracks::{
    CueContent, ListenerId, TextTrack, TextTrackCue, TextTrackKind,
    TextTrackList, TextTrackMode, TrackSource,
};
pub use webvtt::{parse_cue_text, parse_webvtt, CueFragment, CueNode, VttError};

/// Media error
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Not supported: {0}")]
    NotSupported(String),
    
    #[error("Invalid state: {0}")]
    InvalidState(String),
}
