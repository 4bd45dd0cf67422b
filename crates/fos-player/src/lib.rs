//! fOS Player
//!
//! Video player page with subtitle upload, embedded text track discovery
//! and a custom caption overlay.
//!
//! Features:
//! - Track registry merging embedded and uploaded tracks
//! - Bounded retry discovery of embedded tracks
//! - Single-flight track selection with generation-checked timers
//! - Caption overlay fed by `cuechange` on exactly one track
//! - SubRip to WebVTT conversion

pub mod config;
pub mod controls;
pub mod converter;
pub mod discovery;
pub mod event_loop;
pub mod loader;
pub mod page;
pub mod registry;
pub mod renderer;
pub mod selection;

pub use config::{ConfigError, DebugConfig, PlayerConfig};
pub use controls::{CaptionToggle, PageView, SelectOption, TrackSelector, NO_SUBTITLES};
pub use converter::{srt_to_vtt, ConversionError, ConverterAdapter, SrtToWebVtt, SubtitleConverter};
pub use discovery::{DiscoveryPass, DiscoveryTask, TrackDiscovery};
pub use event_loop::{EventLoop, TimerId};
pub use loader::VideoLoader;
pub use page::{ConvertedSubtitle, PlayerPage, PlayerTask};
pub use registry::{Registration, TrackDescriptor, TrackId, TrackOrigin, TrackRegistry};
pub use renderer::{CaptionOverlay, CaptionRenderer};
pub use selection::{SelectOutcome, SelectionContext, SelectionState, SelectionTask};

/// Player error
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("Subtitle conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Media error: {0}")]
    Media(#[from] fos_media::MediaError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
