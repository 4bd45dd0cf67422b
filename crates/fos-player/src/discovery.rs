//! Track Discovery
//!
//! Embedded text tracks show up in the native track list at
//! container-dependent times. Discovery probes the list a bounded number
//! of times: once after `loadedmetadata`, once more if that pass came up
//! empty, and once when playback starts if the registry is still empty.
//! A probe switches candidate tracks to hidden so the decoder starts
//! producing cues, then registers them after a settle delay.

use fos_media::{HTMLMediaElement, TextTrack, TextTrackMode, TrackSource};

use crate::config::PlayerConfig;
use crate::event_loop::EventLoop;
use crate::registry::{TrackId, TrackRegistry};

/// Which attempt a pass belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryPass {
    Initial,
    Retry,
    Playback,
}

/// Delayed discovery work, tagged with the video session it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryTask {
    Probe { session: u64, pass: DiscoveryPass },
    Register { session: u64, pass: DiscoveryPass },
}

/// Track discovery for one loaded video
#[derive(Debug, Default)]
pub struct TrackDiscovery {
    session: u64,
    metadata_seen: bool,
    playback_probe_used: bool,
    exhausted: bool,
}

impl TrackDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start over for a new video. Tasks from the old session become stale.
    pub fn reset(&mut self) {
        self.session += 1;
        self.metadata_seen = false;
        self.playback_probe_used = false;
        self.exhausted = false;
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    /// Retry budget spent without finding anything
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// `loadedmetadata` hook; only the first call per video schedules work
    pub fn on_loaded_metadata<T>(&mut self, timers: &mut EventLoop<T>, config: &PlayerConfig)
    where
        T: From<DiscoveryTask>,
    {
        if self.metadata_seen {
            return;
        }
        self.metadata_seen = true;
        timers.set_timeout(
            DiscoveryTask::Probe {
                session: self.session,
                pass: DiscoveryPass::Initial,
            }
            .into(),
            config.discovery_initial_delay_ms,
        );
    }

    /// `playing` hook; probes right away if nothing was found yet
    pub fn on_playing<T>(&mut self, registry: &TrackRegistry, timers: &mut EventLoop<T>)
    where
        T: From<DiscoveryTask>,
    {
        if self.playback_probe_used || registry.has_embedded() {
            return;
        }
        self.playback_probe_used = true;
        tracing::debug!("playback started without embedded tracks, probing");
        timers.queue_task(
            DiscoveryTask::Probe {
                session: self.session,
                pass: DiscoveryPass::Playback,
            }
            .into(),
        );
    }

    /// Run a discovery task. Returns the ids it newly registered.
    pub fn on_task<T>(
        &mut self,
        task: DiscoveryTask,
        video: &mut HTMLMediaElement,
        registry: &mut TrackRegistry,
        timers: &mut EventLoop<T>,
        config: &PlayerConfig,
    ) -> Vec<TrackId>
    where
        T: From<DiscoveryTask>,
    {
        match task {
            DiscoveryTask::Probe { session, .. } | DiscoveryTask::Register { session, .. }
                if session != self.session =>
            {
                tracing::debug!(?task, current = self.session, "stale discovery task discarded");
                Vec::new()
            }
            DiscoveryTask::Probe { session, pass } => {
                let probed = Self::probe(video, registry);
                tracing::debug!(?pass, probed, "probing native text tracks");
                timers.set_timeout(
                    DiscoveryTask::Register { session, pass }.into(),
                    config.discovery_settle_ms,
                );
                Vec::new()
            }
            DiscoveryTask::Register { session, pass } => {
                let added = Self::register(video, registry);
                if !added.is_empty() {
                    tracing::info!(?pass, count = added.len(), "embedded text tracks discovered");
                } else if !registry.has_embedded() {
                    self.schedule_retry(session, pass, timers, config);
                }
                added
            }
        }
    }

    fn schedule_retry<T>(
        &mut self,
        session: u64,
        pass: DiscoveryPass,
        timers: &mut EventLoop<T>,
        config: &PlayerConfig,
    ) where
        T: From<DiscoveryTask>,
    {
        match pass {
            DiscoveryPass::Initial => {
                // Retry delay counts from loadedmetadata
                let elapsed = config.discovery_initial_delay_ms + config.discovery_settle_ms;
                let delay = config.discovery_retry_delay_ms.saturating_sub(elapsed);
                tracing::debug!(delay_ms = delay, "no embedded text tracks yet, retrying");
                timers.set_timeout(
                    DiscoveryTask::Probe {
                        session,
                        pass: DiscoveryPass::Retry,
                    }
                    .into(),
                    delay,
                );
            }
            DiscoveryPass::Retry => {
                self.exhausted = true;
                tracing::info!("no embedded text tracks found");
            }
            DiscoveryPass::Playback => {
                tracing::debug!("playback probe found no embedded text tracks");
            }
        }
    }

    /// Switch unregistered in-band tracks to hidden so their cues load
    fn probe(video: &mut HTMLMediaElement, registry: &TrackRegistry) -> usize {
        let mut probed = 0;
        for (index, track) in video.text_tracks.iter_mut().enumerate() {
            if track.source != TrackSource::InBand || registry.contains_embedded(index) {
                continue;
            }
            if track.mode() == TextTrackMode::Disabled {
                track.set_mode(TextTrackMode::Hidden);
            }
            probed += 1;
        }
        probed
    }

    fn register(video: &HTMLMediaElement, registry: &mut TrackRegistry) -> Vec<TrackId> {
        video
            .text_tracks
            .iter()
            .enumerate()
            .filter(|(_, track)| track.source == TrackSource::InBand)
            .enumerate()
            .filter_map(|(ordinal, (index, track))| {
                let registration = registry.add_embedded(index, &display_label(track, ordinal + 1));
                registration.is_added().then(|| registration.id().clone())
            })
            .collect()
    }
}

/// Label, else language, else `Track <n>`
pub fn display_label(track: &TextTrack, ordinal: usize) -> String {
    if !track.label.is_empty() {
        track.label.clone()
    } else if !track.language.is_empty() {
        track.language.clone()
    } else {
        format!("Track {}", ordinal)
    }
}
