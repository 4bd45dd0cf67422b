//! Player Page
//!
//! Wires the video element, discovery, selection, renderer and page
//! controls to one event loop. All work happens on the caller's thread:
//! [`PlayerPage::tick`] advances the virtual clock, delivers media events
//! and runs due timers in order.

use std::future::Future;
use std::sync::Arc;

use fos_devtools::{Console, ConsoleHandle, DebugPanel};
use fos_media::{
    Blob, DecoderTiming, File, HTMLVideoElement, ListenerId, MediaEvent, ObjectUrlRegistry,
};

use crate::config::PlayerConfig;
use crate::controls::{CaptionToggle, PageView, TrackSelector};
use crate::converter::{ConverterAdapter, SubtitleConverter};
use crate::discovery::{DiscoveryTask, TrackDiscovery};
use crate::event_loop::EventLoop;
use crate::loader::VideoLoader;
use crate::registry::{TrackId, TrackRegistry};
use crate::renderer::{CaptionOverlay, CaptionRenderer};
use crate::selection::{SelectOutcome, SelectionContext, SelectionState, SelectionTask};
use crate::PlayerError;

/// Listener the caption renderer registers on native tracks
const RENDERER_LISTENER: ListenerId = ListenerId(1);

/// Longest stretch the decoder runs without delivering events
const FRAME_MS: u64 = 10;

/// Timer-driven work on the page event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerTask {
    Discovery(DiscoveryTask),
    Selection(SelectionTask),
}

impl From<DiscoveryTask> for PlayerTask {
    fn from(task: DiscoveryTask) -> Self {
        Self::Discovery(task)
    }
}

impl From<SelectionTask> for PlayerTask {
    fn from(task: SelectionTask) -> Self {
        Self::Selection(task)
    }
}

/// Video player page
#[derive(Debug)]
pub struct PlayerPage {
    config: PlayerConfig,
    urls: ObjectUrlRegistry,
    video: HTMLVideoElement,
    loader: VideoLoader,
    registry: TrackRegistry,
    discovery: TrackDiscovery,
    selection: SelectionState,
    renderer: CaptionRenderer,
    event_loop: EventLoop<PlayerTask>,
    converter: ConverterAdapter,
    selector: TrackSelector,
    toggle: CaptionToggle,
    view: PageView,
    console: ConsoleHandle,
    panel: DebugPanel,
}

/// WebVTT produced from an uploaded subtitle file
#[derive(Debug, Clone)]
pub struct ConvertedSubtitle {
    name: String,
    label: String,
    blob: Blob,
}

impl ConvertedSubtitle {
    /// Original file name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Track label, the file name without its extension
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl PlayerPage {
    pub fn new(config: PlayerConfig) -> Self {
        let console = ConsoleHandle::new(Console::with_capacity(config.debug.max_lines));
        let panel = DebugPanel::new(
            console.clone(),
            config.debug.max_lines,
            config.debug.flush_interval_ms,
        );
        Self {
            urls: ObjectUrlRegistry::new(),
            video: HTMLVideoElement::new(),
            loader: VideoLoader::new(),
            registry: TrackRegistry::new(),
            discovery: TrackDiscovery::new(),
            selection: SelectionState::new(config.captions_enabled),
            renderer: CaptionRenderer::new(RENDERER_LISTENER, config.captions_enabled),
            event_loop: EventLoop::new(),
            converter: ConverterAdapter::default(),
            selector: TrackSelector::new(),
            toggle: CaptionToggle::new(),
            view: PageView::default(),
            console,
            panel,
            config,
        }
    }

    /// Use different decoder latencies. Call before loading a video.
    pub fn with_timing(mut self, timing: DecoderTiming) -> Self {
        self.video = HTMLVideoElement::with_timing(timing);
        self
    }

    pub fn with_converter(mut self, converter: Arc<dyn SubtitleConverter>) -> Self {
        self.converter = ConverterAdapter::new(converter);
        self
    }

    /// Feed the debug panel from `console`, typically one a
    /// `ConsoleLayer` writes into. The console keeps its own capacity.
    pub fn with_console(mut self, console: ConsoleHandle) -> Self {
        self.panel = DebugPanel::new(
            console.clone(),
            self.config.debug.max_lines,
            self.config.debug.flush_interval_ms,
        );
        self.console = console;
        self
    }

    // ------------------------------------------------------------------
    // User actions
    // ------------------------------------------------------------------

    /// Video file picked
    pub fn open_video(&mut self, file: File) {
        for url in self.registry.reset() {
            self.urls.revoke_object_url(&url);
        }
        self.selection.reset(self.config.captions_enabled, &mut self.event_loop);
        self.event_loop.clear_all();
        self.discovery.reset();
        self.renderer
            .reset(&mut self.video.base.text_tracks, self.config.captions_enabled);

        self.loader.load(file, &mut self.urls, &mut self.video.base);
        self.view.show_player();
        self.selector.sync(&self.registry);
        self.sync_controls();
    }

    /// Subtitle file picked. On failure nothing changes.
    pub async fn upload_subtitle(&mut self, file: File) -> Result<TrackId, PlayerError> {
        let converted = self.convert_subtitle(file).await?;
        Ok(self.add_converted(converted))
    }

    /// Conversion half of an upload. The future borrows nothing from the
    /// page, so the page can keep ticking while it is pending.
    pub fn convert_subtitle(
        &self,
        file: File,
    ) -> impl Future<Output = Result<ConvertedSubtitle, PlayerError>> + use<> {
        let converter = self.converter.clone();
        async move {
            let name = file.name().to_string();
            let label = file.stem().to_string();
            match converter.convert(file).await {
                Ok(blob) => Ok(ConvertedSubtitle { name, label, blob }),
                Err(e) => {
                    tracing::error!(file = %name, error = %e, "subtitle conversion failed");
                    Err(e.into())
                }
            }
        }
    }

    /// Register a converted subtitle and switch to it, pre-empting any
    /// in-flight transition
    pub fn add_converted(&mut self, subtitle: ConvertedSubtitle) -> TrackId {
        let url = self.urls.create_object_url(subtitle.blob);
        let id = self.registry.add_uploaded(&subtitle.label, &url);
        tracing::info!(file = %subtitle.name, %id, "subtitle track added");
        self.selector.sync(&self.registry);

        self.supersede_and_select(id.as_str());
        id
    }

    /// Programmatic selection; rejected while a transition is in flight
    pub fn select_track(&mut self, id: &str) -> SelectOutcome {
        let outcome = self.with_selection(|selection, cx| selection.select_track(id, cx));
        self.sync_controls();
        outcome
    }

    /// Selector `change`; pre-empts any in-flight transition
    pub fn on_selector_change(&mut self, id: &str) -> SelectOutcome {
        self.selector.set_value(id);
        self.supersede_and_select(id)
    }

    /// Caption toggle click
    pub fn toggle_captions(&mut self) -> bool {
        let enabled = self
            .selection
            .toggle_captions(&self.video.base, &mut self.renderer);
        self.sync_controls();
        enabled
    }

    /// Show or hide the debug panel
    pub fn toggle_debug_panel(&mut self) -> bool {
        let visible = self.panel.toggle();
        if visible {
            self.panel.flush(self.event_loop.current_time());
        }
        visible
    }

    pub fn seek(&mut self, seconds: f64) {
        self.video.base.seek(seconds);
    }

    // ------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------

    /// Advance the page by `delta_ms` in frames, stopping at every timer
    /// due in between
    pub fn tick(&mut self, delta_ms: u64) {
        let target = self.event_loop.current_time() + delta_ms;
        loop {
            let now = self.event_loop.current_time();
            let frame_end = (now + FRAME_MS).min(target);
            let next = match self.event_loop.next_due() {
                Some(due) if due <= now => now,
                Some(due) if due < frame_end => due,
                _ => frame_end,
            };
            let step = next.saturating_sub(now);

            self.video.base.advance(step, &self.urls);
            self.event_loop.advance(step);
            self.dispatch_media_events();
            self.run_tasks();

            let now = self.event_loop.current_time();
            let timer_due = self.event_loop.next_due().is_some_and(|due| due <= now);
            if now >= target && !timer_due {
                break;
            }
        }
        if self.panel.is_visible() {
            self.panel.flush(self.event_loop.current_time());
        }
    }

    fn dispatch_media_events(&mut self) {
        for event in self.video.base.drain_events() {
            match event {
                MediaEvent::LoadedMetadata => {
                    tracing::debug!(duration = self.video.base.duration, "loadedmetadata");
                    self.discovery
                        .on_loaded_metadata(&mut self.event_loop, &self.config);
                }
                MediaEvent::Play => tracing::debug!("play"),
                MediaEvent::Playing => {
                    self.discovery.on_playing(&self.registry, &mut self.event_loop);
                }
                MediaEvent::CueChange(index) => {
                    let listening = self
                        .video
                        .base
                        .text_tracks
                        .get(index)
                        .is_some_and(|track| track.has_cue_change_listener(RENDERER_LISTENER));
                    if listening {
                        self.renderer
                            .on_cue_change(&self.video.base.text_tracks, index);
                    }
                }
                MediaEvent::TrackLoad => {
                    self.with_selection(|selection, cx| selection.on_track_load(cx));
                    self.sync_controls();
                }
                MediaEvent::TrackError(message) => {
                    tracing::warn!(%message, "caption track failed to load");
                }
                MediaEvent::Ended => tracing::info!("playback ended"),
                MediaEvent::Error(message) => {
                    tracing::error!(%message, "media error");
                }
            }
        }
    }

    fn run_tasks(&mut self) {
        while let Some(task) = self.event_loop.next_task() {
            match task {
                PlayerTask::Discovery(task) => {
                    let added = self.discovery.on_task(
                        task,
                        &mut self.video.base,
                        &mut self.registry,
                        &mut self.event_loop,
                        &self.config,
                    );
                    if !added.is_empty() {
                        self.selector.sync(&self.registry);
                        self.auto_select_embedded();
                    }
                }
                PlayerTask::Selection(task) => {
                    self.with_selection(|selection, cx| selection.on_task(task, cx));
                }
            }
            self.sync_controls();
        }
    }

    fn auto_select_embedded(&mut self) {
        if self.selection.is_in_flight() || self.selection.active_track_id().is_some() {
            tracing::debug!("embedded auto-selection skipped: a track is already chosen");
            return;
        }
        let Some(first) = self.registry.first_embedded().map(|d| d.id.clone()) else {
            return;
        };
        tracing::debug!(id = %first, "auto-selecting embedded track");
        self.select_track(first.as_str());
    }

    fn supersede_and_select(&mut self, id: &str) -> SelectOutcome {
        // Unknown ids leave the pending transition alone
        if id != TrackId::NONE && self.registry.get(id).is_none() {
            tracing::debug!(id, "selection ignored: unknown track id");
            return SelectOutcome::UnknownTrack;
        }
        self.selection.supersede(&mut self.event_loop);
        self.select_track(id)
    }

    fn with_selection<R>(
        &mut self,
        f: impl FnOnce(&mut SelectionState, &mut SelectionContext<'_, PlayerTask>) -> R,
    ) -> R {
        let mut cx = SelectionContext {
            video: &mut self.video.base,
            registry: &self.registry,
            renderer: &mut self.renderer,
            timers: &mut self.event_loop,
            config: &self.config,
        };
        f(&mut self.selection, &mut cx)
    }

    fn sync_controls(&mut self) {
        let active = self.selection.active_track_id();
        let value = active.map_or(TrackId::NONE, |id| id.as_str());
        self.selector.set_value(value);
        self.toggle
            .update(active.is_some(), self.selection.captions_enabled());
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn video(&self) -> &HTMLVideoElement {
        &self.video
    }

    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn discovery(&self) -> &TrackDiscovery {
        &self.discovery
    }

    pub fn overlay(&self) -> &CaptionOverlay {
        self.renderer.overlay()
    }

    pub fn selector(&self) -> &TrackSelector {
        &self.selector
    }

    pub fn caption_toggle(&self) -> &CaptionToggle {
        &self.toggle
    }

    pub fn view(&self) -> &PageView {
        &self.view
    }

    pub fn urls(&self) -> &ObjectUrlRegistry {
        &self.urls
    }

    pub fn loader(&self) -> &VideoLoader {
        &self.loader
    }

    pub fn console(&self) -> &ConsoleHandle {
        &self.console
    }

    pub fn debug_panel(&self) -> &DebugPanel {
        &self.panel
    }

    /// Page clock in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.event_loop.current_time()
    }

    /// Native track indices the renderer listens on
    pub fn listening_tracks(&self) -> Vec<usize> {
        self.video
            .base
            .text_tracks
            .tracks_with_listener(RENDERER_LISTENER)
    }
}

impl Default for PlayerPage {
    fn default() -> Self {
        Self::new(PlayerConfig::default())
    }
}
