//! Track Selection
//!
//! Moves the page between `Idle`, `Transitioning*` and `Active*` states.
//! One transition may be in flight at a time. Every transition carries a
//! generation number; delayed callbacks from an older generation are
//! dropped, so a superseded selection can never touch the current one.

use fos_media::{HTMLMediaElement, TextTrackMode};

use crate::config::PlayerConfig;
use crate::event_loop::{EventLoop, TimerId};
use crate::registry::{TrackId, TrackOrigin, TrackRegistry};
use crate::renderer::CaptionRenderer;

/// Delayed work scheduled by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionTask {
    /// Cues had time to materialize; wire the renderer to `index`
    ActivateEmbedded { generation: u64, index: usize },
    /// The `<track>` load event did not arrive in time
    UploadedLoadTimeout { generation: u64 },
}

/// What `select_track` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Reached a quiescent state synchronously (`none`)
    Completed,
    /// Transition started; finishes on a timer or the load event
    Started(TrackId),
    /// Another transition is in flight
    Rejected,
    /// No registry entry with that id
    UnknownTrack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Embedded { index: usize },
    /// Waiting for `load` on the `<track>` element
    Uploaded { listening: bool },
}

#[derive(Debug, Clone)]
struct Transition {
    generation: u64,
    target: TrackId,
    pending: Pending,
    timer: TimerId,
}

/// Collaborators a transition touches
pub struct SelectionContext<'a, T> {
    pub video: &'a mut HTMLMediaElement,
    pub registry: &'a TrackRegistry,
    pub renderer: &'a mut CaptionRenderer,
    pub timers: &'a mut EventLoop<T>,
    pub config: &'a PlayerConfig,
}

/// Selection state for one loaded video
#[derive(Debug)]
pub struct SelectionState {
    active_track_id: Option<TrackId>,
    active_native_index: Option<usize>,
    captions_enabled: bool,
    in_flight: Option<Transition>,
    generation: u64,
}

impl SelectionState {
    pub fn new(captions_enabled: bool) -> Self {
        Self {
            active_track_id: None,
            active_native_index: None,
            captions_enabled,
            in_flight: None,
            generation: 0,
        }
    }

    /// Active track id; `None` is the `none` selection
    pub fn active_track_id(&self) -> Option<&TrackId> {
        self.active_track_id.as_ref()
    }

    /// Native track index feeding the renderer
    pub fn active_native_index(&self) -> Option<usize> {
        self.active_native_index
    }

    pub fn captions_enabled(&self) -> bool {
        self.captions_enabled
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Target of the in-flight transition
    pub fn pending_target(&self) -> Option<&TrackId> {
        self.in_flight.as_ref().map(|t| &t.target)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Quiescent state for a new video. Pending work is cancelled.
    pub fn reset<T>(&mut self, captions_enabled: bool, timers: &mut EventLoop<T>) {
        self.supersede(timers);
        self.active_track_id = None;
        self.active_native_index = None;
        self.captions_enabled = captions_enabled;
    }

    /// Abandon the in-flight transition: its timer is cleared, its load
    /// listener dropped and the generation bumped so anything already
    /// queued for it is ignored.
    pub fn supersede<T>(&mut self, timers: &mut EventLoop<T>) {
        self.generation += 1;
        if let Some(transition) = self.in_flight.take() {
            timers.clear_timer(transition.timer);
            tracing::debug!(
                target_id = %transition.target,
                generation = transition.generation,
                "selection superseded"
            );
        }
    }

    /// Select a track by id
    pub fn select_track<T>(&mut self, id: &str, cx: &mut SelectionContext<'_, T>) -> SelectOutcome
    where
        T: From<SelectionTask>,
    {
        if let Some(transition) = &self.in_flight {
            tracing::warn!(
                requested = id,
                pending = %transition.target,
                "selection rejected: another selection is in flight"
            );
            return SelectOutcome::Rejected;
        }

        if id == TrackId::NONE {
            self.deactivate_all(cx.video);
            cx.renderer.detach(&mut cx.video.text_tracks);
            cx.renderer.hide();
            self.active_track_id = None;
            self.active_native_index = None;
            tracing::debug!("captions off");
            return SelectOutcome::Completed;
        }

        let Some(descriptor) = cx.registry.get(id) else {
            tracing::debug!(id, "selection ignored: unknown track id");
            return SelectOutcome::UnknownTrack;
        };
        let target = descriptor.id.clone();

        self.generation += 1;
        let generation = self.generation;
        self.deactivate_all(cx.video);
        cx.renderer.detach(&mut cx.video.text_tracks);
        cx.renderer.suppress();

        let (pending, timer) = match &descriptor.origin {
            TrackOrigin::Embedded { index } => {
                let index = *index;
                if let Some(track) = cx.video.text_tracks.get_mut(index) {
                    track.set_mode(TextTrackMode::Hidden);
                }
                let timer = cx.timers.set_timeout(
                    SelectionTask::ActivateEmbedded { generation, index }.into(),
                    cx.config.embedded_activation_delay_ms,
                );
                (Pending::Embedded { index }, timer)
            }
            TrackOrigin::Uploaded { url } => {
                cx.video.set_track_src(url);
                let timer = cx.timers.set_timeout(
                    SelectionTask::UploadedLoadTimeout { generation }.into(),
                    cx.config.track_load_timeout_ms,
                );
                (Pending::Uploaded { listening: true }, timer)
            }
        };

        tracing::debug!(id = %target, generation, "selection started");
        self.active_track_id = Some(target.clone());
        self.in_flight = Some(Transition {
            generation,
            target: target.clone(),
            pending,
            timer,
        });
        SelectOutcome::Started(target)
    }

    /// `load` fired on the `<track>` element
    pub fn on_track_load<T>(&mut self, cx: &mut SelectionContext<'_, T>) {
        let Some(transition) = &mut self.in_flight else {
            return;
        };
        let Pending::Uploaded { listening: true } = transition.pending else {
            return;
        };
        // One-shot listener
        transition.pending = Pending::Uploaded { listening: false };
        let timer = transition.timer;
        cx.timers.clear_timer(timer);
        tracing::debug!("caption track loaded");
        self.activate(HTMLMediaElement::TRACK_ELEMENT_INDEX, cx);
    }

    /// Run a delayed selection task
    pub fn on_task<T>(&mut self, task: SelectionTask, cx: &mut SelectionContext<'_, T>) {
        let current = self.in_flight.as_ref().map(|t| (t.generation, t.pending));
        match (task, current) {
            (
                SelectionTask::ActivateEmbedded { generation, index },
                Some((current, Pending::Embedded { index: pending })),
            ) if generation == current && index == pending => {
                self.activate(index, cx);
            }
            (
                SelectionTask::UploadedLoadTimeout { generation },
                Some((current, Pending::Uploaded { .. })),
            ) if generation == current => {
                tracing::debug!(
                    timeout_ms = cx.config.track_load_timeout_ms,
                    "caption track load timed out, activating anyway"
                );
                self.activate(HTMLMediaElement::TRACK_ELEMENT_INDEX, cx);
            }
            (task, _) => {
                tracing::debug!(?task, "stale selection task discarded");
            }
        }
    }

    /// Invert `captions_enabled`. No-op without an active track.
    pub fn toggle_captions(
        &mut self,
        video: &HTMLMediaElement,
        renderer: &mut CaptionRenderer,
    ) -> bool {
        if self.active_track_id.is_none() {
            return self.captions_enabled;
        }
        self.captions_enabled = !self.captions_enabled;
        renderer.set_enabled(self.captions_enabled, &video.text_tracks);
        tracing::debug!(enabled = self.captions_enabled, "captions toggled");
        self.captions_enabled
    }

    fn activate<T>(&mut self, index: usize, cx: &mut SelectionContext<'_, T>) {
        let Some(transition) = self.in_flight.take() else {
            return;
        };
        let Some(track) = cx.video.text_tracks.get_mut(index) else {
            tracing::warn!(id = %transition.target, index, "selected track disappeared");
            return;
        };
        track.set_mode(TextTrackMode::Hidden);

        cx.renderer.show();
        if cx.renderer.attach_to(&mut cx.video.text_tracks, index) {
            cx.renderer.render_current(&cx.video.text_tracks);
            self.active_native_index = Some(index);
        }
        tracing::debug!(
            id = %transition.target,
            index,
            generation = transition.generation,
            "selection active"
        );
    }

    fn deactivate_all(&mut self, video: &mut HTMLMediaElement) {
        for track in video.text_tracks.iter_mut() {
            track.set_mode(TextTrackMode::Disabled);
        }
        self.active_native_index = None;
    }
}

impl Default for SelectionState {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_media::{
        Blob, InBandTrack, ListenerId, MediaEvent, MediaResource, ObjectUrlRegistry, TextTrackKind,
    };
    use std::sync::Arc;

    struct Harness {
        urls: ObjectUrlRegistry,
        video: HTMLMediaElement,
        registry: TrackRegistry,
        renderer: CaptionRenderer,
        timers: EventLoop<SelectionTask>,
        config: PlayerConfig,
        state: SelectionState,
    }

    impl Harness {
        fn new() -> Self {
            let resource = MediaResource::new(60.0)
                .with_track(InBandTrack::new(TextTrackKind::Subtitles, "English", "en").with_cue(0.0, 30.0, "hello"))
                .with_track(InBandTrack::new(TextTrackKind::Subtitles, "German", "de").with_cue(0.0, 30.0, "hallo"));
            let mut video = HTMLMediaElement::new();
            video.load("blob:null/1", Some(Arc::new(resource)));
            let urls = ObjectUrlRegistry::new();
            video.advance(100, &urls);
            video.drain_events();

            let mut registry = TrackRegistry::new();
            registry.add_embedded(1, "English");
            registry.add_embedded(2, "German");

            Self {
                urls,
                video,
                registry,
                renderer: CaptionRenderer::new(ListenerId(1), true),
                timers: EventLoop::new(),
                config: PlayerConfig::default(),
                state: SelectionState::new(true),
            }
        }

        fn select(&mut self, id: &str) -> SelectOutcome {
            let mut cx = SelectionContext {
                video: &mut self.video,
                registry: &self.registry,
                renderer: &mut self.renderer,
                timers: &mut self.timers,
                config: &self.config,
            };
            self.state.select_track(id, &mut cx)
        }

        fn run(&mut self, ms: u64) {
            for _ in 0..ms / 10 {
                self.video.advance(10, &self.urls);
                self.timers.advance(10);
                for event in self.video.drain_events() {
                    match event {
                        MediaEvent::CueChange(index) => self.renderer.on_cue_change(&self.video.text_tracks, index),
                        MediaEvent::TrackLoad => {
                            let mut cx = SelectionContext {
                                video: &mut self.video,
                                registry: &self.registry,
                                renderer: &mut self.renderer,
                                timers: &mut self.timers,
                                config: &self.config,
                            };
                            self.state.on_track_load(&mut cx);
                        }
                        _ => {}
                    }
                }
                while let Some(task) = self.timers.next_task() {
                    self.dispatch(task);
                }
            }
        }

        fn dispatch(&mut self, task: SelectionTask) {
            let mut cx = SelectionContext {
                video: &mut self.video,
                registry: &self.registry,
                renderer: &mut self.renderer,
                timers: &mut self.timers,
                config: &self.config,
            };
            self.state.on_task(task, &mut cx);
        }

        fn listeners(&self) -> Vec<usize> {
            self.video.text_tracks.tracks_with_listener(self.renderer.listener())
        }
    }

    #[test]
    fn test_embedded_selection() {
        let mut h = Harness::new();
        assert_eq!(h.select("embedded-2"), SelectOutcome::Started(TrackId::embedded(2)));
        assert!(h.state.is_in_flight());
        assert_eq!(h.video.text_tracks.get(2).unwrap().mode(), TextTrackMode::Hidden);
        assert_eq!(h.video.text_tracks.get(1).unwrap().mode(), TextTrackMode::Disabled);

        h.run(500);
        assert!(!h.state.is_in_flight());
        assert_eq!(h.state.active_native_index(), Some(2));
        assert_eq!(h.listeners(), vec![2]);
        assert_eq!(h.renderer.overlay().displayed_text(), Some("hallo"));
    }

    #[test]
    fn test_switch_hides_previous_cue_until_activation() {
        let mut h = Harness::new();
        h.select("embedded-1");
        h.run(500);
        assert_eq!(h.renderer.overlay().displayed_text(), Some("hello"));

        h.select("embedded-2");
        assert_eq!(h.renderer.overlay().displayed_text(), None);
        h.run(300);
        assert_eq!(h.renderer.overlay().displayed_text(), None);
        assert!(h.renderer.is_enabled());

        h.run(200);
        assert_eq!(h.renderer.overlay().displayed_text(), Some("hallo"));
    }

    #[test]
    fn test_rejects_while_in_flight() {
        let mut h = Harness::new();
        h.select("embedded-1");
        let generation = h.state.generation();

        assert_eq!(h.select("embedded-2"), SelectOutcome::Rejected);
        assert_eq!(h.select("none"), SelectOutcome::Rejected);
        assert_eq!(h.state.generation(), generation);
        assert_eq!(h.state.pending_target(), Some(&TrackId::embedded(1)));

        h.run(500);
        assert_eq!(h.state.active_track_id(), Some(&TrackId::embedded(1)));
        assert_eq!(h.select("embedded-2"), SelectOutcome::Started(TrackId::embedded(2)));
    }

    #[test]
    fn test_select_none() {
        let mut h = Harness::new();
        h.select("embedded-1");
        h.run(500);
        assert_eq!(h.listeners(), vec![1]);

        assert_eq!(h.select("none"), SelectOutcome::Completed);
        assert_eq!(h.state.active_track_id(), None);
        assert_eq!(h.state.active_native_index(), None);
        assert!(h.listeners().is_empty());
        assert!(!h.renderer.overlay().is_visible());
        assert!(h.video.text_tracks.iter().all(|t| t.mode() == TextTrackMode::Disabled));
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let mut h = Harness::new();
        h.select("embedded-1");
        h.run(500);

        assert_eq!(h.select("uploaded-42"), SelectOutcome::UnknownTrack);
        assert!(!h.state.is_in_flight());
        assert_eq!(h.state.active_track_id(), Some(&TrackId::embedded(1)));
        assert_eq!(h.listeners(), vec![1]);
    }

    #[test]
    fn test_superseded_timer_is_discarded() {
        let mut h = Harness::new();
        h.select("embedded-1");
        let stale = SelectionTask::ActivateEmbedded {
            generation: h.state.generation(),
            index: 1,
        };
        h.state.supersede(&mut h.timers);
        assert_eq!(h.timers.pending_timers(), 0);

        h.select("embedded-2");
        h.dispatch(stale);
        assert!(h.state.is_in_flight());
        assert!(h.listeners().is_empty());

        h.run(500);
        assert_eq!(h.listeners(), vec![2]);
        assert_eq!(h.state.active_track_id(), Some(&TrackId::embedded(2)));
    }

    #[test]
    fn test_uploaded_selection_on_load() {
        let mut h = Harness::new();
        let url = h.urls.create_object_url(Blob::from_text(
            "WEBVTT\n\n00:00.000 --> 00:10.000\nfrom upload\n",
            "text/vtt",
        ));
        let id = h.registry.add_uploaded("movie", &url);

        h.select(id.as_str());
        assert_eq!(h.video.track_element().src(), url);
        // Load fires after 50ms, well before the timeout
        h.run(60);
        assert!(!h.state.is_in_flight());
        assert_eq!(h.timers.pending_timers(), 0);
        assert_eq!(h.state.active_native_index(), Some(0));
        assert_eq!(h.listeners(), vec![0]);

        h.run(20);
        assert_eq!(h.renderer.overlay().displayed_text(), Some("from upload"));
    }

    #[test]
    fn test_uploaded_selection_times_out() {
        let mut h = Harness::new();
        h.video = HTMLMediaElement::with_timing(fos_media::DecoderTiming {
            track_load_ms: None,
            ..Default::default()
        });
        let id = h.registry.add_uploaded("movie", "blob:null/7");
        h.select(id.as_str());

        h.run(490);
        assert!(h.state.is_in_flight());
        h.run(10);
        assert!(!h.state.is_in_flight());
        assert_eq!(h.listeners(), vec![0]);
    }

    #[test]
    fn test_toggle_requires_active_track() {
        let mut h = Harness::new();
        assert!(h.state.toggle_captions(&h.video, &mut h.renderer));
        assert!(h.state.captions_enabled());

        h.select("embedded-1");
        h.run(500);
        assert!(!h.state.toggle_captions(&h.video, &mut h.renderer));
        assert_eq!(h.renderer.overlay().displayed_text(), None);
        assert!(h.state.toggle_captions(&h.video, &mut h.renderer));
        assert_eq!(h.renderer.overlay().displayed_text(), Some("hello"));
    }
}
