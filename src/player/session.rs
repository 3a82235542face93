use log::{debug, warn};

use crate::{
    config::{ConfigPatch, PlayerConfig},
    error::{PlayerError, PlayerResult},
    frame_pump::{FramePump, Scheduler},
    rendering_gpu::Compositor,
};

use super::{FrameSource, PlayerEvent, SourceEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, renderer not initialized yet.
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    /// Renderer initialization failed; nothing works anymore.
    Failed,
    Destroyed,
}

impl LifecycleState {
    pub fn is_usable(self) -> bool {
        !matches!(
            self,
            LifecycleState::Idle | LifecycleState::Failed | LifecycleState::Destroyed
        )
    }
}

/// One playback session: a frame source, a compositor strategy fixed at
/// construction, and the frame pump that drives it.
///
/// Notifications are queued rather than delivered inline so the host can call
/// page code after releasing its borrow of the session; page callbacks are
/// then free to call back into the player, including `destroy`.
pub struct Session<S, C, H> {
    config: PlayerConfig,
    state: LifecycleState,
    source: S,
    compositor: C,
    pump: FramePump<H>,
    can_play: bool,
    /// Incremented on every arrival at "can play through"; never reset.
    ready_arrivals: u32,
    natural_size: (u32, u32),
    events: Vec<PlayerEvent>,
}

impl<S: FrameSource, C: Compositor, H: Scheduler> Session<S, C, H> {
    pub fn new(config: PlayerConfig, source: S, compositor: C, scheduler: H) -> Self {
        let pump = FramePump::new(scheduler, config.ticker_options());
        Self {
            config,
            state: LifecycleState::Idle,
            source,
            compositor,
            pump,
            can_play: false,
            ready_arrivals: 0,
            natural_size: (0, 0),
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn is_playing(&self) -> bool {
        self.state == LifecycleState::Playing
    }

    pub fn is_loop(&self) -> bool {
        self.state.is_usable() && self.source.is_loop()
    }

    pub fn natural_size(&self) -> (u32, u32) {
        self.natural_size
    }

    pub fn ready_arrivals(&self) -> u32 {
        self.ready_arrivals
    }

    pub fn compositor(&self) -> &C {
        &self.compositor
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn scheduler_mut(&mut self) -> &mut H {
        self.pump.scheduler_mut()
    }

    pub fn pump(&self) -> &FramePump<H> {
        &self.pump
    }

    /// Takes every notification queued since the last call.
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: PlayerEvent) {
        debug!("Player event: {:?}", event);
        self.events.push(event);
    }

    fn ensure_usable(&self, operation: &'static str) -> PlayerResult<()> {
        if self.state.is_usable() {
            Ok(())
        } else {
            Err(PlayerError::Usage(operation))
        }
    }

    /// Initializes the compositor and starts loading the source.
    ///
    /// A failure is reported as `PlayerEvent::InitError`; the session then
    /// releases what it holds and stays unusable.
    pub fn initialize(&mut self) {
        if self.state != LifecycleState::Idle {
            return;
        }

        match self.compositor.initialize() {
            Ok(()) => {
                debug!("Compositor {:?} initialized", self.compositor.backend());
                let src = self.config.src.clone();
                let loaded = self
                    .apply_source_settings()
                    .and_then(|()| self.source.load(&src));
                match loaded {
                    Ok(()) => {
                        self.state = LifecycleState::Loading;
                        self.emit(PlayerEvent::InitSuccess);
                    }
                    Err(err) => self.fail_initialization(err),
                }
            }
            Err(err) => self.fail_initialization(err),
        }
    }

    fn fail_initialization(&mut self, err: PlayerError) {
        warn!("Player initialization failed: {}", err);
        self.release_resources();
        self.state = LifecycleState::Failed;
        self.emit(PlayerEvent::InitError(err.to_string()));
    }

    fn apply_source_settings(&mut self) -> PlayerResult<()> {
        self.source.set_loop(self.config.loop_playback);
        self.source.set_muted(self.config.muted);
        self.source.set_playback_rate(self.config.playback_rate)
    }

    pub fn handle_source_event(&mut self, event: SourceEvent) {
        if !self.state.is_usable() {
            return;
        }

        match event {
            SourceEvent::MetadataLoaded => {
                self.natural_size = self.source.natural_size();
                debug!("Video metadata loaded: {:?}", self.natural_size);
                self.emit(PlayerEvent::Load);
            }
            SourceEvent::CanPlayThrough => self.on_can_play_through(),
            SourceEvent::Play => self.emit(PlayerEvent::Play),
            SourceEvent::Pause => self.emit(PlayerEvent::Pause),
            SourceEvent::Ended => self.on_ended(),
            SourceEvent::Error(detail) => {
                self.emit(PlayerEvent::Error(PlayerError::Source(detail).to_string()));
                self.destroy();
            }
        }
    }

    fn on_can_play_through(&mut self) {
        self.can_play = true;
        if matches!(self.state, LifecycleState::Loading | LifecycleState::Ended) {
            self.state = LifecycleState::Ready;
        }

        if self.config.auto_show {
            self.composite_once();
        }

        // can-play-through repeats (e.g. after wrapping around); only the
        // first arrival is the ready notification
        self.ready_arrivals += 1;
        if self.ready_arrivals == 1 {
            self.emit(PlayerEvent::CanPlay);
        } else if self.config.loop_playback {
            self.emit(PlayerEvent::Loop);
        }
    }

    fn on_ended(&mut self) {
        if let Err(err) = self.source.set_current_time(0.0) {
            debug!("Failed to rewind ended video: {}", err);
        }
        self.pump.cancel();
        if self.config.auto_clear {
            self.compositor.clear();
        }
        self.state = LifecycleState::Ended;
        self.emit(PlayerEvent::Ended);
        if self.config.auto_destroy {
            self.destroy();
        }
    }

    fn composite_once(&mut self) {
        if !self.can_play {
            return;
        }
        if let Err(err) = self.compositor.composite_frame() {
            warn!("Failed to composite frame: {}", err);
        }
    }

    /// Host wake-up from the frame pump.
    pub fn on_tick(&mut self) {
        if self.state != LifecycleState::Playing {
            self.pump.cancel();
            return;
        }
        if !self.pump.on_host_tick() {
            return;
        }
        self.composite_once();
        self.schedule_next_tick();
    }

    fn schedule_next_tick(&mut self) {
        if let Err(err) = self.pump.schedule_next() {
            warn!("Failed to schedule next frame: {}", err);
        }
    }

    /// Starts or resumes playback, optionally merging configuration first.
    pub fn play(&mut self, patch: Option<&ConfigPatch>) -> PlayerResult<()> {
        self.ensure_usable("play")?;

        if let Some(patch) = patch {
            self.apply_patch(patch)?;
        }

        self.source.play()?;
        self.state = LifecycleState::Playing;
        self.composite_once();
        self.pump.schedule_next()
    }

    fn apply_patch(&mut self, patch: &ConfigPatch) -> PlayerResult<()> {
        patch.validate()?;
        let packing_changed = patch.changes_packing(&self.config);
        let ticker_changed = patch.changes_ticker(&self.config);
        let new_src = patch.src.as_ref().filter(|src| **src != self.config.src).cloned();

        self.config.merge(patch);
        self.apply_source_settings()?;

        if packing_changed {
            self.compositor.set_packing(self.config.packing())?;
        }
        if ticker_changed {
            self.pump.reconfigure(self.config.ticker_options());
        }
        if let Some(src) = new_src {
            self.repoint_source(&src)?;
        }
        Ok(())
    }

    pub fn pause(&mut self) -> PlayerResult<()> {
        self.ensure_usable("pause")?;
        self.source.pause()?;
        self.pump.cancel();
        if self.state == LifecycleState::Playing {
            self.state = LifecycleState::Paused;
        }
        Ok(())
    }

    pub fn reset(&mut self) -> PlayerResult<()> {
        self.seek(0.0)
    }

    pub fn seek(&mut self, seconds: f64) -> PlayerResult<()> {
        self.ensure_usable("set_current_time")?;
        if !seconds.is_finite() {
            return Err(PlayerError::invalid_config(format!(
                "current time must be finite, got {}",
                seconds
            )));
        }
        self.source.set_current_time(seconds)
    }

    /// Points the source at new content; the lifecycle state is untouched.
    pub fn set_src(&mut self, src: &str) -> PlayerResult<()> {
        self.ensure_usable("set_src")?;
        self.config.src = src.to_string();
        self.repoint_source(src)
    }

    fn repoint_source(&mut self, src: &str) -> PlayerResult<()> {
        self.source.load(src)?;
        self.source.set_current_time(0.0)
    }

    pub fn set_muted(&mut self, muted: bool) -> PlayerResult<()> {
        self.ensure_usable("set_mute")?;
        self.config.muted = muted;
        self.source.set_muted(muted);
        Ok(())
    }

    pub fn set_loop(&mut self, looping: bool) -> PlayerResult<()> {
        self.ensure_usable("set_loop")?;
        self.config.loop_playback = looping;
        self.source.set_loop(looping);
        Ok(())
    }

    pub fn set_playback_rate(&mut self, rate: f64) -> PlayerResult<()> {
        self.ensure_usable("set_playback_rate")?;
        if !rate.is_finite() {
            return Err(PlayerError::invalid_config(format!(
                "playback rate must be finite, got {}",
                rate
            )));
        }
        self.source.set_playback_rate(rate)?;
        self.config.playback_rate = rate;
        Ok(())
    }

    /// Tears the session down. Repeated calls are no-ops.
    ///
    /// A session whose initialization failed has already released everything;
    /// destroying it only reports `Destroy`.
    pub fn destroy(&mut self) {
        match self.state {
            LifecycleState::Destroyed => return,
            LifecycleState::Failed => {}
            _ => self.release_resources(),
        }
        self.state = LifecycleState::Destroyed;
        self.can_play = false;
        self.emit(PlayerEvent::Destroy);
    }

    /// Every step runs even if an earlier one failed.
    fn release_resources(&mut self) {
        self.pump.cancel();
        if let Err(err) = self.source.unsubscribe() {
            debug!("Ignoring error while detaching video events: {}", err);
        }
        if let Err(err) = self.source.release() {
            debug!("Ignoring error while releasing video: {}", err);
        }
        if let Err(err) = self.compositor.teardown() {
            debug!("Ignoring error while tearing down compositor: {}", err);
        }
    }
}
