//! Frame pump: turns whichever scheduling primitive the host offers into a
//! single "produce the next frame" callback chain.
//!
//! The host only has to deliver a wake-up through `FramePump::on_host_tick`
//! every time a request made through `Scheduler::request` fires. The pump
//! decides which primitive to use, throttles display-refresh callbacks to the
//! configured frame-rate cap and keeps at most one request outstanding.

use log::debug;

use crate::error::PlayerResult;

/// Assumed display refresh rate when throttling animation frames.
pub const DEFAULT_REFRESH_RATE: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Fires once per decoded video frame.
    VideoFrame,
    /// Fires once per display refresh.
    AnimationFrame,
    /// Fires after a fixed delay.
    Timer,
}

/// Host scheduling primitives.
pub trait Scheduler {
    fn supports(&self, primitive: Primitive) -> bool;

    /// Arranges for the host to call back once; `delay_ms` only applies to
    /// `Primitive::Timer`. Returns the host's handle for the request.
    fn request(&mut self, primitive: Primitive, delay_ms: i32) -> PlayerResult<i32>;

    /// Must tolerate handles that already fired or were canceled.
    fn cancel(&mut self, primitive: Primitive, handle: i32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickerOptions {
    pub prefer_video_frame: bool,
    /// 0 means uncapped.
    pub fps_cap: u32,
    pub refresh_rate: u32,
}

impl Default for TickerOptions {
    fn default() -> Self {
        Self {
            prefer_video_frame: false,
            fps_cap: 0,
            refresh_rate: DEFAULT_REFRESH_RATE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStrategy {
    VideoFrame,
    /// Produce a frame on every `period`-th refresh.
    AnimationFrame { period: u32 },
    /// Best-effort fixed delay.
    Timer { delay_ms: i32 },
}

impl TickStrategy {
    pub fn select<S: Scheduler + ?Sized>(scheduler: &S, options: TickerOptions) -> Self {
        if options.prefer_video_frame && scheduler.supports(Primitive::VideoFrame) {
            return TickStrategy::VideoFrame;
        }

        let refresh_rate = options.refresh_rate.max(1);
        if scheduler.supports(Primitive::AnimationFrame) {
            let period = if options.fps_cap == 0 {
                1
            } else {
                (refresh_rate as f64 / options.fps_cap as f64).round().max(1.0) as u32
            };
            return TickStrategy::AnimationFrame { period };
        }

        let fps = if options.fps_cap == 0 { refresh_rate } else { options.fps_cap };
        TickStrategy::Timer {
            delay_ms: (1000.0 / fps as f64).round() as i32,
        }
    }

    fn primitive(&self) -> Primitive {
        match self {
            TickStrategy::VideoFrame => Primitive::VideoFrame,
            TickStrategy::AnimationFrame { .. } => Primitive::AnimationFrame,
            TickStrategy::Timer { .. } => Primitive::Timer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRequest {
    primitive: Primitive,
    handle: i32,
}

pub struct FramePump<S> {
    scheduler: S,
    strategy: TickStrategy,
    /// Refresh index of the outstanding request. Advanced on every
    /// animation-frame request, including the ones that end up skipped.
    refresh_index: i64,
    pending: Option<PendingRequest>,
}

impl<S: Scheduler> FramePump<S> {
    pub fn new(scheduler: S, options: TickerOptions) -> Self {
        let strategy = TickStrategy::select(&scheduler, options);
        debug!("Frame pump using {:?}", strategy);
        Self {
            scheduler,
            strategy,
            refresh_index: -1,
            pending: None,
        }
    }

    pub fn strategy(&self) -> TickStrategy {
        self.strategy
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn is_scheduled(&self) -> bool {
        self.pending.is_some()
    }

    /// Cancels anything outstanding and re-selects the strategy.
    pub fn reconfigure(&mut self, options: TickerOptions) {
        self.cancel();
        self.strategy = TickStrategy::select(&self.scheduler, options);
        debug!("Frame pump reconfigured to {:?}", self.strategy);
    }

    /// Requests the next wake-up, replacing any outstanding request.
    pub fn schedule_next(&mut self) -> PlayerResult<()> {
        self.cancel();

        let delay_ms = match self.strategy {
            TickStrategy::Timer { delay_ms } => delay_ms,
            TickStrategy::AnimationFrame { .. } => {
                self.refresh_index += 1;
                0
            }
            TickStrategy::VideoFrame => 0,
        };
        let primitive = self.strategy.primitive();
        let handle = self.scheduler.request(primitive, delay_ms)?;
        self.pending = Some(PendingRequest { primitive, handle });
        Ok(())
    }

    /// Called by the host when a request fires. Returns whether a frame should
    /// be produced now; skipped refreshes are silently rescheduled.
    pub fn on_host_tick(&mut self) -> bool {
        if self.pending.take().is_none() {
            // canceled or stale
            return false;
        }

        match self.strategy {
            TickStrategy::AnimationFrame { period } if period > 1 => {
                if self.refresh_index % period as i64 == 0 {
                    true
                } else {
                    if let Err(err) = self.schedule_next() {
                        debug!("Failed to reschedule skipped refresh: {}", err);
                    }
                    false
                }
            }
            _ => true,
        }
    }

    /// Safe to call at any time, any number of times.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.scheduler.cancel(pending.primitive, pending.handle);
        }
    }
}
