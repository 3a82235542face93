pub mod events;
pub mod session;

pub use events::{PlayerEvent, SourceEvent};
pub use session::{LifecycleState, Session};

use crate::error::PlayerResult;

/// The host's decoded video stream.
///
/// Events flow the other way: the host forwards them to
/// `Session::handle_source_event` through subscriptions it owns, and drops
/// them when `unsubscribe` is called.
pub trait FrameSource {
    fn load(&mut self, uri: &str) -> PlayerResult<()>;
    fn play(&mut self) -> PlayerResult<()>;
    fn pause(&mut self) -> PlayerResult<()>;
    /// Fails when the host rejects the position.
    fn set_current_time(&mut self, seconds: f64) -> PlayerResult<()>;
    /// Fails when the host rejects the rate, e.g. outside its supported range.
    fn set_playback_rate(&mut self, rate: f64) -> PlayerResult<()>;
    fn set_loop(&mut self, looping: bool);
    fn is_loop(&self) -> bool;
    fn set_muted(&mut self, muted: bool);
    /// Natural (packed) frame size, `(0, 0)` until metadata is known.
    fn natural_size(&self) -> (u32, u32);
    /// Detaches every event subscription.
    fn unsubscribe(&mut self) -> PlayerResult<()>;
    /// Stops decoding and releases the underlying media.
    fn release(&mut self) -> PlayerResult<()>;
}

#[cfg(test)]
mod tests;
