use crate::{
    error::{PlayerError, PlayerResult},
    frame_pump::TickerOptions,
    geometry::{Orientation, PackingConvention, Side},
};

/// Resolved player configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub src: String,
    /// CSS-pixel width override; the container width is used when absent.
    pub width: Option<f64>,
    /// CSS-pixel height override; the container height is used when absent.
    pub height: Option<f64>,
    pub playback_rate: f64,
    pub muted: bool,
    pub loop_playback: bool,
    /// Frame-rate cap, 0 means one composite per display refresh.
    pub fps: u32,
    pub orientation: Orientation,
    pub side: Side,
    /// Prefer the per-decoded-frame callback when the browser has one.
    pub video_frame: bool,
    pub debug: bool,
    pub auto_show: bool,
    pub auto_clear: bool,
    pub auto_destroy: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            src: String::new(),
            width: None,
            height: None,
            playback_rate: 1.0,
            muted: true,
            loop_playback: false,
            fps: 0,
            orientation: Orientation::Landscape,
            side: Side::Front,
            video_frame: false,
            debug: false,
            auto_show: false,
            auto_clear: true,
            auto_destroy: false,
        }
    }
}

impl PlayerConfig {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            ..Default::default()
        }
    }

    pub fn packing(&self) -> PackingConvention {
        PackingConvention::new(self.orientation, self.side)
    }

    pub fn ticker_options(&self) -> TickerOptions {
        TickerOptions {
            prefer_video_frame: self.video_frame,
            fps_cap: self.fps,
            ..Default::default()
        }
    }

    /// Merges every field present in `patch` over this configuration.
    pub fn merge(&mut self, patch: &ConfigPatch) {
        if let Some(src) = &patch.src {
            self.src = src.clone();
        }
        if patch.width.is_some() {
            self.width = patch.width;
        }
        if patch.height.is_some() {
            self.height = patch.height;
        }
        if let Some(rate) = patch.playback_rate {
            self.playback_rate = rate;
        }
        if let Some(muted) = patch.muted {
            self.muted = muted;
        }
        if let Some(loop_playback) = patch.loop_playback {
            self.loop_playback = loop_playback;
        }
        if let Some(fps) = patch.fps {
            self.fps = fps;
        }
        if let Some(orientation) = patch.orientation {
            self.orientation = orientation;
        }
        if let Some(side) = patch.side {
            self.side = side;
        }
        if let Some(video_frame) = patch.video_frame {
            self.video_frame = video_frame;
        }
        if let Some(debug) = patch.debug {
            self.debug = debug;
        }
        if let Some(auto_show) = patch.auto_show {
            self.auto_show = auto_show;
        }
        if let Some(auto_clear) = patch.auto_clear {
            self.auto_clear = auto_clear;
        }
        if let Some(auto_destroy) = patch.auto_destroy {
            self.auto_destroy = auto_destroy;
        }
    }
}

/// Partial configuration accepted by `play`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPatch {
    pub src: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub playback_rate: Option<f64>,
    pub muted: Option<bool>,
    pub loop_playback: Option<bool>,
    pub fps: Option<u32>,
    pub orientation: Option<Orientation>,
    pub side: Option<Side>,
    pub video_frame: Option<bool>,
    pub debug: Option<bool>,
    pub auto_show: Option<bool>,
    pub auto_clear: Option<bool>,
    pub auto_destroy: Option<bool>,
}

impl ConfigPatch {
    /// Rejects numbers the media element would throw on.
    pub fn validate(&self) -> PlayerResult<()> {
        let numbers = [
            ("playbackRate", self.playback_rate),
            ("width", self.width),
            ("height", self.height),
        ];
        for (name, value) in numbers {
            if let Some(value) = value.filter(|v| !v.is_finite()) {
                return Err(PlayerError::invalid_config(format!(
                    "{} must be finite, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    pub fn changes_packing(&self, current: &PlayerConfig) -> bool {
        self.orientation.map_or(false, |o| o != current.orientation)
            || self.side.map_or(false, |s| s != current.side)
    }

    pub fn changes_ticker(&self, current: &PlayerConfig) -> bool {
        self.fps.map_or(false, |fps| fps != current.fps)
            || self.video_frame.map_or(false, |v| v != current.video_frame)
    }
}
