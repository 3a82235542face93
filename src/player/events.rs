/// Notifications surfaced to the embedding page, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    InitSuccess,
    InitError(String),
    /// Metadata arrived; natural size is known.
    Load,
    /// First time the source can play through without stalling.
    CanPlay,
    Play,
    /// The source became ready again after wrapping around.
    Loop,
    Pause,
    Ended,
    Error(String),
    Destroy,
}

impl PlayerEvent {
    /// Name of the page callback receiving this event.
    pub fn callback_name(&self) -> &'static str {
        match self {
            PlayerEvent::InitSuccess => "onInitSuccess",
            PlayerEvent::InitError(_) => "onInitError",
            PlayerEvent::Load => "onLoad",
            PlayerEvent::CanPlay => "onCanPlay",
            PlayerEvent::Play => "onPlay",
            PlayerEvent::Loop => "onLoop",
            PlayerEvent::Pause => "onPause",
            PlayerEvent::Ended => "onEnded",
            PlayerEvent::Error(_) => "onError",
            PlayerEvent::Destroy => "onDestroy",
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match self {
            PlayerEvent::InitError(detail) | PlayerEvent::Error(detail) => Some(detail),
            _ => None,
        }
    }
}

/// Events raised by the frame source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    MetadataLoaded,
    CanPlayThrough,
    Play,
    Pause,
    Ended,
    Error(String),
}

impl SourceEvent {
    /// DOM event names a media element raises for each variant.
    pub const DOM_EVENTS: [&'static str; 6] =
        ["loadedmetadata", "canplaythrough", "play", "pause", "ended", "error"];
}
