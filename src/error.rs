use wasm_bindgen::JsValue;

pub type PlayerResult<T> = Result<T, PlayerError>;

/// Everything that can go wrong between construction and teardown.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    /// Neither WebGL nor a 2D canvas context is available.
    #[error("your browser does not support alpha video playback (no WebGL or 2D canvas)")]
    Unsupported,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Shader, program, texture, buffer or context setup failed.
    #[error("renderer initialization failed: {0}")]
    StrategyInit(String),

    /// The frame source reported a decode or network failure.
    #[error("video source error: {0}")]
    Source(String),

    /// An operation was invoked on a session that is not usable.
    #[error("`{0}` called before the player was initialized or after it was destroyed")]
    Usage(&'static str),

    /// A browser call returned an exception.
    #[error("host error: {0}")]
    Host(String),
}

impl PlayerError {
    pub fn strategy_init(msg: impl Into<String>) -> Self {
        Self::StrategyInit(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host(msg.into())
    }
}

impl From<JsValue> for PlayerError {
    fn from(value: JsValue) -> Self {
        let message = value
            .as_string()
            .or_else(|| {
                js_sys::Reflect::get(&value, &JsValue::from_str("message"))
                    .ok()
                    .and_then(|m| m.as_string())
            })
            .unwrap_or_else(|| format!("{:?}", value));
        PlayerError::Host(message)
    }
}

impl From<PlayerError> for JsValue {
    fn from(err: PlayerError) -> Self {
        js_sys::Error::new(&format!("[alpha-video-player]: {}", err)).into()
    }
}
