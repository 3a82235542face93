pub mod config;
pub mod error;
pub mod frame_pump;
pub mod geometry;
pub mod host;
pub mod js_api;
pub mod player;
pub mod rendering;
pub mod rendering_gpu;
pub mod utils;

use utils::{init_logging, set_panic_hook};
use wasm_bindgen::prelude::*;

pub use config::{ConfigPatch, PlayerConfig};
pub use error::{PlayerError, PlayerResult};
pub use js_api::AlphaVideoPlayer;
pub use player::{LifecycleState, PlayerEvent, Session};

#[wasm_bindgen(js_name = isWebglSupported)]
pub fn is_webgl_supported() -> bool {
    rendering_gpu::is_webgl_supported()
}

#[wasm_bindgen(start)]
pub fn main() {
    set_panic_hook();
    init_logging(false);
}
