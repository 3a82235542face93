use js_sys::{Function, Reflect};
use log::debug;
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{HtmlVideoElement, Window};

use crate::{
    error::{PlayerError, PlayerResult},
    frame_pump::{Primitive, Scheduler},
};

const REQUEST_VIDEO_FRAME: &str = "requestVideoFrameCallback";
const CANCEL_VIDEO_FRAME: &str = "cancelVideoFrameCallback";
const REQUEST_ANIMATION_FRAME: &str = "requestAnimationFrame";

/// Browser scheduling primitives, all calling back into the same tick closure.
pub struct WebScheduler {
    window: Window,
    video: HtmlVideoElement,
    tick: Option<Closure<dyn FnMut()>>,
}

impl WebScheduler {
    pub fn new(window: Window, video: HtmlVideoElement) -> Self {
        Self {
            window,
            video,
            tick: None,
        }
    }

    /// Installs the closure invoked whenever a request fires.
    pub fn install_tick(&mut self, tick: Closure<dyn FnMut()>) {
        self.tick = Some(tick);
    }

    fn tick_fn(&self) -> PlayerResult<&Function> {
        self.tick
            .as_ref()
            .map(|tick| tick.as_ref().unchecked_ref::<Function>())
            .ok_or_else(|| PlayerError::host("tick callback not installed"))
    }

    fn video_method(&self, name: &str) -> Option<Function> {
        Reflect::get(&self.video, &JsValue::from_str(name))
            .ok()?
            .dyn_into::<Function>()
            .ok()
    }
}

impl Scheduler for WebScheduler {
    fn supports(&self, primitive: Primitive) -> bool {
        match primitive {
            Primitive::VideoFrame => self.video_method(REQUEST_VIDEO_FRAME).is_some(),
            Primitive::AnimationFrame => {
                Reflect::has(&self.window, &JsValue::from_str(REQUEST_ANIMATION_FRAME))
                    .unwrap_or(false)
            }
            Primitive::Timer => true,
        }
    }

    fn request(&mut self, primitive: Primitive, delay_ms: i32) -> PlayerResult<i32> {
        let tick = self.tick_fn()?;
        let handle = match primitive {
            Primitive::VideoFrame => {
                let request = self
                    .video_method(REQUEST_VIDEO_FRAME)
                    .ok_or_else(|| PlayerError::host("requestVideoFrameCallback unavailable"))?;
                request
                    .call1(&self.video, tick)?
                    .as_f64()
                    .map(|id| id as i32)
                    .unwrap_or(0)
            }
            Primitive::AnimationFrame => self.window.request_animation_frame(tick)?,
            Primitive::Timer => self
                .window
                .set_timeout_with_callback_and_timeout_and_arguments_0(tick, delay_ms)?,
        };
        Ok(handle)
    }

    fn cancel(&mut self, primitive: Primitive, handle: i32) {
        let result = match primitive {
            Primitive::VideoFrame => match self.video_method(CANCEL_VIDEO_FRAME) {
                Some(cancel) => cancel
                    .call1(&self.video, &JsValue::from(handle))
                    .map(|_| ()),
                None => Ok(()),
            },
            Primitive::AnimationFrame => self.window.cancel_animation_frame(handle),
            Primitive::Timer => {
                self.window.clear_timeout_with_handle(handle);
                Ok(())
            }
        };
        if let Err(err) = result {
            debug!("Ignoring failed cancel of {:?} {}: {:?}", primitive, handle, err);
        }
    }
}
