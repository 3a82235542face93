use std::rc::Rc;

use js_sys::Reflect;
use log::debug;
use wasm_bindgen::{prelude::*, JsCast};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Event, HtmlVideoElement};

use crate::{
    config::PlayerConfig,
    error::{PlayerError, PlayerResult},
    player::{FrameSource, SourceEvent},
};

/// Creates the hidden `<video>` element that decodes the packed stream.
pub fn create_video_element(config: &PlayerConfig) -> PlayerResult<HtmlVideoElement> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| PlayerError::host("no document"))?;
    let video = document
        .create_element("video")?
        .dyn_into::<HtmlVideoElement>()
        .map_err(|_| PlayerError::host("created element is not a video"))?;

    video.set_cross_origin(Some("anonymous"));
    video.set_autoplay(false);
    video.set_preload("auto");
    set_media_number(&video, "playbackRate", config.playback_rate)?;
    video.set_loop(config.loop_playback);
    video.set_muted(config.muted);
    video.set_attribute("playsinline", "")?;
    video.set_attribute("webkit-playsinline", "")?;
    video.set_attribute("x-webkit-airplay", "")?;
    video.style().set_property("display", "none")?;

    document
        .body()
        .ok_or_else(|| PlayerError::host("document has no body"))?
        .append_child(&video)?;
    Ok(video)
}

/// Assigns a numeric media property through `Reflect` so an exception from
/// the setter (non-finite or unsupported values) comes back as an error.
fn set_media_number(video: &HtmlVideoElement, property: &str, value: f64) -> PlayerResult<()> {
    Reflect::set(video, &JsValue::from_str(property), &JsValue::from_f64(value))?;
    Ok(())
}

/// One attached DOM listener. The closure outlives the detach so a listener
/// can tear the session down from inside its own invocation.
struct EventSubscription {
    event: &'static str,
    closure: Closure<dyn FnMut(Event)>,
    attached: bool,
}

/// `FrameSource` over an `HtmlVideoElement`.
pub struct VideoElementSource {
    video: HtmlVideoElement,
    subscriptions: Vec<EventSubscription>,
    released: bool,
}

impl VideoElementSource {
    pub fn new(video: HtmlVideoElement) -> Self {
        Self {
            video,
            subscriptions: Vec::new(),
            released: false,
        }
    }

    pub fn video(&self) -> &HtmlVideoElement {
        &self.video
    }

    /// Forwards the six media events to `handler`.
    pub fn subscribe(&mut self, handler: Rc<dyn Fn(SourceEvent)>) -> PlayerResult<()> {
        for event in SourceEvent::DOM_EVENTS.iter().copied() {
            let handler = handler.clone();
            let video = self.video.clone();
            let closure = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
                handler(translate_event(event, &video));
            });
            self.video
                .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
            self.subscriptions.push(EventSubscription {
                event,
                closure,
                attached: true,
            });
        }
        Ok(())
    }
}

fn translate_event(event: &str, video: &HtmlVideoElement) -> SourceEvent {
    match event {
        "loadedmetadata" => SourceEvent::MetadataLoaded,
        "canplaythrough" => SourceEvent::CanPlayThrough,
        "play" => SourceEvent::Play,
        "pause" => SourceEvent::Pause,
        "ended" => SourceEvent::Ended,
        _ => SourceEvent::Error(media_error_detail(video)),
    }
}

fn media_error_detail(video: &HtmlVideoElement) -> String {
    match video.error() {
        Some(error) if !error.message().is_empty() => {
            format!("code {}: {}", error.code(), error.message())
        }
        Some(error) => format!("code {}", error.code()),
        None => "unknown media error".to_string(),
    }
}

impl FrameSource for VideoElementSource {
    fn load(&mut self, uri: &str) -> PlayerResult<()> {
        self.video.set_src(uri);
        self.video.load();
        Ok(())
    }

    fn play(&mut self) -> PlayerResult<()> {
        let promise = self.video.play()?;
        // autoplay policies reject asynchronously; nothing to unwind here
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(err) = JsFuture::from(promise).await {
                debug!("video.play() rejected: {}", PlayerError::from(err));
            }
        });
        Ok(())
    }

    fn pause(&mut self) -> PlayerResult<()> {
        self.video.pause()?;
        Ok(())
    }

    fn set_current_time(&mut self, seconds: f64) -> PlayerResult<()> {
        set_media_number(&self.video, "currentTime", seconds)
    }

    fn set_playback_rate(&mut self, rate: f64) -> PlayerResult<()> {
        set_media_number(&self.video, "playbackRate", rate)
    }

    fn set_loop(&mut self, looping: bool) {
        self.video.set_loop(looping);
    }

    fn is_loop(&self) -> bool {
        self.video.loop_()
    }

    fn set_muted(&mut self, muted: bool) {
        self.video.set_muted(muted);
    }

    fn natural_size(&self) -> (u32, u32) {
        (self.video.video_width(), self.video.video_height())
    }

    fn unsubscribe(&mut self) -> PlayerResult<()> {
        let mut result = Ok(());
        for subscription in self.subscriptions.iter_mut().filter(|s| s.attached) {
            subscription.attached = false;
            if let Err(err) = self.video.remove_event_listener_with_callback(
                subscription.event,
                subscription.closure.as_ref().unchecked_ref(),
            ) {
                result = Err(PlayerError::from(err));
            }
        }
        result
    }

    fn release(&mut self) -> PlayerResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let paused = self.video.pause();
        self.video.set_src("");
        self.video.load();
        self.video.remove();
        paused.map_err(PlayerError::from)
    }
}
