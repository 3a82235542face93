use std::{cell::RefCell, collections::HashMap, rc::Rc};

use js_sys::{Function, Object, Reflect};
use log::debug;
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::HtmlElement;

use crate::{
    config::{ConfigPatch, PlayerConfig},
    console_warn,
    error::{PlayerError, PlayerResult},
    geometry::{Orientation, Side},
    host::{create_surface, create_video_element, VideoElementSource, WebScheduler},
    player::{PlayerEvent, Session, SourceEvent},
    rendering::{Canvas2dTarget, PixelBufferCompositor},
    rendering_gpu::{select_backend, Backend, BrowserProbe, DynamicCompositor, GpuCompositor},
    utils::init_logging,
};

type WebSession = Session<VideoElementSource, DynamicCompositor, WebScheduler>;

const CALLBACK_NAMES: [&str; 10] = [
    "onInitSuccess",
    "onInitError",
    "onLoad",
    "onCanPlay",
    "onPlay",
    "onLoop",
    "onPause",
    "onEnded",
    "onError",
    "onDestroy",
];

fn get_prop(obj: &Object, key: &str) -> Option<JsValue> {
    Reflect::get(obj, &JsValue::from_str(key))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

fn get_bool(obj: &Object, key: &str) -> Option<bool> {
    get_prop(obj, key).and_then(|v| v.as_bool())
}

fn get_f64(obj: &Object, key: &str) -> Option<f64> {
    get_prop(obj, key).and_then(|v| v.as_f64())
}

fn get_string(obj: &Object, key: &str) -> Option<String> {
    get_prop(obj, key).and_then(|v| v.as_string())
}

/// Reads the camelCase option keys the page passes in.
pub fn parse_config_patch(obj: &Object) -> PlayerResult<ConfigPatch> {
    let patch = ConfigPatch {
        src: get_string(obj, "src"),
        width: get_f64(obj, "width"),
        height: get_f64(obj, "height"),
        playback_rate: get_f64(obj, "playbackRate"),
        muted: get_bool(obj, "muted"),
        loop_playback: get_bool(obj, "loop"),
        fps: get_f64(obj, "fps").map(|fps| fps.max(0.0).round() as u32),
        orientation: get_string(obj, "orientation").map(|o| Orientation::from_name(&o)),
        side: get_string(obj, "side").map(|s| Side::from_name(&s)),
        video_frame: get_bool(obj, "videoFrame"),
        debug: get_bool(obj, "debug"),
        auto_show: get_bool(obj, "autoShow"),
        auto_clear: get_bool(obj, "autoClear"),
        auto_destroy: get_bool(obj, "autoDestroy"),
    };
    patch.validate()?;
    Ok(patch)
}

/// Page callbacks keyed by option name.
#[derive(Default)]
pub struct PlayerCallbacks {
    callbacks: HashMap<&'static str, Function>,
}

impl PlayerCallbacks {
    pub fn merge_from(&mut self, obj: &Object) {
        for name in CALLBACK_NAMES.iter().copied() {
            let callback = get_prop(obj, name).and_then(|v| v.dyn_into::<Function>().ok());
            if let Some(callback) = callback {
                self.callbacks.insert(name, callback);
            }
        }
    }

    fn get(&self, name: &str) -> Option<Function> {
        self.callbacks.get(name).cloned()
    }
}

/// Calls page callbacks. No borrow of the callbacks is held while page code
/// runs, so callbacks may call back into the player.
fn dispatch(callbacks: &RefCell<PlayerCallbacks>, events: Vec<PlayerEvent>) {
    for event in events {
        let name = event.callback_name();
        let callback = match callbacks.borrow().get(name) {
            Some(callback) => callback,
            None => continue,
        };
        let result = match event.error_detail() {
            Some(detail) => callback.call1(&JsValue::NULL, &js_sys::Error::new(detail)),
            None => callback.call0(&JsValue::NULL),
        };
        if let Err(err) = result {
            console_warn!("[alpha-video-player]: {} callback threw: {:?}", name, err);
        }
    }
}

/// Runs `f` on the session, then delivers whatever it queued.
fn with_session<R>(
    session: &RefCell<WebSession>,
    callbacks: &RefCell<PlayerCallbacks>,
    f: impl FnOnce(&mut WebSession) -> R,
) -> PlayerResult<R> {
    let (result, events) = {
        let mut session = session
            .try_borrow_mut()
            .map_err(|_| PlayerError::host("player is already handling a call"))?;
        let result = f(&mut session);
        (result, session.drain_events())
    };
    dispatch(callbacks, events);
    Ok(result)
}

/// A packed alpha video rendered into a canvas inside `container`.
#[wasm_bindgen]
pub struct AlphaVideoPlayer {
    session: Rc<RefCell<WebSession>>,
    callbacks: Rc<RefCell<PlayerCallbacks>>,
    backend: Backend,
}

#[wasm_bindgen]
impl AlphaVideoPlayer {
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<AlphaVideoPlayer, JsValue> {
        let options = options
            .dyn_into::<Object>()
            .map_err(|_| PlayerError::invalid_config("options must be an object"))?;

        let mut config = PlayerConfig::default();
        config.merge(&parse_config_patch(&options)?);
        let container = get_prop(&options, "container")
            .and_then(|c| c.dyn_into::<HtmlElement>().ok())
            .filter(|_| !config.src.is_empty())
            .ok_or_else(|| PlayerError::invalid_config("container or src can not be empty"))?;

        init_logging(config.debug);
        let backend = select_backend(&BrowserProbe)?;
        let window = web_sys::window().ok_or_else(|| PlayerError::host("no window"))?;

        let canvas = create_surface(&container, config.width, config.height)?;
        let video = match create_video_element(&config) {
            Ok(video) => video,
            Err(err) => {
                canvas.remove();
                return Err(err.into());
            }
        };

        let compositor = match backend {
            Backend::WebGl => DynamicCompositor::WebGl(GpuCompositor::new(
                canvas,
                video.clone(),
                config.packing(),
                config.debug,
            )),
            Backend::Canvas2d => DynamicCompositor::Canvas2d(PixelBufferCompositor::new(
                Canvas2dTarget::new(canvas, video.clone()),
                config.packing(),
            )),
        };
        let scheduler = WebScheduler::new(window, video.clone());
        let source = VideoElementSource::new(video);

        let mut callbacks = PlayerCallbacks::default();
        callbacks.merge_from(&options);

        let player = AlphaVideoPlayer {
            session: Rc::new(RefCell::new(Session::new(config, source, compositor, scheduler))),
            callbacks: Rc::new(RefCell::new(callbacks)),
            backend,
        };
        if let Err(err) = player.wire() {
            let mut session = player.session.borrow_mut();
            session.destroy();
            session.drain_events();
            return Err(err.into());
        }
        player.run(|session| session.initialize())?;
        Ok(player)
    }

    /// Routes frame-pump wake-ups and media events into the session.
    fn wire(&self) -> PlayerResult<()> {
        let weak = Rc::downgrade(&self.session);
        let callbacks = self.callbacks.clone();
        let tick = Closure::<dyn FnMut()>::new(move || {
            if let Some(session) = weak.upgrade() {
                if let Err(err) = with_session(&session, &callbacks, |s| s.on_tick()) {
                    debug!("Skipped tick: {}", err);
                }
            }
        });

        let weak = Rc::downgrade(&self.session);
        let callbacks = self.callbacks.clone();
        let handler: Rc<dyn Fn(SourceEvent)> = Rc::new(move |event| {
            if let Some(session) = weak.upgrade() {
                if let Err(err) =
                    with_session(&session, &callbacks, |s| s.handle_source_event(event))
                {
                    debug!("Dropped media event: {}", err);
                }
            }
        });

        let mut session = self.session.borrow_mut();
        session.scheduler_mut().install_tick(tick);
        session.source_mut().subscribe(handler)
    }

    fn run<R>(&self, f: impl FnOnce(&mut WebSession) -> R) -> Result<R, JsValue> {
        with_session(&self.session, &self.callbacks, f).map_err(JsValue::from)
    }

    #[wasm_bindgen(getter)]
    pub fn playing(&self) -> bool {
        self.session.try_borrow().map_or(false, |s| s.is_playing())
    }

    #[wasm_bindgen(getter, js_name = "loop")]
    pub fn is_loop(&self) -> bool {
        self.session.try_borrow().map_or(false, |s| s.is_loop())
    }

    #[wasm_bindgen(getter)]
    pub fn backend(&self) -> String {
        self.backend.name().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        self.session
            .try_borrow()
            .map_or_else(|_| "busy".to_string(), |s| format!("{:?}", s.state()).to_lowercase())
    }

    /// Starts or resumes playback, merging `options` into the configuration.
    pub fn play(&self, options: Option<Object>) -> Result<(), JsValue> {
        let patch = match options.as_ref() {
            Some(options) => {
                self.callbacks.borrow_mut().merge_from(options);
                Some(parse_config_patch(options)?)
            }
            None => None,
        };
        if let Some(true) = patch.as_ref().and_then(|p| p.debug) {
            init_logging(true);
        }
        self.run(|s| s.play(patch.as_ref()))??;
        Ok(())
    }

    pub fn pause(&self) -> Result<(), JsValue> {
        self.run(|s| s.pause())??;
        Ok(())
    }

    pub fn reset(&self) -> Result<(), JsValue> {
        self.run(|s| s.reset())??;
        Ok(())
    }

    #[wasm_bindgen(js_name = setSrc)]
    pub fn set_src(&self, src: String) -> Result<(), JsValue> {
        self.run(|s| s.set_src(&src))??;
        Ok(())
    }

    #[wasm_bindgen(js_name = setCurrentTime)]
    pub fn set_current_time(&self, time: f64) -> Result<(), JsValue> {
        self.run(|s| s.seek(time))??;
        Ok(())
    }

    #[wasm_bindgen(js_name = setMute)]
    pub fn set_mute(&self, muted: bool) -> Result<(), JsValue> {
        self.run(|s| s.set_muted(muted))??;
        Ok(())
    }

    #[wasm_bindgen(js_name = setLoop)]
    pub fn set_loop(&self, looping: bool) -> Result<(), JsValue> {
        self.run(|s| s.set_loop(looping))??;
        Ok(())
    }

    #[wasm_bindgen(js_name = setPlaybackRate)]
    pub fn set_playback_rate(&self, rate: f64) -> Result<(), JsValue> {
        self.run(|s| s.set_playback_rate(rate))??;
        Ok(())
    }

    /// Never throws; repeated calls do nothing.
    pub fn destroy(&self) {
        if let Err(err) = self.run(|s| s.destroy()) {
            debug!("destroy deferred: {:?}", err);
        }
    }
}

/// A page that frees the player without destroying it still gets its
/// listeners detached and the `<video>` removed.
impl Drop for AlphaVideoPlayer {
    fn drop(&mut self) {
        match self.session.try_borrow_mut() {
            Ok(mut session) => {
                session.destroy();
                session.drain_events();
            }
            Err(_) => debug!("Player dropped while handling a call"),
        }
    }
}
