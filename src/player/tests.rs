use std::{cell::RefCell, rc::Rc};

use crate::{
    config::{ConfigPatch, PlayerConfig},
    error::{PlayerError, PlayerResult},
    frame_pump::{tests::FakeScheduler, Primitive},
    geometry::{Orientation, PackingConvention, Side},
    rendering_gpu::{Backend, Compositor},
};

use super::{FrameSource, LifecycleState, PlayerEvent, Session, SourceEvent};

#[derive(Default)]
struct SourceLog {
    loads: Vec<String>,
    plays: u32,
    pauses: u32,
    current_time: f64,
    playback_rate: f64,
    looping: bool,
    muted: bool,
    unsubscribed: u32,
    released: u32,
}

#[derive(Clone, Default)]
struct FakeSource {
    log: Rc<RefCell<SourceLog>>,
    fail_load: bool,
}

impl FrameSource for FakeSource {
    fn load(&mut self, uri: &str) -> PlayerResult<()> {
        if self.fail_load {
            return Err(PlayerError::Source("unreachable".to_string()));
        }
        self.log.borrow_mut().loads.push(uri.to_string());
        Ok(())
    }

    fn play(&mut self) -> PlayerResult<()> {
        self.log.borrow_mut().plays += 1;
        Ok(())
    }

    fn pause(&mut self) -> PlayerResult<()> {
        self.log.borrow_mut().pauses += 1;
        Ok(())
    }

    fn set_current_time(&mut self, seconds: f64) -> PlayerResult<()> {
        self.log.borrow_mut().current_time = seconds;
        Ok(())
    }

    /// Rejects rates outside the range browsers accept.
    fn set_playback_rate(&mut self, rate: f64) -> PlayerResult<()> {
        if !(0.0625..=16.0).contains(&rate) {
            return Err(PlayerError::host("NotSupportedError: playbackRate out of range"));
        }
        self.log.borrow_mut().playback_rate = rate;
        Ok(())
    }

    fn set_loop(&mut self, looping: bool) {
        self.log.borrow_mut().looping = looping;
    }

    fn is_loop(&self) -> bool {
        self.log.borrow().looping
    }

    fn set_muted(&mut self, muted: bool) {
        self.log.borrow_mut().muted = muted;
    }

    fn natural_size(&self) -> (u32, u32) {
        (640, 720)
    }

    fn unsubscribe(&mut self) -> PlayerResult<()> {
        self.log.borrow_mut().unsubscribed += 1;
        Ok(())
    }

    fn release(&mut self) -> PlayerResult<()> {
        self.log.borrow_mut().released += 1;
        Ok(())
    }
}

#[derive(Default)]
struct CompositorLog {
    initialized: u32,
    composites: u32,
    clears: u32,
    teardowns: u32,
    packings: Vec<PackingConvention>,
}

#[derive(Clone, Default)]
struct FakeCompositor {
    log: Rc<RefCell<CompositorLog>>,
    fail_init: bool,
}

impl Compositor for FakeCompositor {
    fn backend(&self) -> Backend {
        Backend::Canvas2d
    }

    fn initialize(&mut self) -> PlayerResult<()> {
        if self.fail_init {
            return Err(PlayerError::strategy_init("shader did not compile"));
        }
        self.log.borrow_mut().initialized += 1;
        Ok(())
    }

    fn set_packing(&mut self, packing: PackingConvention) -> PlayerResult<()> {
        self.log.borrow_mut().packings.push(packing);
        Ok(())
    }

    fn composite_frame(&mut self) -> PlayerResult<()> {
        self.log.borrow_mut().composites += 1;
        Ok(())
    }

    fn clear(&mut self) {
        self.log.borrow_mut().clears += 1;
    }

    fn teardown(&mut self) -> PlayerResult<()> {
        self.log.borrow_mut().teardowns += 1;
        Ok(())
    }
}

type TestSession = Session<FakeSource, FakeCompositor, FakeScheduler>;

struct Harness {
    session: TestSession,
    source: FakeSource,
    compositor: FakeCompositor,
    scheduler: FakeScheduler,
}

impl Harness {
    fn new(config: PlayerConfig) -> Self {
        Self::with_parts(config, FakeSource::default(), FakeCompositor::default())
    }

    fn with_parts(config: PlayerConfig, source: FakeSource, compositor: FakeCompositor) -> Self {
        let scheduler = FakeScheduler::new(&[Primitive::AnimationFrame]);
        let session = Session::new(config, source.clone(), compositor.clone(), scheduler.clone());
        Self {
            session,
            source,
            compositor,
            scheduler,
        }
    }

    /// Initialized and ready to play.
    fn ready(config: PlayerConfig) -> Self {
        let mut harness = Self::new(config);
        harness.session.initialize();
        harness.session.handle_source_event(SourceEvent::CanPlayThrough);
        harness.session.drain_events();
        harness
    }

    /// Delivers the outstanding scheduler callback, if any.
    fn tick(&mut self) -> bool {
        if self.scheduler.fire() {
            self.session.on_tick();
            true
        } else {
            false
        }
    }

    fn composites(&self) -> u32 {
        self.compositor.log.borrow().composites
    }
}

#[test]
fn test_initialize_applies_settings_and_loads() {
    let mut config = PlayerConfig::new("movie.mp4");
    config.playback_rate = 1.5;
    config.loop_playback = true;
    let mut harness = Harness::new(config);

    harness.session.initialize();

    assert_eq!(harness.session.state(), LifecycleState::Loading);
    assert_eq!(harness.session.drain_events(), vec![PlayerEvent::InitSuccess]);
    let log = harness.source.log.borrow();
    assert_eq!(log.loads, vec!["movie.mp4".to_string()]);
    assert_eq!(log.playback_rate, 1.5);
    assert!(log.looping);
    assert!(log.muted);
    assert_eq!(harness.compositor.log.borrow().initialized, 1);
}

#[test]
fn test_init_failure_reports_and_releases() {
    let compositor = FakeCompositor {
        fail_init: true,
        ..Default::default()
    };
    let mut harness = Harness::with_parts(
        PlayerConfig::new("movie.mp4"),
        FakeSource::default(),
        compositor,
    );

    harness.session.initialize();

    assert_eq!(harness.session.state(), LifecycleState::Failed);
    match harness.session.drain_events().as_slice() {
        [PlayerEvent::InitError(detail)] => assert!(detail.contains("shader did not compile")),
        other => panic!("unexpected events: {:?}", other),
    }
    assert!(harness.source.log.borrow().loads.is_empty());
    assert_eq!(harness.source.log.borrow().released, 1);
    assert_eq!(harness.session.play(None), Err(PlayerError::Usage("play")));

    // nothing left to release, but the page still hears about it once
    harness.session.destroy();
    harness.session.destroy();
    assert_eq!(harness.session.drain_events(), vec![PlayerEvent::Destroy]);
    assert_eq!(harness.session.state(), LifecycleState::Destroyed);
    assert_eq!(harness.source.log.borrow().released, 1);
    assert_eq!(harness.compositor.log.borrow().teardowns, 1);
}

#[test]
fn test_source_load_failure_is_an_init_error() {
    let source = FakeSource {
        fail_load: true,
        ..Default::default()
    };
    let mut harness = Harness::with_parts(
        PlayerConfig::new("missing.mp4"),
        source,
        FakeCompositor::default(),
    );

    harness.session.initialize();

    assert_eq!(harness.session.state(), LifecycleState::Failed);
    assert!(matches!(
        harness.session.drain_events().as_slice(),
        [PlayerEvent::InitError(_)]
    ));
    assert_eq!(harness.compositor.log.borrow().teardowns, 1);
}

#[test]
fn test_operations_before_initialize_are_usage_errors() {
    let mut harness = Harness::new(PlayerConfig::new("movie.mp4"));

    assert_eq!(harness.session.play(None), Err(PlayerError::Usage("play")));
    assert_eq!(harness.session.pause(), Err(PlayerError::Usage("pause")));
    assert_eq!(
        harness.session.seek(3.0),
        Err(PlayerError::Usage("set_current_time"))
    );
    assert_eq!(
        harness.session.set_src("other.mp4"),
        Err(PlayerError::Usage("set_src"))
    );
    assert!(harness.source.log.borrow().loads.is_empty());
}

#[test]
fn test_metadata_records_natural_size() {
    let mut harness = Harness::new(PlayerConfig::new("movie.mp4"));
    harness.session.initialize();
    harness.session.drain_events();

    harness.session.handle_source_event(SourceEvent::MetadataLoaded);

    assert_eq!(harness.session.natural_size(), (640, 720));
    assert_eq!(harness.session.drain_events(), vec![PlayerEvent::Load]);
}

#[test]
fn test_first_ready_is_can_play_then_loop() {
    let mut config = PlayerConfig::new("movie.mp4");
    config.loop_playback = true;
    let mut harness = Harness::new(config);
    harness.session.initialize();
    harness.session.drain_events();

    harness.session.handle_source_event(SourceEvent::CanPlayThrough);
    assert_eq!(harness.session.state(), LifecycleState::Ready);
    assert_eq!(harness.session.drain_events(), vec![PlayerEvent::CanPlay]);

    harness.session.handle_source_event(SourceEvent::CanPlayThrough);
    harness.session.handle_source_event(SourceEvent::CanPlayThrough);
    assert_eq!(
        harness.session.drain_events(),
        vec![PlayerEvent::Loop, PlayerEvent::Loop]
    );
    assert_eq!(harness.session.ready_arrivals(), 3);
}

#[test]
fn test_repeat_ready_without_loop_is_silent() {
    let mut harness = Harness::ready(PlayerConfig::new("movie.mp4"));

    harness.session.handle_source_event(SourceEvent::CanPlayThrough);

    assert!(harness.session.drain_events().is_empty());
    assert_eq!(harness.session.ready_arrivals(), 2);
}

#[test]
fn test_auto_show_composites_on_ready() {
    let mut config = PlayerConfig::new("movie.mp4");
    config.auto_show = true;
    let harness = Harness::ready(config);
    assert_eq!(harness.composites(), 1);

    let harness = Harness::ready(PlayerConfig::new("movie.mp4"));
    assert_eq!(harness.composites(), 0);
}

#[test]
fn test_play_composites_on_every_tick() {
    let mut harness = Harness::ready(PlayerConfig::new("movie.mp4"));

    harness.session.play(None).unwrap();
    assert!(harness.session.is_playing());
    assert_eq!(harness.source.log.borrow().plays, 1);
    // one immediate composite, then one per refresh
    assert_eq!(harness.composites(), 1);
    for _ in 0..5 {
        assert!(harness.tick());
    }
    assert_eq!(harness.composites(), 6);
    assert!(harness.session.pump().is_scheduled());
}

#[test]
fn test_play_patch_caps_frame_rate() {
    let mut harness = Harness::ready(PlayerConfig::new("movie.mp4"));
    let patch = ConfigPatch {
        fps: Some(30),
        ..Default::default()
    };

    harness.session.play(Some(&patch)).unwrap();
    let before = harness.composites();
    for _ in 0..10 {
        assert!(harness.tick());
    }

    assert_eq!(harness.session.config().fps, 30);
    assert_eq!(harness.composites() - before, 5);
}

#[test]
fn test_play_patch_switches_packing_and_source() {
    let mut harness = Harness::ready(PlayerConfig::new("movie.mp4"));
    let patch = ConfigPatch {
        src: Some("other.mp4".to_string()),
        orientation: Some(Orientation::Portrait),
        side: Some(Side::Back),
        muted: Some(false),
        ..Default::default()
    };

    harness.session.play(Some(&patch)).unwrap();

    assert_eq!(
        harness.compositor.log.borrow().packings,
        vec![PackingConvention::new(Orientation::Portrait, Side::Back)]
    );
    let log = harness.source.log.borrow();
    assert_eq!(log.loads.last().map(String::as_str), Some("other.mp4"));
    assert!(!log.muted);
    assert_eq!(log.current_time, 0.0);
}

#[test]
fn test_pause_stops_ticks_and_play_resumes() {
    let mut harness = Harness::ready(PlayerConfig::new("movie.mp4"));
    harness.session.play(None).unwrap();
    harness.tick();

    harness.session.pause().unwrap();
    assert_eq!(harness.session.state(), LifecycleState::Paused);
    assert!(!harness.session.pump().is_scheduled());
    assert!(!harness.tick());
    let paused_at = harness.composites();

    harness.session.play(None).unwrap();
    assert!(harness.tick());
    assert_eq!(harness.composites(), paused_at + 2);
    assert_eq!(harness.compositor.log.borrow().initialized, 1);
}

#[test]
fn test_stale_tick_after_pause_does_not_composite() {
    let mut harness = Harness::ready(PlayerConfig::new("movie.mp4"));
    harness.session.play(None).unwrap();
    harness.session.pause().unwrap();
    let paused_at = harness.composites();

    // a callback that raced the cancel
    harness.session.on_tick();

    assert_eq!(harness.composites(), paused_at);
    assert!(!harness.session.pump().is_scheduled());
}

#[test]
fn test_ended_clears_and_rewinds() {
    let mut harness = Harness::ready(PlayerConfig::new("movie.mp4"));
    harness.session.play(None).unwrap();
    harness.source.log.borrow_mut().current_time = 12.0;

    harness.session.handle_source_event(SourceEvent::Ended);

    assert_eq!(harness.session.state(), LifecycleState::Ended);
    assert_eq!(harness.session.drain_events(), vec![PlayerEvent::Ended]);
    assert_eq!(harness.source.log.borrow().current_time, 0.0);
    assert_eq!(harness.compositor.log.borrow().clears, 1);
    assert!(!harness.session.pump().is_scheduled());

    // an ended session can be played again
    harness.session.play(None).unwrap();
    assert!(harness.session.is_playing());
}

#[test]
fn test_ended_with_auto_destroy() {
    let mut config = PlayerConfig::new("movie.mp4");
    config.auto_clear = false;
    config.auto_destroy = true;
    let mut harness = Harness::ready(config);
    harness.session.play(None).unwrap();

    harness.session.handle_source_event(SourceEvent::Ended);

    assert_eq!(
        harness.session.drain_events(),
        vec![PlayerEvent::Ended, PlayerEvent::Destroy]
    );
    assert_eq!(harness.session.state(), LifecycleState::Destroyed);
    assert_eq!(harness.compositor.log.borrow().clears, 0);
    assert_eq!(harness.compositor.log.borrow().teardowns, 1);
}

#[test]
fn test_source_error_destroys_session() {
    let mut harness = Harness::ready(PlayerConfig::new("movie.mp4"));
    harness.session.play(None).unwrap();

    harness
        .session
        .handle_source_event(SourceEvent::Error("decode failed".to_string()));

    match harness.session.drain_events().as_slice() {
        [PlayerEvent::Error(detail), PlayerEvent::Destroy] => {
            assert!(detail.contains("decode failed"))
        }
        other => panic!("unexpected events: {:?}", other),
    }
    assert!(harness.scheduler.log.borrow().outstanding.is_none());
    let composites = harness.composites();
    harness.session.on_tick();
    assert_eq!(harness.composites(), composites);
}

#[test]
fn test_destroy_twice_is_a_no_op() {
    let mut harness = Harness::ready(PlayerConfig::new("movie.mp4"));
    harness.session.play(None).unwrap();

    harness.session.destroy();
    harness.session.destroy();

    assert_eq!(harness.session.drain_events(), vec![PlayerEvent::Destroy]);
    assert_eq!(harness.compositor.log.borrow().teardowns, 1);
    let log = harness.source.log.borrow();
    assert_eq!(log.unsubscribed, 1);
    assert_eq!(log.released, 1);
    drop(log);

    assert!(!harness.session.is_playing());
    assert!(!harness.session.is_loop());
    assert_eq!(harness.session.play(None), Err(PlayerError::Usage("play")));
    assert_eq!(
        harness.session.set_loop(true),
        Err(PlayerError::Usage("set_loop"))
    );
}

#[test]
fn test_events_after_destroy_are_ignored() {
    let mut harness = Harness::ready(PlayerConfig::new("movie.mp4"));
    harness.session.destroy();
    harness.session.drain_events();

    harness.session.handle_source_event(SourceEvent::CanPlayThrough);
    harness.session.handle_source_event(SourceEvent::Ended);

    assert!(harness.session.drain_events().is_empty());
    assert_eq!(harness.session.state(), LifecycleState::Destroyed);
}

#[test]
fn test_set_src_keeps_state_and_rewinds() {
    let mut harness = Harness::ready(PlayerConfig::new("movie.mp4"));
    harness.session.play(None).unwrap();
    harness.source.log.borrow_mut().current_time = 4.0;

    harness.session.set_src("next.mp4").unwrap();

    assert!(harness.session.is_playing());
    assert_eq!(harness.session.config().src, "next.mp4");
    let log = harness.source.log.borrow();
    assert_eq!(log.loads.last().map(String::as_str), Some("next.mp4"));
    assert_eq!(log.current_time, 0.0);
}

#[test]
fn test_setters_forward_to_source() {
    let mut harness = Harness::ready(PlayerConfig::new("movie.mp4"));

    harness.session.set_muted(false).unwrap();
    harness.session.set_loop(true).unwrap();
    harness.session.set_playback_rate(2.0).unwrap();
    harness.session.seek(7.5).unwrap();

    assert!(harness.session.is_loop());
    assert!(harness.session.config().loop_playback);
    let log = harness.source.log.borrow();
    assert!(!log.muted);
    assert_eq!(log.playback_rate, 2.0);
    assert_eq!(log.current_time, 7.5);
    drop(log);

    harness.session.reset().unwrap();
    assert_eq!(harness.source.log.borrow().current_time, 0.0);
}

#[test]
fn test_non_finite_seek_is_rejected() {
    let mut harness = Harness::ready(PlayerConfig::new("movie.mp4"));
    harness.source.log.borrow_mut().current_time = 3.0;

    assert!(matches!(
        harness.session.seek(f64::NAN),
        Err(PlayerError::InvalidConfig(_))
    ));
    assert!(matches!(
        harness.session.seek(f64::INFINITY),
        Err(PlayerError::InvalidConfig(_))
    ));

    assert_eq!(harness.source.log.borrow().current_time, 3.0);
    assert_eq!(harness.session.state(), LifecycleState::Ready);
}

#[test]
fn test_non_finite_rate_is_rejected() {
    let mut harness = Harness::ready(PlayerConfig::new("movie.mp4"));

    assert!(matches!(
        harness.session.set_playback_rate(f64::NAN),
        Err(PlayerError::InvalidConfig(_))
    ));

    assert_eq!(harness.session.config().playback_rate, 1.0);
    assert_eq!(harness.source.log.borrow().playback_rate, 1.0);
}

#[test]
fn test_unsupported_rate_fails_and_session_can_still_be_destroyed() {
    let mut harness = Harness::ready(PlayerConfig::new("movie.mp4"));
    harness.session.play(None).unwrap();

    assert!(matches!(
        harness.session.set_playback_rate(100.0),
        Err(PlayerError::Host(_))
    ));
    assert_eq!(harness.session.config().playback_rate, 1.0);
    assert!(harness.session.is_playing());

    harness.session.destroy();
    assert_eq!(harness.session.drain_events(), vec![PlayerEvent::Destroy]);
    assert_eq!(harness.compositor.log.borrow().teardowns, 1);
}

#[test]
fn test_play_patch_with_non_finite_rate_is_rejected() {
    let mut harness = Harness::ready(PlayerConfig::new("movie.mp4"));
    let patch = ConfigPatch {
        playback_rate: Some(f64::NAN),
        fps: Some(30),
        ..Default::default()
    };

    assert!(matches!(
        harness.session.play(Some(&patch)),
        Err(PlayerError::InvalidConfig(_))
    ));
    assert!(!harness.session.is_playing());
    assert_eq!(harness.session.config().fps, 0);
    assert_eq!(harness.source.log.borrow().plays, 0);
}

#[test]
fn test_unsupported_initial_rate_is_an_init_error() {
    let mut config = PlayerConfig::new("movie.mp4");
    config.playback_rate = 100.0;
    let mut harness = Harness::new(config);

    harness.session.initialize();

    assert_eq!(harness.session.state(), LifecycleState::Failed);
    assert!(matches!(
        harness.session.drain_events().as_slice(),
        [PlayerEvent::InitError(_)]
    ));
    assert!(harness.source.log.borrow().loads.is_empty());
}
