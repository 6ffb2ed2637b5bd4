//! Scheduler scenarios driven by a manual clock and a recording renderer

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::thread;

    use approx::assert_relative_eq;

    use crate::core::config::{EngineConfig, WindowConfig};
    use crate::engine::{Engine, EngineError, EngineState};
    use crate::foundation::time::{Clock, ManualClock};
    use crate::input::InputSnapshot;
    use crate::render::{Renderer, RendererError};
    use crate::scene::{Component, ComponentContext, IdStrategy, ObjectId, SceneError};

    type Calls = Rc<RefCell<Vec<&'static str>>>;

    /// Renderer that records every call the engine makes
    struct MockRenderer {
        calls: Calls,
        open: bool,
        close_after_polls: Option<u32>,
        fail_clear_after: Option<u32>,
        polls: u32,
        title: String,
        size: (u32, u32),
        position: (i32, i32),
        vsync: bool,
        framerate_limit: Option<u32>,
        cursor_visible: bool,
        cursor_grabbed: bool,
    }

    impl MockRenderer {
        fn new(calls: &Calls) -> Self {
            Self {
                calls: Rc::clone(calls),
                open: false,
                close_after_polls: None,
                fail_clear_after: None,
                polls: 0,
                title: String::new(),
                size: (0, 0),
                position: (0, 0),
                vsync: false,
                framerate_limit: None,
                cursor_visible: true,
                cursor_grabbed: false,
            }
        }

        fn closing_after(mut self, polls: u32) -> Self {
            self.close_after_polls = Some(polls);
            self
        }

        fn losing_device_after(mut self, polls: u32) -> Self {
            self.fail_clear_after = Some(polls);
            self
        }
    }

    impl Renderer for MockRenderer {
        fn open(&mut self, config: &WindowConfig) -> Result<(), RendererError> {
            self.calls.borrow_mut().push("open");
            self.open = true;
            self.title = config.title.clone();
            self.size = (config.width, config.height);
            self.vsync = config.vsync;
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.open
        }

        fn poll_events(&mut self) -> InputSnapshot {
            self.calls.borrow_mut().push("poll");
            self.polls += 1;
            InputSnapshot {
                close_requested: self.close_after_polls.is_some_and(|limit| self.polls >= limit),
                ..InputSnapshot::default()
            }
        }

        fn clear(&mut self) -> Result<(), RendererError> {
            self.calls.borrow_mut().push("clear");
            if self.fail_clear_after.is_some_and(|limit| self.polls >= limit) {
                return Err(RendererError::Backend("device lost".to_string()));
            }
            Ok(())
        }

        fn present(&mut self) -> Result<(), RendererError> {
            self.calls.borrow_mut().push("present");
            Ok(())
        }

        fn close(&mut self) {
            self.calls.borrow_mut().push("close");
            self.open = false;
        }

        fn title(&self) -> String {
            self.title.clone()
        }

        fn set_title(&mut self, title: &str) {
            self.title = title.to_string();
        }

        fn size(&self) -> (u32, u32) {
            self.size
        }

        fn set_size(&mut self, width: u32, height: u32) {
            self.size = (width, height);
        }

        fn position(&self) -> (i32, i32) {
            self.position
        }

        fn set_position(&mut self, x: i32, y: i32) {
            self.position = (x, y);
        }

        fn vsync(&self) -> bool {
            self.vsync
        }

        fn set_vsync(&mut self, vsync: bool) {
            self.vsync = vsync;
        }

        fn framerate_limit(&self) -> Option<u32> {
            self.framerate_limit
        }

        fn set_framerate_limit(&mut self, limit: Option<u32>) {
            self.framerate_limit = limit;
        }

        fn is_cursor_visible(&self) -> bool {
            self.cursor_visible
        }

        fn set_cursor_visible(&mut self, visible: bool) {
            self.cursor_visible = visible;
        }

        fn is_cursor_grabbed(&self) -> bool {
            self.cursor_grabbed
        }

        fn set_cursor_grabbed(&mut self, grabbed: bool) {
            self.cursor_grabbed = grabbed;
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    /// Shared counters written by [`Tally`]
    #[derive(Default)]
    struct Counts {
        updates: Cell<u32>,
        fixed: Cell<u32>,
        update_time: Cell<f64>,
        destroyed: Cell<u32>,
    }

    #[derive(Clone)]
    struct Tally {
        counts: Rc<Counts>,
        stop_at_frame: Option<u64>,
    }

    impl Component for Tally {
        fn update(&mut self, ctx: &mut ComponentContext<'_>, dt: f64) {
            self.counts.updates.set(self.counts.updates.get() + 1);
            self.counts.update_time.set(self.counts.update_time.get() + dt);
            if self.stop_at_frame == Some(ctx.time().frame) {
                ctx.request_stop();
            }
        }

        fn fixed_update(&mut self, _ctx: &mut ComponentContext<'_>, _dt: f64) {
            self.counts.fixed.set(self.counts.fixed.get() + 1);
        }

        fn on_destroy(&mut self, _ctx: &mut ComponentContext<'_>) {
            self.counts.destroyed.set(self.counts.destroyed.get() + 1);
        }
    }

    #[derive(Clone)]
    struct Destroyer {
        target: ObjectId,
    }

    impl Component for Destroyer {
        fn update(&mut self, ctx: &mut ComponentContext<'_>, _dt: f64) {
            ctx.commands().destroy(self.target);
        }
    }

    fn headless_config() -> EngineConfig {
        EngineConfig::new()
            .with_headless(true)
            .with_id_strategy(IdStrategy::Sequential { start: 1 })
    }

    fn with_tally(engine: &mut Engine) -> Rc<Counts> {
        let counts = Rc::new(Counts::default());
        let scene = engine.scene_mut();
        let root = scene.spawn_root("tally").unwrap();
        scene
            .attach(root, "tally", Tally { counts: Rc::clone(&counts), stop_at_frame: None })
            .unwrap();
        counts
    }

    #[test]
    fn test_fixed_step_accumulator_carries_remainder() {
        let mut engine = Engine::new(headless_config().with_tick_rate(50)).unwrap();
        let counts = with_tally(&mut engine);
        engine.boot().unwrap();

        let steps: Vec<u32> = [0.0123, 0.0089, 0.031, 0.005]
            .iter()
            .map(|dt| engine.advance(*dt).unwrap().fixed_steps)
            .collect();

        assert_eq!(steps, vec![0, 1, 1, 0]);
        assert_eq!(counts.fixed.get(), 2);
        assert_eq!(counts.updates.get(), 4);
        assert_relative_eq!(engine.accumulator(), 0.0172, epsilon = 1e-9);
        assert_relative_eq!(engine.frame_time().alpha, 0.0172 / 0.02, epsilon = 1e-9);
        assert_eq!(engine.frame_time().fixed_tick, 2);
    }

    #[test]
    fn test_fixed_steps_do_not_depend_on_chunking() {
        let chunkings: [&[f64]; 3] = [&[0.0572], &[0.03, 0.0272], &[0.0052; 11]];

        for deltas in chunkings {
            let mut engine = Engine::new(headless_config().with_tick_rate(50)).unwrap();
            let counts = with_tally(&mut engine);
            engine.boot().unwrap();

            let steps: u32 = deltas.iter().map(|dt| engine.advance(*dt).unwrap().fixed_steps).sum();

            assert_eq!(steps, 2, "chunking {deltas:?}");
            assert_eq!(counts.fixed.get(), 2);
            assert_relative_eq!(engine.accumulator(), 0.0172, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_time_scale_is_linear() {
        for scale in [0.1, 1.0, 10.0, 100.0] {
            let mut engine = Engine::new(headless_config().with_time_scale(scale)).unwrap();
            let counts = with_tally(&mut engine);
            engine.boot().unwrap();

            for _ in 0..60 {
                engine.advance(1.0 / 60.0).unwrap();
            }

            let step = engine.fixed_step();
            let simulated = f64::from(counts.fixed.get()) * step + engine.accumulator();
            assert_relative_eq!(simulated, scale, max_relative = 1e-9);
            assert_relative_eq!(counts.update_time.get(), scale, max_relative = 1e-9);
            assert_relative_eq!(engine.frame_time().sim_time, scale, max_relative = 1e-9);
            assert_relative_eq!(engine.frame_time().real_time, 1.0, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_pause_discards_time_but_renders() {
        let calls = Calls::default();
        let mut engine = Engine::new(EngineConfig::new().with_tick_rate(50))
            .unwrap()
            .with_renderer(Box::new(MockRenderer::new(&calls)));
        let counts = with_tally(&mut engine);
        engine.boot().unwrap();

        engine.advance(0.03).unwrap();
        let accumulator = engine.accumulator();
        let sim_time = engine.frame_time().sim_time;
        engine.pause().unwrap();

        for _ in 0..3 {
            let report = engine.advance(0.2).unwrap();
            assert_eq!(report.scaled_dt, 0.0);
            assert_eq!(report.fixed_steps, 0);
            assert_eq!(report.state, EngineState::Paused);
        }
        assert_eq!(counts.updates.get(), 1);
        assert_eq!(counts.fixed.get(), 1);
        assert_relative_eq!(engine.accumulator(), accumulator);
        assert_relative_eq!(engine.frame_time().sim_time, sim_time);
        assert_eq!(calls.borrow().iter().filter(|call| **call == "present").count(), 4);

        engine.resume().unwrap();
        let report = engine.advance(0.02).unwrap();
        assert_eq!(report.fixed_steps, 1);
        assert_eq!(counts.updates.get(), 2);
    }

    #[test]
    fn test_renderer_call_order() {
        let calls = Calls::default();
        let window = WindowConfig::default().with_title("Snake").with_size(640, 480);
        let mut engine = Engine::new(EngineConfig::new().with_window(window))
            .unwrap()
            .with_renderer(Box::new(MockRenderer::new(&calls)));

        engine.boot().unwrap();
        engine.advance(0.016).unwrap();
        engine.stop().unwrap();

        assert_eq!(*calls.borrow(), vec!["open", "poll", "clear", "present", "close"]);
        let renderer = engine.renderer().unwrap().as_any().downcast_ref::<MockRenderer>().unwrap();
        assert_eq!(renderer.title(), "Snake");
        assert_eq!(renderer.size(), (640, 480));
    }

    #[test]
    fn test_window_properties_pass_through() {
        let calls = Calls::default();
        let mut engine = Engine::new(EngineConfig::new())
            .unwrap()
            .with_renderer(Box::new(MockRenderer::new(&calls)));

        let renderer = engine.renderer_mut().unwrap();
        renderer.set_position(20, 30);
        renderer.set_cursor_grabbed(true);
        renderer.set_framerate_limit(Some(144));

        let renderer = engine.renderer().unwrap();
        assert_eq!(renderer.position(), (20, 30));
        assert!(renderer.is_cursor_grabbed());
        assert_eq!(renderer.framerate_limit(), Some(144));
    }

    #[test]
    fn test_headless_never_touches_renderer() {
        let calls = Calls::default();
        let mut engine = Engine::new(headless_config())
            .unwrap()
            .with_renderer(Box::new(MockRenderer::new(&calls)));

        engine.boot().unwrap();
        for _ in 0..5 {
            engine.advance(0.016).unwrap();
        }
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_windowed_without_renderer_fails() {
        let mut engine = Engine::new(EngineConfig::new()).unwrap();
        assert!(matches!(engine.boot(), Err(EngineError::NoRenderer)));
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    #[test]
    fn test_window_close_stops_the_loop() {
        let calls = Calls::default();
        let clock = ManualClock::new();
        let mut engine = Engine::new(EngineConfig::new())
            .unwrap()
            .with_clock(clock.clone())
            .with_renderer(Box::new(MockRenderer::new(&calls).closing_after(3)));
        let counts = with_tally(&mut engine);

        engine.start().unwrap();

        assert_eq!(engine.state(), EngineState::Stopped);
        assert_eq!(counts.updates.get(), 2);
        assert_eq!(counts.destroyed.get(), 1);
        assert_eq!(engine.scene().object_count(), 0);
        assert_eq!(calls.borrow().last(), Some(&"close"));
    }

    #[test]
    fn test_renderer_failure_shuts_down() {
        let calls = Calls::default();
        let clock = ManualClock::new();
        let mut engine = Engine::new(EngineConfig::new())
            .unwrap()
            .with_clock(clock.clone())
            .with_renderer(Box::new(MockRenderer::new(&calls).losing_device_after(2)));
        let counts = with_tally(&mut engine);

        let err = engine.start().unwrap_err();

        assert!(matches!(err, EngineError::Renderer(RendererError::Backend(ref reason)) if reason == "device lost"));
        assert_eq!(engine.state(), EngineState::Stopped);
        assert_eq!(counts.updates.get(), 2);
        assert_eq!(counts.destroyed.get(), 1);
        assert_eq!(engine.scene().object_count(), 0);
        assert_eq!(calls.borrow().last(), Some(&"close"));
        assert!(!engine.renderer().unwrap().is_open());
    }

    #[test]
    fn test_renderer_failure_while_paused_shuts_down() {
        let calls = Calls::default();
        let mut engine = Engine::new(EngineConfig::new())
            .unwrap()
            .with_renderer(Box::new(MockRenderer::new(&calls).losing_device_after(2)));
        let counts = with_tally(&mut engine);
        engine.boot().unwrap();

        engine.advance(0.016).unwrap();
        engine.pause().unwrap();
        assert!(matches!(engine.advance(0.016), Err(EngineError::Renderer(_))));

        assert_eq!(engine.state(), EngineState::Stopped);
        assert_eq!(counts.destroyed.get(), 1);
        assert_eq!(calls.borrow().last(), Some(&"close"));
    }

    #[test]
    fn test_max_frames_bounds_the_loop() {
        let clock = ManualClock::new();
        let mut engine = Engine::new(headless_config().with_max_frames(10))
            .unwrap()
            .with_clock(clock.clone());
        let counts = with_tally(&mut engine);

        engine.start().unwrap();

        assert_eq!(engine.frame_time().frame, 10);
        assert_eq!(counts.updates.get(), 10);
        assert!(!engine.is_active());
    }

    #[test]
    fn test_frame_rate_cap_sleeps_on_the_clock() {
        let calls = Calls::default();
        let clock = ManualClock::new();
        let mut engine = Engine::new(EngineConfig::new().with_frame_rate_cap(50))
            .unwrap()
            .with_clock(clock.clone())
            .with_renderer(Box::new(MockRenderer::new(&calls)));
        engine.boot().unwrap();

        let first = engine.tick().unwrap();
        let second = engine.tick().unwrap();
        engine.tick().unwrap();

        assert_eq!(first.real_dt, 0.0);
        assert_relative_eq!(second.real_dt, 0.02, epsilon = 1e-12);
        assert_relative_eq!(clock.now(), 0.06, epsilon = 1e-12);
    }

    #[test]
    fn test_headless_fast_forward_lifts_the_cap() {
        let clock = ManualClock::new();
        let config = headless_config().with_frame_rate_cap(50).with_time_scale(10.0);
        let mut engine = Engine::new(config).unwrap().with_clock(clock.clone());
        engine.boot().unwrap();

        for _ in 0..5 {
            engine.tick().unwrap();
        }
        assert_eq!(clock.now(), 0.0);

        engine.set_time_scale(1.0).unwrap();
        engine.tick().unwrap();
        assert_relative_eq!(clock.now(), 0.02, epsilon = 1e-12);
    }

    #[test]
    fn test_fixed_step_cap_keeps_remaining_steps() {
        let config = headless_config()
            .with_tick_rate(4)
            .with_max_fixed_steps(2)
            .with_max_frame_delta(None);
        let mut engine = Engine::new(config).unwrap();
        engine.boot().unwrap();

        assert_eq!(engine.advance(1.0).unwrap().fixed_steps, 2);
        assert_relative_eq!(engine.accumulator(), 0.5);
        assert_eq!(engine.advance(0.0).unwrap().fixed_steps, 2);
        assert_relative_eq!(engine.accumulator(), 0.0);
    }

    #[test]
    fn test_max_frame_delta_clamps_spikes() {
        let mut engine = Engine::new(headless_config()).unwrap();
        engine.boot().unwrap();
        let report = engine.advance(5.0).unwrap();
        assert_relative_eq!(report.real_dt, 0.25);
        assert_relative_eq!(report.scaled_dt, 0.25);
    }

    #[test]
    fn test_time_scale_validation() {
        let mut engine = Engine::new(headless_config()).unwrap();
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(engine.set_time_scale(bad), Err(EngineError::InvalidTimeScale(_))));
        }
        assert_eq!(engine.time_scale(), 1.0);
        engine.set_time_scale(2.5).unwrap();
        assert_eq!(engine.time_scale(), 2.5);
    }

    #[test]
    fn test_headless_locked_after_first_start() {
        let mut engine = Engine::new(headless_config()).unwrap();
        engine.set_headless(false).unwrap();
        engine.set_headless(true).unwrap();
        engine.boot().unwrap();
        assert!(matches!(engine.set_headless(false), Err(EngineError::HeadlessLocked)));
        engine.stop().unwrap();
        assert!(matches!(engine.set_headless(false), Err(EngineError::HeadlessLocked)));
    }

    #[test]
    fn test_invalid_transitions() {
        let mut engine = Engine::new(headless_config()).unwrap();
        assert!(matches!(engine.pause(), Err(EngineError::InvalidTransition { state: EngineState::Stopped, .. })));
        assert!(engine.stop().is_err());
        assert!(engine.advance(0.1).is_err());

        engine.boot().unwrap();
        assert!(engine.boot().is_err());
        assert!(engine.resume().is_err());
        engine.pause().unwrap();
        assert!(engine.pause().is_err());
        engine.resume().unwrap();
        engine.stop().unwrap();
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    #[test]
    fn test_handle_commands_apply_at_frame_start() {
        let mut engine = Engine::new(headless_config()).unwrap();
        engine.boot().unwrap();
        let handle = engine.handle();

        thread::spawn(move || {
            handle.set_time_scale(3.0);
            handle.set_time_scale(-1.0);
            handle.pause();
        })
        .join()
        .unwrap();

        let report = engine.advance(0.1).unwrap();
        assert_eq!(report.state, EngineState::Paused);
        assert_eq!(engine.time_scale(), 3.0);

        engine.handle().stop();
        let report = engine.advance(0.1).unwrap();
        assert_eq!(report.state, EngineState::Stopped);
    }

    #[test]
    fn test_component_can_request_stop() {
        let mut engine = Engine::new(headless_config()).unwrap();
        let counts = Rc::new(Counts::default());
        let root = engine.scene_mut().spawn_root("quitter").unwrap();
        engine
            .scene_mut()
            .attach(root, "tally", Tally { counts: Rc::clone(&counts), stop_at_frame: Some(3) })
            .unwrap();

        engine.boot().unwrap();
        let mut frames = 0;
        while engine.is_active() {
            engine.advance(0.016).unwrap();
            frames += 1;
        }

        assert_eq!(frames, 3);
        assert_eq!(counts.destroyed.get(), 1);
    }

    #[test]
    fn test_double_destroy_stops_the_engine() {
        let mut engine = Engine::new(headless_config()).unwrap();
        let scene = engine.scene_mut();
        let victim = scene.spawn_root("victim").unwrap();
        let killer = scene.spawn_root("killer").unwrap();
        scene.attach(killer, "destroyer", Destroyer { target: victim }).unwrap();

        engine.boot().unwrap();
        engine.advance(0.016).unwrap();
        let err = engine.advance(0.016).unwrap_err();

        assert!(matches!(err, EngineError::Scene(SceneError::DoubleDestroy(id)) if id == victim.0));
        assert_eq!(engine.state(), EngineState::Stopped);
        assert_eq!(engine.scene().object_count(), 0);
    }

    #[test]
    fn test_stop_destroys_every_object() {
        let mut engine = Engine::new(headless_config()).unwrap();
        let counts = with_tally(&mut engine);
        let loose = engine.scene_mut().spawn("loose").unwrap();
        engine
            .scene_mut()
            .attach(loose, "tally", Tally { counts: Rc::clone(&counts), stop_at_frame: None })
            .unwrap();

        engine.boot().unwrap();
        engine.advance(0.016).unwrap();
        engine.stop().unwrap();

        assert_eq!(counts.destroyed.get(), 2);
        assert_eq!(engine.scene().object_count(), 0);
        assert_eq!(engine.scene().component_count(), 0);
    }
}
