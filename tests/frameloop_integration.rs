//! Frame loop integration tests: hook order, deferred registry changes, paint
//! gating, input edges and failure handling, all on headless devices.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::anyhow;

use spork::components::entity::{Context, Entity, EntityId, HookResult};
use spork::components::geometry::{Color, Rect, Vec2};
use spork::error::{EngineError, Result};
use spork::events::input::{KeyCode, MouseButton, RawInputEvent};
use spork::resources::engineconfig::EngineConfig;
use spork::resources::input::InputSender;
use spork::resources::mixer::{FinishedPolicy, Mixer};
use spork::systems::frameloop::{AudioOutput, Devices, FrameLoop, LoopState, Platform};
use spork::systems::input::EventSource;
use spork::systems::render::{BitmapId, Painter, Primitive, Renderer, Style};

type Log = Rc<RefCell<Vec<String>>>;

fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

// =============================================================================
// Headless devices
// =============================================================================

struct RecordingRenderer {
    log: Log,
    in_frame: bool,
    bitmaps: u32,
}

impl Renderer for RecordingRenderer {
    fn begin_frame(&mut self) {
        self.in_frame = true;
        self.log.borrow_mut().push("begin_frame".into());
    }

    fn clear(&mut self, color: Color) {
        self.log.borrow_mut().push(format!("clear {color}"));
    }

    fn draw(&mut self, primitive: &Primitive<'_>, style: &Style) {
        let kind = match primitive {
            Primitive::Line { .. } => "line",
            Primitive::Rect { .. } => "rect",
            Primitive::RoundedRect { .. } => "rounded_rect",
            Primitive::Ellipse { .. } => "ellipse",
            Primitive::Bitmap { .. } => "bitmap",
            Primitive::Text { .. } => "text",
        };
        assert!(self.in_frame, "draw outside begin/end");
        self.log
            .borrow_mut()
            .push(format!("draw {kind} {}", style.color));
    }

    fn end_frame(&mut self) {
        self.in_frame = false;
        self.log.borrow_mut().push("end_frame".into());
    }

    fn present(&mut self, vsync_interval: u32) {
        self.log.borrow_mut().push(format!("present {vsync_interval}"));
    }

    fn load_bitmap(&mut self, path: &str) -> Result<BitmapId> {
        self.log.borrow_mut().push(format!("load {path}"));
        self.bitmaps += 1;
        Ok(BitmapId(self.bitmaps - 1))
    }
}

/// Replays one batch of raw events per poll and requests close after `frames`.
struct ScriptedEvents {
    sink: Option<InputSender>,
    script: VecDeque<Vec<RawInputEvent>>,
    polls: usize,
    frames: usize,
}

impl EventSource for ScriptedEvents {
    fn attach(&mut self, sink: InputSender) {
        self.sink = Some(sink);
    }

    fn poll(&mut self) {
        self.polls += 1;
        let batch = self.script.pop_front().unwrap_or_default();
        if let Some(sink) = &self.sink {
            for event in batch {
                sink.send(event);
            }
        }
    }

    fn close_requested(&self) -> bool {
        self.polls >= self.frames
    }
}

struct RecordingAudio {
    log: Log,
}

impl AudioOutput for RecordingAudio {
    fn shutdown(&mut self) {
        self.log.borrow_mut().push("audio shutdown".into());
    }
}

struct HeadlessPlatform {
    log: Log,
    script: Vec<Vec<RawInputEvent>>,
    frames: usize,
    opened_with: Option<EngineConfig>,
}

impl HeadlessPlatform {
    fn new(log: &Log, frames: usize) -> Self {
        Self {
            log: log.clone(),
            script: Vec::new(),
            frames,
            opened_with: None,
        }
    }

    fn with_script(mut self, script: Vec<Vec<RawInputEvent>>) -> Self {
        self.script = script;
        self
    }
}

impl Platform for HeadlessPlatform {
    fn open(&mut self, config: &EngineConfig, _mixer: &Mixer) -> Result<Devices> {
        self.log.borrow_mut().push("open".into());
        self.opened_with = Some(config.clone());
        Ok(Devices {
            renderer: Box::new(RecordingRenderer {
                log: self.log.clone(),
                in_frame: false,
                bitmaps: 0,
            }),
            events: Box::new(ScriptedEvents {
                sink: None,
                script: self.script.drain(..).collect(),
                polls: 0,
                frames: self.frames,
            }),
            audio: Some(Box::new(RecordingAudio {
                log: self.log.clone(),
            })),
        })
    }
}

fn headless_config() -> EngineConfig {
    let mut config = EngineConfig::new();
    config.title = "headless".into();
    config
}

// =============================================================================
// Test entities
// =============================================================================

/// Logs every hook under its name and paints one rect per frame.
struct Recorder {
    name: &'static str,
    log: Log,
}

impl Recorder {
    fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: log.clone(),
        }
    }

    fn push(&self, hook: &str) {
        self.log.borrow_mut().push(format!("{} {hook}", self.name));
    }
}

impl Entity for Recorder {
    fn init(&mut self, _ctx: &mut Context<'_>) -> HookResult {
        self.push("init");
        Ok(())
    }

    fn start(&mut self, _ctx: &mut Context<'_>) -> HookResult {
        self.push("start");
        Ok(())
    }

    fn update(&mut self, _ctx: &mut Context<'_>) -> HookResult {
        self.push("update");
        Ok(())
    }

    fn paint(&mut self, _ctx: &mut Context<'_>, painter: &mut Painter<'_>) -> HookResult {
        self.push("paint");
        painter.set_color(Color::rgb(0, 255, 0));
        painter.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0));
        Ok(())
    }

    fn end(&mut self, _ctx: &mut Context<'_>) -> HookResult {
        self.push("end");
        Ok(())
    }
}

/// On its first update, destroys `victim` and spawns a new recorder.
struct Replacer {
    victim: EntityId,
    spawned: Rc<RefCell<Option<EntityId>>>,
    log: Log,
}

impl Entity for Replacer {
    fn update(&mut self, ctx: &mut Context<'_>) -> HookResult {
        if self.spawned.borrow().is_none() {
            ctx.destroy(self.victim);
            let id = ctx.spawn(Recorder::new("C", &self.log));
            *self.spawned.borrow_mut() = Some(id);
            // Nothing changes until the end of the frame.
            assert!(ctx.is_live(self.victim));
            assert!(!ctx.is_live(id));
        }
        Ok(())
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn hooks_and_device_calls_run_in_frame_order() {
    let log = new_log();
    let mut frame_loop = FrameLoop::new(headless_config());
    frame_loop.spawn(Recorder::new("A", &log));

    let mut platform = HeadlessPlatform::new(&log, 2);
    frame_loop.run(&mut platform).unwrap();

    let frame = [
        "begin_frame",
        "clear 0,0,0",
        "A update",
        "A paint",
        "draw rect 0,255,0",
        "end_frame",
        "present 1",
    ];
    let mut expected: Vec<&str> = vec!["A init", "open", "A start"];
    expected.extend(frame);
    expected.extend(frame);
    expected.extend(["A end", "audio shutdown"]);

    assert_eq!(entries(&log), expected);
    assert_eq!(frame_loop.state(), LoopState::Stopped);
    assert_eq!(frame_loop.time().frame_count, 2);
}

#[test]
fn destroy_and_spawn_take_effect_next_frame() {
    let log = new_log();
    let mut frame_loop = FrameLoop::new(headless_config());
    let spawned = Rc::new(RefCell::new(None));

    // Store B first so A can name it, but activate A first so A updates before B.
    let b = frame_loop
        .registry_mut()
        .insert(Box::new(Recorder::new("B", &log)));
    let a = frame_loop.spawn(Replacer {
        victim: b,
        spawned: spawned.clone(),
        log: log.clone(),
    });
    frame_loop.registry_mut().register(b);

    let mut platform = HeadlessPlatform::new(&log, 2);
    frame_loop.run(&mut platform).unwrap();

    let c = spawned.borrow().expect("C spawned");
    let updates: Vec<String> = entries(&log)
        .into_iter()
        .filter(|e| e.ends_with("update"))
        .collect();
    // Frame 1: B still runs after being marked for destruction. Frame 2: only C.
    assert_eq!(updates, vec!["B update", "C update"]);

    let registry = frame_loop.registry();
    assert!(registry.is_live(a));
    assert!(!registry.is_live(b));
    assert!(!registry.contains(b));
    assert!(registry.is_live(c));
    // End hooks ran for the final live set only.
    let ends: Vec<String> = entries(&log)
        .into_iter()
        .filter(|e| e.ends_with("end"))
        .collect();
    assert_eq!(ends, vec!["C end"]);
}

#[test]
fn entities_spawned_before_run_get_init_and_start() {
    let log = new_log();
    let mut frame_loop = FrameLoop::new(headless_config());
    frame_loop.spawn(Recorder::new("A", &log));
    frame_loop.spawn(Recorder::new("B", &log));

    let mut platform = HeadlessPlatform::new(&log, 1);
    frame_loop.run(&mut platform).unwrap();

    let log = entries(&log);
    let pos = |needle: &str| log.iter().position(|e| e == needle).unwrap();
    assert!(pos("A init") < pos("B init"));
    assert!(pos("B init") < pos("open"));
    assert!(pos("open") < pos("A start"));
    assert!(pos("B start") < pos("begin_frame"));
}

// =============================================================================
// Context access
// =============================================================================

struct ConfigEditor;

impl Entity for ConfigEditor {
    fn init(&mut self, ctx: &mut Context<'_>) -> HookResult {
        ctx.config_mut().title = "edited".into();
        ctx.config_mut().clear_color = Color::rgb(0, 0, 255);
        ctx.config_mut().auto_stop_finished = true;
        assert!(matches!(ctx.load_bitmap("early.png"), Err(EngineError::NotReady(_))));
        Ok(())
    }

    fn start(&mut self, ctx: &mut Context<'_>) -> HookResult {
        let id = ctx.load_bitmap("sprite.png")?;
        assert_eq!(id, BitmapId(0));
        assert_eq!(ctx.mixer().policy(), FinishedPolicy::AutoStop);
        Ok(())
    }
}

#[test]
fn init_edits_config_before_devices_open() {
    let log = new_log();
    let mut frame_loop = FrameLoop::new(headless_config());
    frame_loop.spawn(ConfigEditor);

    let mut platform = HeadlessPlatform::new(&log, 1);
    frame_loop.run(&mut platform).unwrap();

    let opened = platform.opened_with.expect("platform opened");
    assert_eq!(opened.title, "edited");
    let log = entries(&log);
    assert!(log.contains(&"load sprite.png".to_string()));
    assert!(!log.contains(&"load early.png".to_string()));
    assert!(log.contains(&"clear 0,0,255".to_string()));
}

/// Records the input edges it sees each frame.
struct InputProbe {
    seen: Rc<RefCell<Vec<(bool, bool, bool, Vec2)>>>,
    mouse: Rc<RefCell<Vec<bool>>>,
}

impl Entity for InputProbe {
    fn update(&mut self, ctx: &mut Context<'_>) -> HookResult {
        let input = ctx.input();
        self.seen.borrow_mut().push((
            input.is_down(KeyCode::SPACE),
            input.is_held(KeyCode::SPACE),
            input.is_up(KeyCode::SPACE),
            ctx.cursor(),
        ));
        self.mouse
            .borrow_mut()
            .push(ctx.input().is_mouse_down(MouseButton::Left));
        Ok(())
    }
}

#[test]
fn input_edges_follow_the_event_script() {
    let log = new_log();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mouse = Rc::new(RefCell::new(Vec::new()));
    let mut frame_loop = FrameLoop::new(headless_config());
    frame_loop.spawn(InputProbe {
        seen: seen.clone(),
        mouse: mouse.clone(),
    });

    let script = vec![
        vec![
            RawInputEvent::KeyDown(KeyCode::SPACE),
            RawInputEvent::MouseMove(Vec2::new(10.0, 20.0)),
            RawInputEvent::MouseDown(MouseButton::Left),
        ],
        vec![RawInputEvent::MouseUp(MouseButton::Left)],
        vec![RawInputEvent::KeyUp(KeyCode::SPACE)],
        vec![],
    ];
    let mut platform = HeadlessPlatform::new(&log, 4).with_script(script);
    frame_loop.run(&mut platform).unwrap();

    let p = Vec2::new(10.0, 20.0);
    assert_eq!(
        *seen.borrow(),
        vec![
            (true, true, false, p),
            (false, true, false, p),
            (false, false, true, p),
            (false, false, false, p),
        ]
    );
    assert_eq!(*mouse.borrow(), vec![true, false, false, false]);
}

// =============================================================================
// Stopping
// =============================================================================

struct QuitAfter {
    frames: u32,
    seen: u32,
}

impl Entity for QuitAfter {
    fn update(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.seen += 1;
        if self.seen == self.frames {
            ctx.quit();
        }
        Ok(())
    }
}

#[test]
fn quit_from_a_hook_stops_after_the_frame() {
    let log = new_log();
    let mut frame_loop = FrameLoop::new(headless_config());
    frame_loop.spawn(QuitAfter { frames: 3, seen: 0 });
    frame_loop.spawn(Recorder::new("A", &log));

    let mut platform = HeadlessPlatform::new(&log, 100);
    frame_loop.run(&mut platform).unwrap();

    assert_eq!(frame_loop.time().frame_count, 3);
    let log = entries(&log);
    assert_eq!(log.iter().filter(|e| *e == "A paint").count(), 3);
    assert_eq!(log.last().map(String::as_str), Some("audio shutdown"));
    assert!(log.contains(&"A end".to_string()));
}

struct FailOnFrame {
    frame: u32,
    seen: u32,
}

impl Entity for FailOnFrame {
    fn update(&mut self, _ctx: &mut Context<'_>) -> HookResult {
        self.seen += 1;
        if self.seen == self.frame {
            return Err(anyhow!("boom on frame {}", self.seen));
        }
        Ok(())
    }
}

#[test]
fn hook_error_stops_the_loop_and_releases_devices() {
    let log = new_log();
    let mut frame_loop = FrameLoop::new(headless_config());
    frame_loop.spawn(FailOnFrame { frame: 2, seen: 0 });
    frame_loop.spawn(Recorder::new("A", &log));

    let mut platform = HeadlessPlatform::new(&log, 10);
    let err = frame_loop.run(&mut platform).unwrap_err();

    match err {
        EngineError::Hook { hook, source } => {
            assert_eq!(hook, "update");
            assert!(source.to_string().contains("frame 2"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(frame_loop.state(), LoopState::Stopped);

    let log = entries(&log);
    // The failing entity runs first, so A never updates on frame 2.
    assert_eq!(log.iter().filter(|e| *e == "A update").count(), 1);
    assert!(!log.contains(&"A end".to_string()));
    assert_eq!(log.last().map(String::as_str), Some("audio shutdown"));
}

#[test]
fn step_error_closes_the_frame_and_stops() {
    let log = new_log();
    let mut frame_loop = FrameLoop::new(headless_config());
    frame_loop.spawn(FailOnFrame { frame: 1, seen: 0 });

    let mut platform = HeadlessPlatform::new(&log, 10);
    frame_loop.start(&mut platform).unwrap();
    assert_eq!(frame_loop.state(), LoopState::Running);

    let err = frame_loop.step().unwrap_err();
    assert!(matches!(err, EngineError::Hook { hook: "update", .. }));
    assert_eq!(frame_loop.state(), LoopState::Stopped);
    assert_eq!(
        entries(&log),
        vec!["open", "begin_frame", "clear 0,0,0", "end_frame", "audio shutdown"]
    );

    // Nothing runs after the failure, including end hooks.
    frame_loop.step().unwrap();
    frame_loop.stop().unwrap();
    assert_eq!(entries(&log).len(), 5);
    assert_eq!(frame_loop.time().frame_count, 0);
}

struct FailingPaint;

impl Entity for FailingPaint {
    fn paint(&mut self, _ctx: &mut Context<'_>, painter: &mut Painter<'_>) -> HookResult {
        painter.set_color(Color::rgb(0, 0, 255));
        painter.fill_rect(Rect::new(0.0, 0.0, 2.0, 2.0));
        Err(anyhow!("bad sprite"))
    }
}

#[test]
fn paint_error_closes_the_frame_without_presenting() {
    let log = new_log();
    let mut frame_loop = FrameLoop::new(headless_config());
    frame_loop.spawn(FailingPaint);
    frame_loop.spawn(Recorder::new("A", &log));

    let mut platform = HeadlessPlatform::new(&log, 10);
    frame_loop.start(&mut platform).unwrap();
    let err = frame_loop.step().unwrap_err();

    assert!(matches!(err, EngineError::Hook { hook: "paint", .. }));
    assert_eq!(frame_loop.state(), LoopState::Stopped);
    let log = entries(&log);
    assert_eq!(
        &log[log.len() - 3..],
        ["draw rect 0,0,255", "end_frame", "audio shutdown"]
    );
    assert!(!log.contains(&"A paint".to_string()));
    assert!(!log.iter().any(|e| e.starts_with("present")));
}

struct FailingStart;

impl Entity for FailingStart {
    fn start(&mut self, _ctx: &mut Context<'_>) -> HookResult {
        Err(anyhow!("missing asset"))
    }
}

#[test]
fn start_error_never_enters_running() {
    let log = new_log();
    let mut frame_loop = FrameLoop::new(headless_config());
    frame_loop.spawn(FailingStart);

    let mut platform = HeadlessPlatform::new(&log, 10);
    let err = frame_loop.run(&mut platform).unwrap_err();

    assert!(matches!(err, EngineError::Hook { hook: "start", .. }));
    assert_eq!(frame_loop.state(), LoopState::Stopped);
    assert_eq!(entries(&log), vec!["open", "audio shutdown"]);
    // A stopped loop ignores further frames.
    frame_loop.step().unwrap();
    assert_eq!(frame_loop.time().frame_count, 0);
}

// =============================================================================
// Paint gating
// =============================================================================

#[test]
fn painter_outside_paint_window_draws_nothing() {
    let log = new_log();
    let mut renderer = RecordingRenderer {
        log: log.clone(),
        in_frame: false,
        bitmaps: 0,
    };
    let mut style = Style::default();
    let mut painter = Painter::new(&mut renderer, &mut style);
    painter.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0));
    painter.line(Vec2::ZERO, Vec2::ONE, 1.0);
    assert!(!painter.can_paint());
    drop(painter);
    assert!(entries(&log).is_empty());
}
