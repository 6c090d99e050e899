//! The frame loop.
//!
//! [`FrameLoop`] is the explicit engine context: it owns the registry, input,
//! mixer, time and config, and hands borrowed views of them to entity hooks
//! through [`Context`]. Devices come from a [`Platform`] once the `init` hooks
//! have had a chance to adjust the config.
//!
//! Per-frame order:
//! 1. `begin_frame`, clear
//! 2. poll the event source, advance input
//! 3. `update` hooks over a snapshot of the live entities
//! 4. open the paint gate, `paint` hooks, close the gate
//! 5. `end_frame`, `present`
//! 6. reconcile the registry
//! 7. measure the frame for the next delta

use crate::components::entity::{Context, Entity, EntityId};
use crate::error::{EngineError, Result};
use crate::resources::engineconfig::EngineConfig;
use crate::resources::input::InputState;
use crate::resources::mixer::{FinishedPolicy, Mixer};
use crate::resources::registry::EntityRegistry;
use crate::resources::worldtime::{FrameClock, WorldTime};
use crate::systems::input::{EventSource, update_input_state};
use crate::systems::render::{Painter, Renderer, Style};

/// Keeps an audio device alive; dropped or shut down when the loop stops.
pub trait AudioOutput {
    fn shutdown(&mut self);
}

/// Devices acquired at startup.
pub struct Devices {
    pub renderer: Box<dyn Renderer>,
    pub events: Box<dyn EventSource>,
    pub audio: Option<Box<dyn AudioOutput>>,
}

/// Creates the window, renderer, event source and audio output.
pub trait Platform {
    /// Fails with [`EngineError::DeviceInit`] when a device cannot be created.
    fn open(&mut self, config: &EngineConfig, mixer: &Mixer) -> Result<Devices>;
}

/// Lifecycle of a [`FrameLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    Initializing,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy)]
enum Hook {
    Init,
    Start,
    Update,
    End,
}

impl Hook {
    fn name(self) -> &'static str {
        match self {
            Hook::Init => "init",
            Hook::Start => "start",
            Hook::Update => "update",
            Hook::End => "end",
        }
    }
}

/// Engine context and frame scheduler.
pub struct FrameLoop {
    state: LoopState,
    config: EngineConfig,
    registry: EntityRegistry,
    input: InputState,
    mixer: Mixer,
    time: WorldTime,
    clock: FrameClock,
    style: Style,
    quit: bool,
    devices: Option<Devices>,
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl FrameLoop {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            state: LoopState::Uninitialized,
            config,
            registry: EntityRegistry::new(),
            input: InputState::new(),
            mixer: Mixer::default(),
            time: WorldTime::default(),
            clock: FrameClock::new(),
            style: Style::default(),
            quit: false,
            devices: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Store `entity` and request its activation.
    pub fn spawn(&mut self, entity: impl Entity + 'static) -> EntityId {
        self.registry.spawn(entity)
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn time(&self) -> &WorldTime {
        &self.time
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    /// Stop after the current frame.
    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    /// Whether the loop should leave `Running` before the next frame.
    pub fn stop_requested(&self) -> bool {
        self.quit
            || self
                .devices
                .as_ref()
                .is_some_and(|d| d.events.close_requested())
    }

    /// Start, run frames until a stop is requested, then stop.
    pub fn run(&mut self, platform: &mut dyn Platform) -> Result<()> {
        self.start(platform)?;
        while self.state == LoopState::Running && !self.stop_requested() {
            self.step()?;
        }
        self.stop()
    }

    /// `Uninitialized -> Initializing -> Running`.
    ///
    /// Materialises the initial entities, runs their `init` hooks, opens the
    /// devices, then runs their `start` hooks. Any failure releases what was
    /// acquired and leaves the loop `Stopped`.
    pub fn start(&mut self, platform: &mut dyn Platform) -> Result<()> {
        if self.state != LoopState::Uninitialized {
            log::warn!("frame loop already started (state {:?})", self.state);
            return Ok(());
        }
        self.state = LoopState::Initializing;

        self.registry.reconcile();
        let ids = self.registry.snapshot_live();
        if let Err(e) = self.run_hook(Hook::Init, &ids) {
            self.release();
            return Err(e);
        }

        self.mixer.set_gain(self.config.master_volume);
        self.mixer.set_policy(if self.config.auto_stop_finished {
            FinishedPolicy::AutoStop
        } else {
            FinishedPolicy::Keep
        });

        let mut devices = match platform.open(&self.config, &self.mixer) {
            Ok(devices) => devices,
            Err(e) => {
                log::error!("device initialization failed: {e}");
                self.release();
                return Err(e);
            }
        };
        devices.events.attach(self.input.sender());
        self.devices = Some(devices);
        self.style.scale = self.config.scale;
        log::info!(
            "'{}' started with {} entities",
            self.config.title,
            self.registry.live().len()
        );

        let ids = self.registry.snapshot_live();
        if let Err(e) = self.run_hook(Hook::Start, &ids) {
            self.release();
            return Err(e);
        }

        self.state = LoopState::Running;
        self.clock.restart();
        Ok(())
    }

    /// Run one frame. Does nothing unless the loop is `Running`.
    ///
    /// A failing `update` or `paint` hook still closes the frame, then the
    /// devices are released and the loop is `Stopped`; `end` hooks do not run.
    pub fn step(&mut self) -> Result<()> {
        if self.state != LoopState::Running {
            return Ok(());
        }

        {
            let devices = self
                .devices
                .as_mut()
                .ok_or(EngineError::NotReady("devices"))?;
            devices.renderer.begin_frame();
            devices.renderer.clear(self.config.clear_color);
            update_input_state(devices.events.as_mut(), &mut self.input);
        }

        let ids = self.registry.snapshot_live();
        let hooks = self
            .run_hook(Hook::Update, &ids)
            .and_then(|()| self.paint_pass(&ids));

        if let Some(devices) = self.devices.as_mut() {
            devices.renderer.end_frame();
            if hooks.is_ok() {
                devices.renderer.present(self.config.vsync);
            }
        }
        if let Err(e) = hooks {
            log::error!("frame loop aborted: {e}");
            self.release();
            return Err(e);
        }

        self.registry.reconcile();

        let dt = self.clock.restart();
        self.time.advance(dt.as_secs_f32());
        Ok(())
    }

    /// `Running -> Stopped`: `end` hooks on live entities, then release devices.
    pub fn stop(&mut self) -> Result<()> {
        if self.state == LoopState::Stopped {
            return Ok(());
        }
        let ids = self.registry.snapshot_live();
        let result = self.run_hook(Hook::End, &ids);
        self.release();
        log::info!("'{}' stopped after {} frames", self.config.title, self.time.frame_count);
        result
    }

    fn release(&mut self) {
        if let Some(mut devices) = self.devices.take() {
            if let Some(audio) = devices.audio.as_mut() {
                audio.shutdown();
            }
        }
        self.state = LoopState::Stopped;
    }

    fn run_hook(&mut self, hook: Hook, ids: &[EntityId]) -> Result<()> {
        let FrameLoop {
            registry,
            input,
            time,
            mixer,
            config,
            quit,
            devices,
            ..
        } = self;

        for &id in ids {
            let renderer = renderer_of(devices);
            let outcome = registry.with_entity(id, |entity, registry| {
                let mut ctx = Context {
                    id,
                    registry,
                    input: &*input,
                    time: &*time,
                    mixer: &*mixer,
                    config: &mut *config,
                    renderer,
                    quit: &mut *quit,
                };
                match hook {
                    Hook::Init => entity.init(&mut ctx),
                    Hook::Start => entity.start(&mut ctx),
                    Hook::Update => entity.update(&mut ctx),
                    Hook::End => entity.end(&mut ctx),
                }
            });
            if let Some(Err(source)) = outcome {
                return Err(EngineError::Hook {
                    hook: hook.name(),
                    source,
                });
            }
        }
        Ok(())
    }

    fn paint_pass(&mut self, ids: &[EntityId]) -> Result<()> {
        let FrameLoop {
            registry,
            input,
            time,
            mixer,
            config,
            quit,
            devices,
            style,
            ..
        } = self;
        let Some(devices) = devices.as_mut() else {
            return Ok(());
        };

        let mut painter = Painter::new(devices.renderer.as_mut(), style);
        painter.open();
        let mut result = Ok(());
        for &id in ids {
            let outcome = registry.with_entity(id, |entity, registry| {
                let mut ctx = Context {
                    id,
                    registry,
                    input: &*input,
                    time: &*time,
                    mixer: &*mixer,
                    config: &mut *config,
                    renderer: None,
                    quit: &mut *quit,
                };
                entity.paint(&mut ctx, &mut painter)
            });
            if let Some(Err(source)) = outcome {
                result = Err(EngineError::Hook {
                    hook: "paint",
                    source,
                });
                break;
            }
        }
        painter.close();
        result
    }
}

fn renderer_of(devices: &mut Option<Devices>) -> Option<&mut (dyn Renderer + 'static)> {
    devices.as_mut().map(|d| d.renderer.as_mut())
}
