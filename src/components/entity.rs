//! Entity hooks and the context they run with.
//!
//! An [`Entity`] is any type implementing some subset of the lifecycle hooks.
//! Entities never register themselves: the owning code (or another entity,
//! through [`Context::spawn`]) does it explicitly.

use std::fmt;

use crate::components::geometry::Vec2;
use crate::error::{EngineError, Result};
use crate::resources::engineconfig::EngineConfig;
use crate::resources::input::InputState;
use crate::resources::mixer::Mixer;
use crate::resources::registry::EntityRegistry;
use crate::resources::worldtime::WorldTime;
use crate::systems::render::{BitmapId, Painter, Renderer};

/// Result returned by every hook. An error stops the frame loop.
pub type HookResult = anyhow::Result<()>;

/// Generational handle to an entity stored in the [`EntityRegistry`].
///
/// Ids of destroyed entities stay harmless: every registry operation on them
/// is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Lifecycle hooks, all optional.
///
/// - `init` runs once before devices exist; it may edit the [`EngineConfig`].
/// - `start` runs once after the window and audio device are up.
/// - `update` runs every frame; game logic, may spawn/destroy entities.
/// - `paint` runs every frame between begin/end of the frame; drawing only.
/// - `end` runs once when the loop stops.
pub trait Entity {
    fn init(&mut self, _ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    fn start(&mut self, _ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    fn update(&mut self, _ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    fn paint(&mut self, _ctx: &mut Context<'_>, _painter: &mut Painter<'_>) -> HookResult {
        Ok(())
    }

    fn end(&mut self, _ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }
}

/// Everything a hook may touch: the registry, input, time, audio and config.
pub struct Context<'a> {
    pub(crate) id: EntityId,
    pub(crate) registry: &'a mut EntityRegistry,
    pub(crate) input: &'a InputState,
    pub(crate) time: &'a WorldTime,
    pub(crate) mixer: &'a Mixer,
    pub(crate) config: &'a mut EngineConfig,
    pub(crate) renderer: Option<&'a mut (dyn Renderer + 'static)>,
    pub(crate) quit: &'a mut bool,
}

impl<'a> Context<'a> {
    /// Id of the entity whose hook is running.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Store `entity` and request its activation; live from the next frame.
    pub fn spawn(&mut self, entity: impl Entity + 'static) -> EntityId {
        self.registry.spawn(entity)
    }

    pub fn register(&mut self, id: EntityId) {
        self.registry.register(id);
    }

    pub fn unregister(&mut self, id: EntityId) {
        self.registry.unregister(id);
    }

    pub fn set_active(&mut self, id: EntityId, active: bool) {
        self.registry.set_active(id, active);
    }

    /// Request destruction of `id` at the end of this frame.
    pub fn destroy(&mut self, id: EntityId) {
        self.registry.destroy(id);
    }

    /// Request destruction of the running entity.
    pub fn destroy_self(&mut self) {
        self.registry.destroy(self.id);
    }

    pub fn is_live(&self, id: EntityId) -> bool {
        self.registry.is_live(id)
    }

    pub fn registry(&self) -> &EntityRegistry {
        self.registry
    }

    pub fn input(&self) -> &InputState {
        self.input
    }

    pub fn cursor(&self) -> Vec2 {
        self.input.cursor_position()
    }

    pub fn time(&self) -> &WorldTime {
        self.time
    }

    /// Scaled seconds since the previous frame.
    pub fn delta_time(&self) -> f32 {
        self.time.delta
    }

    pub fn mixer(&self) -> &Mixer {
        self.mixer
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    /// Mutable config. Window settings only take effect when edited from `init`.
    pub fn config_mut(&mut self) -> &mut EngineConfig {
        self.config
    }

    /// Load a bitmap through the renderer. Unavailable from `init` and `paint`.
    pub fn load_bitmap(&mut self, path: &str) -> Result<BitmapId> {
        match self.renderer.as_deref_mut() {
            Some(renderer) => renderer.load_bitmap(path),
            None => Err(EngineError::NotReady("renderer")),
        }
    }

    /// Ask the frame loop to stop after the current frame.
    pub fn quit(&mut self) {
        *self.quit = true;
    }
}
