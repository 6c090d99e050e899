//! Spork engine library.
//!
//! A small immediate-mode 2D game engine: entities with lifecycle hooks, an
//! edge-detecting input snapshot, a software audio mixer and a fixed-order
//! frame loop. Devices sit behind the [`Platform`](systems::frameloop::Platform),
//! [`Renderer`](systems::render::Renderer) and
//! [`EventSource`](systems::input::EventSource) traits so the loop runs
//! headless in tests.

pub mod backend;
pub mod components;
pub mod error;
pub mod events;
pub mod game;
pub mod resources;
pub mod systems;
