//! Entity-facing types.
//!
//! Submodules overview:
//! - [`entity`] – the [`Entity`](entity::Entity) hooks, ids and the hook [`Context`](entity::Context)
//! - [`geometry`] – vectors, rectangles and colours used by drawing and input

pub mod entity;
pub mod geometry;
