//! Engine systems.
//!
//! Submodules overview
//! - [`audio`] – decoding, format normalisation and the output device
//! - [`frameloop`] – startup, the per-frame schedule and shutdown
//! - [`input`] – the event source boundary and the per-frame input step
//! - [`render`] – the renderer boundary and the gated [`Painter`](render::Painter)

pub mod audio;
pub mod frameloop;
pub mod input;
pub mod render;
