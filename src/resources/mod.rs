//! Long-lived engine state owned by the frame loop.
//!
//! Overview
//! - `audiotrack` – decoded samples with playback cursor, looping and volume
//! - `engineconfig` – window/render/audio settings loaded from INI
//! - `input` – per-frame held/down/up snapshot fed by a raw event channel
//! - `mixer` – sums playing tracks into the output buffer
//! - `registry` – entity storage with deferred activation and destruction
//! - `worldtime` – frame delta and elapsed time

pub mod audiotrack;
pub mod engineconfig;
pub mod input;
pub mod mixer;
pub mod registry;
pub mod worldtime;
