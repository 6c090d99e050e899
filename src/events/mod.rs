//! Event types crossing the platform boundary.
//!
//! Submodules:
//! - [`input`] – raw key/mouse events and the key and button codes they carry
pub mod input;
