//! Device backends implementing [`Platform`](crate::systems::frameloop::Platform).

#[cfg(feature = "desktop")]
pub mod desktop;
