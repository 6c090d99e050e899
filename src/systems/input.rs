//! Input systems.
//!
//! - [`EventSource`] is the boundary to the OS/window event stream. Sources that
//!   run their own thread push through the [`InputSender`] given to
//!   [`EventSource::attach`]; polled backends do their work in
//!   [`EventSource::poll`], which the frame loop calls right before the input
//!   snapshot is taken.
//! - [`update_input_state`] is that per-frame step.

use crate::resources::input::{InputSender, InputState};

/// Raw key/mouse callback provider.
pub trait EventSource {
    /// Receive the sink for raw callbacks. Called once, before the first frame.
    fn attach(&mut self, sink: InputSender);

    /// Pump pending OS events on the frame-loop thread.
    fn poll(&mut self) {}

    /// The user asked to close the window.
    fn close_requested(&self) -> bool {
        false
    }
}

/// Poll the source, then fold everything received into this frame's snapshot.
pub fn update_input_state(events: &mut dyn EventSource, input: &mut InputState) {
    events.poll();
    input.advance();
}
