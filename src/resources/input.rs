//! Per-frame keyboard and mouse state.
//!
//! Raw callbacks may arrive at any time, from any thread, through an
//! [`InputSender`]. They are queued on an unbounded channel and only become
//! visible when the frame loop calls [`InputState::advance`], so every entity
//! sees the same snapshot for the whole frame.
//!
//! The cursor position is not queued: each move event overwrites a shared cell
//! and `advance` latches the latest value.

use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, unbounded};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::components::geometry::Vec2;
use crate::events::input::{KeyCode, MouseButton, RawInputEvent};

/// Held / just-down / just-up tracking for one kind of button.
#[derive(Debug, Clone)]
pub struct ButtonState<T: Copy + Eq + Hash> {
    held: FxHashSet<T>,
    down: FxHashSet<T>,
    up: FxHashSet<T>,
    /// Raw (down, up) counts since the last `settle`.
    counts: FxHashMap<T, (u32, u32)>,
}

impl<T: Copy + Eq + Hash> Default for ButtonState<T> {
    fn default() -> Self {
        Self {
            held: FxHashSet::default(),
            down: FxHashSet::default(),
            up: FxHashSet::default(),
            counts: FxHashMap::default(),
        }
    }
}

impl<T: Copy + Eq + Hash> ButtonState<T> {
    fn press(&mut self, button: T) {
        self.counts.entry(button).or_default().0 += 1;
    }

    fn release(&mut self, button: T) {
        self.counts.entry(button).or_default().1 += 1;
    }

    /// Turn the counts gathered since the last call into this frame's state.
    ///
    /// A button ends held when it saw more downs than ups, and released when the
    /// counts are equal or ups win. Downs for a button that was already held are
    /// OS repeats and never raise "down"; ups for a button that was never pressed
    /// never raise "up".
    fn settle(&mut self) {
        self.down.clear();
        self.up.clear();

        for (button, (downs, ups)) in self.counts.drain() {
            let was_held = self.held.contains(&button);
            if downs > 0 && !was_held {
                self.down.insert(button);
            }
            if ups > 0 && (was_held || downs > 0) {
                self.up.insert(button);
            }
            if downs > ups {
                self.held.insert(button);
            } else {
                self.held.remove(&button);
            }
        }
    }

    pub fn is_held(&self, button: T) -> bool {
        self.held.contains(&button)
    }

    pub fn is_down(&self, button: T) -> bool {
        self.down.contains(&button)
    }

    pub fn is_up(&self, button: T) -> bool {
        self.up.contains(&button)
    }

    pub fn held(&self) -> impl Iterator<Item = T> + '_ {
        self.held.iter().copied()
    }
}

/// Lock-free last-write-wins cursor cell.
#[derive(Debug, Default)]
struct CursorCell(AtomicU64);

impl CursorCell {
    fn store(&self, pos: Vec2) {
        let bits = ((pos.x.to_bits() as u64) << 32) | pos.y.to_bits() as u64;
        self.0.store(bits, Ordering::Release);
    }

    fn load(&self) -> Vec2 {
        let bits = self.0.load(Ordering::Acquire);
        Vec2::new(f32::from_bits((bits >> 32) as u32), f32::from_bits(bits as u32))
    }
}

/// Cloneable, thread-safe handle for feeding raw callbacks into an [`InputState`].
#[derive(Debug, Clone)]
pub struct InputSender {
    tx: Sender<RawInputEvent>,
    cursor: Arc<CursorCell>,
}

impl InputSender {
    pub fn on_key_down(&self, key: KeyCode) {
        self.send(RawInputEvent::KeyDown(key));
    }

    pub fn on_key_up(&self, key: KeyCode) {
        self.send(RawInputEvent::KeyUp(key));
    }

    pub fn on_mouse_down(&self, button: MouseButton) {
        self.send(RawInputEvent::MouseDown(button));
    }

    pub fn on_mouse_up(&self, button: MouseButton) {
        self.send(RawInputEvent::MouseUp(button));
    }

    pub fn on_mouse_move(&self, pos: Vec2) {
        self.cursor.store(pos);
    }

    /// Forward any raw event.
    pub fn send(&self, event: RawInputEvent) {
        match event {
            RawInputEvent::MouseMove(pos) => self.cursor.store(pos),
            // The receiver lives as long as the InputState; a failed send means the
            // engine is shutting down.
            other => {
                let _ = self.tx.send(other);
            }
        }
    }
}

/// Resource capturing the per-frame input snapshot.
#[derive(Debug)]
pub struct InputState {
    keys: ButtonState<KeyCode>,
    mouse: ButtonState<MouseButton>,
    cursor: Vec2,
    sender: InputSender,
    rx: Receiver<RawInputEvent>,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            keys: ButtonState::default(),
            mouse: ButtonState::default(),
            cursor: Vec2::ZERO,
            sender: InputSender {
                tx,
                cursor: Arc::new(CursorCell::default()),
            },
            rx,
        }
    }

    /// A handle that event sources (possibly on other threads) use to deliver callbacks.
    pub fn sender(&self) -> InputSender {
        self.sender.clone()
    }

    pub fn on_key_down(&self, key: KeyCode) {
        self.sender.on_key_down(key);
    }

    pub fn on_key_up(&self, key: KeyCode) {
        self.sender.on_key_up(key);
    }

    pub fn on_mouse_down(&self, button: MouseButton) {
        self.sender.on_mouse_down(button);
    }

    pub fn on_mouse_up(&self, button: MouseButton) {
        self.sender.on_mouse_up(button);
    }

    pub fn on_mouse_move(&self, pos: Vec2) {
        self.sender.on_mouse_move(pos);
    }

    /// Fold every raw event received since the previous call into this frame's state.
    ///
    /// Must run once per frame, before any entity reads input. Only the number
    /// of downs and ups per button matters, not their order: a press and release
    /// inside one frame window show up as both "down" and "up" and leave the key
    /// released, and a release plus a repeat press of a held key also ends
    /// released.
    pub fn advance(&mut self) {
        for event in self.rx.try_iter() {
            match event {
                RawInputEvent::KeyDown(key) => self.keys.press(key),
                RawInputEvent::KeyUp(key) => self.keys.release(key),
                RawInputEvent::MouseDown(button) => self.mouse.press(button),
                RawInputEvent::MouseUp(button) => self.mouse.release(button),
                RawInputEvent::MouseMove(pos) => self.sender.cursor.store(pos),
            }
        }
        self.keys.settle();
        self.mouse.settle();

        self.cursor = self.sender.cursor.load();
    }

    pub fn is_held(&self, key: KeyCode) -> bool {
        self.keys.is_held(key)
    }

    pub fn is_down(&self, key: KeyCode) -> bool {
        self.keys.is_down(key)
    }

    pub fn is_up(&self, key: KeyCode) -> bool {
        self.keys.is_up(key)
    }

    pub fn is_mouse_held(&self, button: MouseButton) -> bool {
        self.mouse.is_held(button)
    }

    pub fn is_mouse_down(&self, button: MouseButton) -> bool {
        self.mouse.is_down(button)
    }

    pub fn is_mouse_up(&self, button: MouseButton) -> bool {
        self.mouse.is_up(button)
    }

    /// Cursor position latched at the last [`advance`](Self::advance).
    pub fn cursor_position(&self) -> Vec2 {
        self.cursor
    }

    pub fn keys(&self) -> &ButtonState<KeyCode> {
        &self.keys
    }

    pub fn mouse(&self) -> &ButtonState<MouseButton> {
        &self.mouse
    }
}
