//! raylib window + rodio audio.
//!
//! raylib's safe drawing handle borrows the window for the length of a scope,
//! which does not fit a renderer whose frame is opened and closed by separate
//! calls, so drawing goes through `raylib::ffi` the way the render target
//! code does. Textures are still loaded through the safe handle so they are
//! unloaded on drop.

use std::ffi::CString;

use raylib::ffi;
use raylib::prelude::{RaylibHandle, RaylibThread, Texture2D};
use rustc_hash::FxHashSet;

use crate::components::geometry::{Color, Rect, Vec2};
use crate::error::{EngineError, Result};
use crate::events::input::{KeyCode, MouseButton};
use crate::resources::engineconfig::EngineConfig;
use crate::resources::input::InputSender;
use crate::resources::mixer::Mixer;
use crate::systems::audio::RodioOutput;
use crate::systems::frameloop::{AudioOutput, Devices, Platform};
use crate::systems::input::EventSource;
use crate::systems::render::{BitmapId, Primitive, Renderer, Stroke, Style};

const ROUNDED_SEGMENTS: i32 = 8;
const TEXT_SPACING: f32 = 1.0;

/// Opens a raylib window and, when enabled, the default audio device.
#[derive(Debug, Default)]
pub struct DesktopPlatform;

impl Platform for DesktopPlatform {
    fn open(&mut self, config: &EngineConfig, mixer: &Mixer) -> Result<Devices> {
        let (width, height) = config.window_size();
        let mut builder = raylib::init();
        builder
            .size(width as i32, height as i32)
            .title(&config.title);
        if config.vsync > 0 {
            builder.vsync();
        }
        let (mut rl, thread) = builder.build();
        if !rl.is_window_ready() {
            return Err(EngineError::DeviceInit("window could not be created".into()));
        }
        if config.vsync == 0 {
            rl.set_target_fps(config.target_fps);
        }
        // Escape is game input, not a close request.
        rl.set_exit_key(None);
        log::info!("window opened: {}x{} '{}'", width, height, config.title);

        let audio: Option<Box<dyn AudioOutput>> = if config.audio_enabled {
            Some(Box::new(RodioOutput::open(mixer)?))
        } else {
            log::info!("audio disabled by config");
            None
        };

        Ok(Devices {
            renderer: Box::new(RaylibRenderer::new(rl, thread)),
            events: Box::new(RaylibEvents::new(width as i32, height as i32)),
            audio,
        })
    }
}

/// Draws through raylib; owns the window handle.
pub struct RaylibRenderer {
    rl: RaylibHandle,
    thread: RaylibThread,
    textures: Vec<Texture2D>,
    in_frame: bool,
}

impl RaylibRenderer {
    fn new(rl: RaylibHandle, thread: RaylibThread) -> Self {
        Self {
            rl,
            thread,
            textures: Vec::new(),
            in_frame: false,
        }
    }
}

fn to_color(color: Color) -> ffi::Color {
    ffi::Color {
        r: color.r,
        g: color.g,
        b: color.b,
        a: color.a,
    }
}

fn to_vector(v: Vec2) -> ffi::Vector2 {
    ffi::Vector2 { x: v.x, y: v.y }
}

fn to_rectangle(rect: Rect) -> ffi::Rectangle {
    ffi::Rectangle {
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
    }
}

/// Scaled destination rect positioned so raylib rotates it around its centre,
/// plus the matching origin.
fn centred(rect: Rect, scale: Vec2) -> (ffi::Rectangle, ffi::Vector2) {
    let width = rect.width * scale.x;
    let height = rect.height * scale.y;
    let origin = ffi::Vector2 {
        x: width * 0.5,
        y: height * 0.5,
    };
    let dest = ffi::Rectangle {
        x: rect.x + origin.x,
        y: rect.y + origin.y,
        width,
        height,
    };
    (dest, origin)
}

impl Renderer for RaylibRenderer {
    fn begin_frame(&mut self) {
        unsafe { ffi::BeginDrawing() };
        self.in_frame = true;
    }

    fn clear(&mut self, color: Color) {
        if self.in_frame {
            unsafe { ffi::ClearBackground(to_color(color)) };
        }
    }

    fn draw(&mut self, primitive: &Primitive<'_>, style: &Style) {
        if !self.in_frame {
            return;
        }
        let color = to_color(style.color);
        let degrees = style.rotation.to_degrees();
        let scale = style.scale;

        match *primitive {
            Primitive::Line { from, to, width } => unsafe {
                ffi::DrawLineEx(to_vector(from), to_vector(to), width, color);
            },
            Primitive::Rect { rect, stroke } => {
                let (dest, origin) = centred(rect, scale);
                match stroke {
                    Stroke::Fill => unsafe { ffi::DrawRectanglePro(dest, origin, degrees, color) },
                    // raylib has no rotated outline; outlines are axis aligned.
                    Stroke::Outline(width) => unsafe {
                        let outline = ffi::Rectangle {
                            x: dest.x - origin.x,
                            y: dest.y - origin.y,
                            ..dest
                        };
                        ffi::DrawRectangleLinesEx(outline, width, color);
                    },
                }
            }
            Primitive::RoundedRect { rect, radius, stroke } => {
                let scaled = Rect::new(rect.x, rect.y, rect.width * scale.x, rect.height * scale.y);
                let shortest = scaled.width.min(scaled.height).max(f32::EPSILON);
                let roundness = (radius.x.min(radius.y) * 2.0 / shortest).clamp(0.0, 1.0);
                let rec = to_rectangle(scaled);
                match stroke {
                    Stroke::Fill => unsafe {
                        ffi::DrawRectangleRounded(rec, roundness, ROUNDED_SEGMENTS, color);
                    },
                    Stroke::Outline(width) => unsafe {
                        ffi::DrawRectangleRoundedLinesEx(rec, roundness, ROUNDED_SEGMENTS, width, color);
                    },
                }
            }
            Primitive::Ellipse {
                center,
                radius,
                stroke,
            } => {
                let (cx, cy) = (center.x as i32, center.y as i32);
                let (rx, ry) = (radius.x * scale.x, radius.y * scale.y);
                match stroke {
                    Stroke::Fill => unsafe { ffi::DrawEllipse(cx, cy, rx, ry, color) },
                    Stroke::Outline(_) => unsafe { ffi::DrawEllipseLines(cx, cy, rx, ry, color) },
                }
            }
            Primitive::Bitmap {
                bitmap,
                position,
                source,
            } => {
                let Some(texture) = self.textures.get(bitmap.0 as usize) else {
                    log::warn!("draw of unknown bitmap {}", bitmap.0);
                    return;
                };
                let full = Rect::new(0.0, 0.0, texture.width as f32, texture.height as f32);
                let source = source.unwrap_or(full);
                let placed = Rect::new(position.x, position.y, source.width, source.height);
                let (dest, origin) = centred(placed, scale);
                unsafe {
                    ffi::DrawTexturePro(**texture, to_rectangle(source), dest, origin, degrees, color);
                }
            }
            Primitive::Text { text, bounds, size } => {
                let Ok(text) = CString::new(text) else {
                    log::warn!("text with interior NUL not drawn");
                    return;
                };
                unsafe {
                    ffi::DrawTextEx(
                        ffi::GetFontDefault(),
                        text.as_ptr(),
                        to_vector(bounds.position()),
                        size * scale.y,
                        TEXT_SPACING,
                        color,
                    );
                }
            }
        }
    }

    fn end_frame(&mut self) {
        if self.in_frame {
            unsafe { ffi::EndDrawing() };
            self.in_frame = false;
        }
    }

    fn present(&mut self, _vsync_interval: u32) {
        // EndDrawing already swapped buffers and waited for vsync/target fps.
    }

    fn load_bitmap(&mut self, path: &str) -> Result<BitmapId> {
        let texture = self
            .rl
            .load_texture(&self.thread, path)
            .map_err(|e| EngineError::decode(path, e))?;
        let id = BitmapId(self.textures.len() as u32);
        log::info!("loaded bitmap {} from {}", id.0, path);
        self.textures.push(texture);
        Ok(id)
    }

    fn bitmap_size(&self, bitmap: BitmapId) -> Option<Vec2> {
        self.textures
            .get(bitmap.0 as usize)
            .map(|t| Vec2::new(t.width as f32, t.height as f32))
    }
}

/// Polls raylib's key and mouse queues on the frame-loop thread.
///
/// Alt+Enter toggles fullscreen here and is still forwarded as input.
pub struct RaylibEvents {
    sink: Option<InputSender>,
    held: FxHashSet<i32>,
    cursor: Option<Vec2>,
    close: bool,
    windowed: (i32, i32),
}

const MOUSE_BUTTONS: [MouseButton; 3] = [MouseButton::Left, MouseButton::Right, MouseButton::Middle];

impl RaylibEvents {
    fn new(width: i32, height: i32) -> Self {
        Self {
            sink: None,
            held: FxHashSet::default(),
            cursor: None,
            close: false,
            windowed: (width, height),
        }
    }
}

/// Enter pressed while either Alt key is down.
fn is_fullscreen_chord(held: &FxHashSet<i32>, pressed: i32) -> bool {
    KeyCode(pressed) == KeyCode::ENTER && held.iter().any(|&key| KeyCode(key).is_alt())
}

/// Switch between windowed (restored to `windowed`) and monitor-sized fullscreen.
fn toggle_fullscreen(windowed: (i32, i32)) {
    unsafe {
        if ffi::IsWindowFullscreen() {
            ffi::ToggleFullscreen();
            ffi::SetWindowSize(windowed.0, windowed.1);
            ffi::RestoreWindow();
            if ffi::IsWindowFullscreen() {
                log::error!("failed to leave fullscreen");
            } else {
                log::info!("fullscreen off");
            }
        } else {
            let monitor = ffi::GetCurrentMonitor();
            let (width, height) = (ffi::GetMonitorWidth(monitor), ffi::GetMonitorHeight(monitor));
            log::info!("monitor {monitor}: {width}x{height}");
            ffi::SetWindowSize(width, height);
            ffi::ToggleFullscreen();
            if ffi::IsWindowFullscreen() {
                log::info!("fullscreen on");
            } else {
                log::error!("failed to enter fullscreen");
            }
        }
    }
}

impl EventSource for RaylibEvents {
    fn attach(&mut self, sink: InputSender) {
        self.sink = Some(sink);
    }

    fn poll(&mut self) {
        let Some(sink) = &self.sink else {
            return;
        };
        unsafe {
            loop {
                let key = ffi::GetKeyPressed();
                if key == 0 {
                    break;
                }
                if is_fullscreen_chord(&self.held, key) {
                    toggle_fullscreen(self.windowed);
                }
                self.held.insert(key);
                sink.on_key_down(KeyCode(key));
            }
            self.held.retain(|&key| {
                let released = !ffi::IsKeyDown(key);
                if released {
                    sink.on_key_up(KeyCode(key));
                }
                !released
            });

            for button in MOUSE_BUTTONS {
                let index = button.index() as i32;
                if ffi::IsMouseButtonPressed(index) {
                    sink.on_mouse_down(button);
                }
                if ffi::IsMouseButtonReleased(index) {
                    sink.on_mouse_up(button);
                }
            }

            let position = ffi::GetMousePosition();
            let position = Vec2::new(position.x, position.y);
            if self.cursor != Some(position) {
                self.cursor = Some(position);
                sink.on_mouse_move(position);
            }

            self.close = ffi::WindowShouldClose();
        }
    }

    fn close_requested(&self) -> bool {
        self.close
    }
}
