//! Rendering boundary.
//!
//! [`Renderer`] is the collaborator interface a backend implements. Entities
//! never see it directly during a frame: paint hooks receive a [`Painter`],
//! which carries the current colour/rotation/scale and drops every draw call
//! made while its gate is closed. The frame loop only opens the gate between
//! `begin_frame` and `end_frame`.

use crate::components::geometry::{Color, Rect, Vec2};
use crate::error::Result;

/// Handle to a bitmap loaded by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitmapId(pub u32);

/// Fill or outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stroke {
    Fill,
    Outline(f32),
}

/// One draw call. Positions are the top-left corner before rotation/scale.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive<'a> {
    Line {
        from: Vec2,
        to: Vec2,
        width: f32,
    },
    Rect {
        rect: Rect,
        stroke: Stroke,
    },
    RoundedRect {
        rect: Rect,
        radius: Vec2,
        stroke: Stroke,
    },
    /// Ellipse centred on `center` with radii `radius`.
    Ellipse {
        center: Vec2,
        radius: Vec2,
        stroke: Stroke,
    },
    /// `source` of `None` draws the whole bitmap.
    Bitmap {
        bitmap: BitmapId,
        position: Vec2,
        source: Option<Rect>,
    },
    Text {
        text: &'a str,
        bounds: Rect,
        size: f32,
    },
}

/// Transform and colour applied to a primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub color: Color,
    /// Radians, around the primitive's centre.
    pub rotation: f32,
    pub scale: Vec2,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            rotation: 0.0,
            scale: Vec2::ONE,
        }
    }
}

/// Window/surface backend.
///
/// Draw calls made outside `begin_frame`/`end_frame` must be ignored.
pub trait Renderer {
    fn begin_frame(&mut self);
    fn clear(&mut self, color: Color);
    fn draw(&mut self, primitive: &Primitive<'_>, style: &Style);
    fn end_frame(&mut self);
    /// Show the frame; blocks for `vsync_interval` vertical blanks when non-zero.
    fn present(&mut self, vsync_interval: u32);
    fn load_bitmap(&mut self, path: &str) -> Result<BitmapId>;
    fn bitmap_size(&self, _bitmap: BitmapId) -> Option<Vec2> {
        None
    }
}

/// Gated drawing facade handed to paint hooks.
pub struct Painter<'a> {
    renderer: &'a mut dyn Renderer,
    style: &'a mut Style,
    open: bool,
}

impl<'a> Painter<'a> {
    /// A painter with its gate closed.
    pub fn new(renderer: &'a mut dyn Renderer, style: &'a mut Style) -> Self {
        Self {
            renderer,
            style,
            open: false,
        }
    }

    pub(crate) fn open(&mut self) {
        self.open = true;
    }

    pub(crate) fn close(&mut self) {
        self.open = false;
    }

    /// Whether draw calls currently reach the renderer.
    pub fn can_paint(&self) -> bool {
        self.open
    }

    pub fn set_color(&mut self, color: Color) {
        self.style.color = color;
    }

    pub fn color(&self) -> Color {
        self.style.color
    }

    /// Rotation applied to subsequent draws, in radians.
    pub fn set_rotation(&mut self, radians: f32) {
        self.style.rotation = radians;
    }

    pub fn set_scale(&mut self, scale: Vec2) {
        self.style.scale = scale;
    }

    pub fn style(&self) -> Style {
        *self.style
    }

    fn submit(&mut self, primitive: Primitive<'_>) {
        if !self.open {
            log::trace!("painter: dropped draw call outside the paint window");
            return;
        }
        self.renderer.draw(&primitive, self.style);
    }

    pub fn line(&mut self, from: Vec2, to: Vec2, width: f32) {
        self.submit(Primitive::Line { from, to, width });
    }

    pub fn rect(&mut self, rect: Rect, stroke_width: f32) {
        self.submit(Primitive::Rect {
            rect,
            stroke: Stroke::Outline(stroke_width),
        });
    }

    pub fn fill_rect(&mut self, rect: Rect) {
        self.submit(Primitive::Rect {
            rect,
            stroke: Stroke::Fill,
        });
    }

    pub fn rounded_rect(&mut self, rect: Rect, radius: Vec2, stroke_width: f32) {
        self.submit(Primitive::RoundedRect {
            rect,
            radius,
            stroke: Stroke::Outline(stroke_width),
        });
    }

    pub fn fill_rounded_rect(&mut self, rect: Rect, radius: Vec2) {
        self.submit(Primitive::RoundedRect {
            rect,
            radius,
            stroke: Stroke::Fill,
        });
    }

    pub fn ellipse(&mut self, center: Vec2, radius: Vec2, stroke_width: f32) {
        self.submit(Primitive::Ellipse {
            center,
            radius,
            stroke: Stroke::Outline(stroke_width),
        });
    }

    pub fn fill_ellipse(&mut self, center: Vec2, radius: Vec2) {
        self.submit(Primitive::Ellipse {
            center,
            radius,
            stroke: Stroke::Fill,
        });
    }

    pub fn bitmap(&mut self, bitmap: BitmapId, position: Vec2, source: Option<Rect>) {
        self.submit(Primitive::Bitmap {
            bitmap,
            position,
            source,
        });
    }

    pub fn text(&mut self, text: &str, bounds: Rect, size: f32) {
        self.submit(Primitive::Text { text, bounds, size });
    }
}
