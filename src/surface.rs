//! Drawing surface abstraction.
//!
//! A surface is any 2D target with path, stroke, fill and text primitives.
//! [`RenderSurface`] adds the offscreen buffer used by chunked rendering.
//! [`CommandBuffer`] records every call and backs the tests.

use glam::DVec2;

use crate::draw::def::FontSpec;
use crate::types::{Color, Dims};

/// Drop shadow applied to subsequent primitives
#[derive(Clone, Debug, PartialEq)]
pub struct Shadow {
    pub blur: f64,
    pub color: Color,
    pub offset: DVec2,
}

/// Object-safe drawing primitives
pub trait Surface {
    fn dims(&self) -> Dims;
    fn clear(&mut self);

    fn begin_path(&mut self, color: &Color, line_width: f64);
    fn move_to(&mut self, p: DVec2);
    fn line_to(&mut self, p: DVec2);
    /// Circular arc from `start` to `end` radians
    fn arc(&mut self, center: DVec2, radius: f64, start: f64, end: f64);
    fn ellipse(&mut self, center: DVec2, radii: DVec2, rotation: f64);
    fn rect(&mut self, origin: DVec2, size: DVec2);
    fn close_path(&mut self);
    fn stroke(&mut self);
    fn fill(&mut self, color: &Color);

    fn text(&mut self, at: DVec2, text: &str, font: &FontSpec, color: &Color);

    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, offset: DVec2);
    fn rotate(&mut self, angle: f64);
    fn set_shadow(&mut self, shadow: Option<&Shadow>);
}

/// A surface that can produce a matching offscreen buffer and blit one back.
pub trait RenderSurface: Surface + Sized {
    fn offscreen(&self) -> Self;
    /// Replace the surface contents with the buffer contents in one step.
    fn copy_from(&mut self, buffer: &Self);
}

/// One recorded surface call
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    BeginPath { color: Color, line_width: f64 },
    MoveTo(DVec2),
    LineTo(DVec2),
    Arc { center: DVec2, radius: f64, start: f64, end: f64 },
    Ellipse { center: DVec2, radii: DVec2, rotation: f64 },
    Rect { origin: DVec2, size: DVec2 },
    ClosePath,
    Stroke,
    Fill(Color),
    Text { at: DVec2, text: String, font: FontSpec, color: Color },
    Save,
    Restore,
    Translate(DVec2),
    Rotate(f64),
    Shadow(Option<Shadow>),
}

impl DrawCommand {
    /// True for calls that only frame a path rather than add geometry.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            DrawCommand::BeginPath { .. } | DrawCommand::Stroke | DrawCommand::Fill(_)
        )
    }
}

/// Recording surface
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandBuffer {
    dims: Dims,
    commands: Vec<DrawCommand>,
    clears: usize,
}

impl CommandBuffer {
    pub fn new(dims: Dims) -> Self {
        CommandBuffer {
            dims,
            commands: Vec::new(),
            clears: 0,
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of times `clear` has been called
    pub fn clear_count(&self) -> usize {
        self.clears
    }

    pub fn is_blank(&self) -> bool {
        self.commands.is_empty()
    }

    fn push(&mut self, cmd: DrawCommand) {
        self.commands.push(cmd);
    }
}

impl Surface for CommandBuffer {
    fn dims(&self) -> Dims {
        self.dims
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.clears += 1;
    }

    fn begin_path(&mut self, color: &Color, line_width: f64) {
        self.push(DrawCommand::BeginPath {
            color: color.clone(),
            line_width,
        });
    }

    fn move_to(&mut self, p: DVec2) {
        self.push(DrawCommand::MoveTo(p));
    }

    fn line_to(&mut self, p: DVec2) {
        self.push(DrawCommand::LineTo(p));
    }

    fn arc(&mut self, center: DVec2, radius: f64, start: f64, end: f64) {
        self.push(DrawCommand::Arc {
            center,
            radius,
            start,
            end,
        });
    }

    fn ellipse(&mut self, center: DVec2, radii: DVec2, rotation: f64) {
        self.push(DrawCommand::Ellipse {
            center,
            radii,
            rotation,
        });
    }

    fn rect(&mut self, origin: DVec2, size: DVec2) {
        self.push(DrawCommand::Rect { origin, size });
    }

    fn close_path(&mut self) {
        self.push(DrawCommand::ClosePath);
    }

    fn stroke(&mut self) {
        self.push(DrawCommand::Stroke);
    }

    fn fill(&mut self, color: &Color) {
        self.push(DrawCommand::Fill(color.clone()));
    }

    fn text(&mut self, at: DVec2, text: &str, font: &FontSpec, color: &Color) {
        self.push(DrawCommand::Text {
            at,
            text: text.to_string(),
            font: font.clone(),
            color: color.clone(),
        });
    }

    fn save(&mut self) {
        self.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.push(DrawCommand::Restore);
    }

    fn translate(&mut self, offset: DVec2) {
        self.push(DrawCommand::Translate(offset));
    }

    fn rotate(&mut self, angle: f64) {
        self.push(DrawCommand::Rotate(angle));
    }

    fn set_shadow(&mut self, shadow: Option<&Shadow>) {
        self.push(DrawCommand::Shadow(shadow.cloned()));
    }
}

impl RenderSurface for CommandBuffer {
    fn offscreen(&self) -> Self {
        CommandBuffer::new(self.dims)
    }

    fn copy_from(&mut self, buffer: &Self) {
        self.commands.clear();
        self.commands.extend_from_slice(&buffer.commands);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_replaces_contents() {
        let mut primary = CommandBuffer::new(Dims::new(10, 10));
        primary.move_to(DVec2::ZERO);
        let mut buffer = primary.offscreen();
        assert!(buffer.is_blank());
        buffer.line_to(DVec2::ONE);
        primary.copy_from(&buffer);
        assert_eq!(primary.commands(), &[DrawCommand::LineTo(DVec2::ONE)]);
        assert_eq!(primary.clear_count(), 0);
    }

    #[test]
    fn clear_counts() {
        let mut s = CommandBuffer::new(Dims::new(1, 1));
        s.stroke();
        s.clear();
        s.clear();
        assert!(s.is_blank());
        assert_eq!(s.clear_count(), 2);
    }
}
