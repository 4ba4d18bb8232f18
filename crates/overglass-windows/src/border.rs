//! Border highlight renderer.
//!
//! Draws a rectangular frame into its layer sprite. The controller
//! drives `set_level` through the `"border"` animation, so the frame
//! fades by alpha instead of snapping.

use crate::compose::{SpriteId, WinCompositor};

/// RGB color parsed from a hex string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Parses a hex color string like "#00b4d8" or "00b4d8".
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        Some(Self {
            r: u8::from_str_radix(&hex[0..2], 16).ok()?,
            g: u8::from_str_radix(&hex[2..4], 16).ok()?,
            b: u8::from_str_radix(&hex[4..6], 16).ok()?,
        })
    }
}

/// Renders the edge-highlight frame into the border layer.
pub struct BorderRenderer {
    visual: SpriteId,
    color: Color,
    thickness: i32,
    level: f32,
    width: i32,
    height: i32,
}

impl BorderRenderer {
    pub fn new(visual: SpriteId, color: Color, thickness: i32) -> Self {
        Self {
            visual,
            color,
            thickness: thickness.max(1),
            level: 0.0,
            width: 0,
            height: 0,
        }
    }

    pub fn visual(&self) -> SpriteId {
        self.visual
    }

    /// Resizes the frame to the overlay client area and redraws.
    pub fn resize(&mut self, compositor: &mut WinCompositor, width: i32, height: i32) {
        if self.width == width && self.height == height {
            return;
        }
        self.width = width;
        self.height = height;
        compositor.resize_sprite(self.visual, width, height);
        compositor.set_sprite_offset(self.visual, 0, 0);
        self.redraw(compositor);
    }

    /// Sets the highlight level in [0, 1] and redraws when it moved.
    pub fn set_level(&mut self, compositor: &mut WinCompositor, level: f32) {
        let level = level.clamp(0.0, 1.0);
        if (self.level - level).abs() < 1.0 / 512.0 {
            return;
        }
        self.level = level;
        self.redraw(compositor);
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    fn redraw(&self, compositor: &mut WinCompositor) {
        let Some((pixels, w, h)) = compositor.sprite_pixels_mut(self.visual) else {
            return;
        };
        if w <= 0 || h <= 0 {
            return;
        }

        let a = (self.level * 255.0).round() as u32;
        // Premultiplied frame pixel at the current level.
        let pixel = if a == 0 {
            0
        } else {
            (a << 24)
                | ((u32::from(self.color.r) * a / 255) << 16)
                | ((u32::from(self.color.g) * a / 255) << 8)
                | (u32::from(self.color.b) * a / 255)
        };

        let bw = self.thickness;
        for py in 0..h {
            for px in 0..w {
                let on_border = px < bw || px >= w - bw || py < bw || py >= h - bw;
                pixels[(py * w + px) as usize] = if on_border { pixel } else { 0 };
            }
        }
    }
}
