//! Content presentation layer.
//!
//! This is the seam the embedded rendering engine paints through: it
//! delivers premultiplied BGRA frames sized to the overlay client
//! area, and mirrors the overlay's bounds and visibility. While the
//! overlay is hidden, frames are dropped (paint suppression) so a
//! backgrounded engine costs nothing here.

use overglass_core::log_trace;

use crate::compose::{SpriteId, WinCompositor};

/// Hosts externally rendered content in the content layer.
pub struct ContentHost {
    visual: SpriteId,
    width: i32,
    height: i32,
    suppressed: bool,
}

impl ContentHost {
    pub fn new(visual: SpriteId) -> Self {
        Self {
            visual,
            width: 0,
            height: 0,
            suppressed: true,
        }
    }

    pub fn visual(&self) -> SpriteId {
        self.visual
    }

    /// Viewport size the embedder must mirror.
    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Resizes the content sprite to the overlay client area. The
    /// previous frame is discarded; the embedder repaints at the new
    /// size.
    pub fn resize(&mut self, compositor: &mut WinCompositor, width: i32, height: i32) {
        if self.width == width && self.height == height {
            return;
        }
        self.width = width;
        self.height = height;
        compositor.resize_sprite(self.visual, width, height);
        compositor.set_sprite_offset(self.visual, 0, 0);
    }

    /// Starts or stops dropping incoming frames.
    pub fn set_suppressed(&mut self, suppressed: bool) {
        self.suppressed = suppressed;
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Accepts one premultiplied BGRA frame from the embedder.
    ///
    /// Frames are dropped while suppressed or when the size doesn't
    /// match the current viewport (the embedder is mid-resize).
    pub fn present_frame(&mut self, compositor: &mut WinCompositor, frame: &[u8], width: i32, height: i32) {
        if self.suppressed {
            log_trace!("content frame dropped: presentation suppressed");
            return;
        }
        if width != self.width || height != self.height {
            log_trace!("content frame dropped: {width}x{height} != viewport");
            return;
        }
        let expected = (width.max(0) as usize) * (height.max(0) as usize) * 4;
        if frame.len() < expected {
            return;
        }

        let Some((pixels, w, h)) = compositor.sprite_pixels_mut(self.visual) else {
            return;
        };
        if w != width || h != height {
            return;
        }
        for (dst, src) in pixels.iter_mut().zip(frame.chunks_exact(4)) {
            *dst = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
        }
    }
}
