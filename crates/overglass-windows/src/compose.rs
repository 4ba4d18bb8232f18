//! Software composition backend for the layered overlay window.
//!
//! Each layer owns a premultiplied-BGRA sprite. A commit composites
//! the visible sprites bottom-to-top into one top-down DIB and
//! publishes it atomically with `UpdateLayeredWindow`; whole-overlay
//! opacity rides on `SourceConstantAlpha`, so per-layer content never
//! has to be re-rendered for a fade.

use std::mem;

use overglass_core::compositor::Compose;
use overglass_core::{OverlayResult, Rect};

use windows::Win32::Foundation::{COLORREF, HWND, POINT, SIZE};
use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BLENDFUNCTION, CreateCompatibleDC, CreateDIBSection,
    DIB_RGB_COLORS, DeleteDC, DeleteObject, GetDC, ReleaseDC, SelectObject,
};
use windows::Win32::UI::WindowsAndMessaging::{ULW_ALPHA, UpdateLayeredWindow};

/// Backend handle for one layer's pixels.
pub type SpriteId = usize;

struct Sprite {
    /// Premultiplied ARGB pixels, top-down rows. Empty = draws nothing.
    pixels: Vec<u32>,
    width: i32,
    height: i32,
    /// Position within the overlay client area.
    offset_x: i32,
    offset_y: i32,
}

impl Sprite {
    fn empty() -> Self {
        Self {
            pixels: Vec::new(),
            width: 0,
            height: 0,
            offset_x: 0,
            offset_y: 0,
        }
    }
}

/// Composites layer sprites into the layered overlay window.
pub struct WinCompositor {
    hwnd: HWND,
    bounds: Rect,
    sprites: Vec<Sprite>,
    order: Vec<SpriteId>,
    global_alpha: f32,
    /// Set by any mutation; cleared by a successful present.
    pending: bool,
}

impl WinCompositor {
    pub fn new(hwnd: HWND) -> Self {
        Self {
            hwnd,
            bounds: Rect::default(),
            sprites: Vec::new(),
            order: Vec::new(),
            global_alpha: 1.0,
            pending: false,
        }
    }

    /// Overlay bounds in screen coordinates; sprite space is the
    /// client area of this rectangle.
    pub fn set_bounds(&mut self, bounds: Rect) {
        if self.bounds != bounds {
            self.bounds = bounds;
            self.pending = true;
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Whole-overlay opacity multiplier in [0, 1].
    pub fn set_global_opacity(&mut self, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        if (self.global_alpha - opacity).abs() > f32::EPSILON {
            self.global_alpha = opacity;
            self.pending = true;
        }
    }

    /// Reallocates a sprite's pixel store (cleared to transparent).
    pub fn resize_sprite(&mut self, id: SpriteId, width: i32, height: i32) {
        let Some(sprite) = self.sprites.get_mut(id) else {
            return;
        };
        let len = (width.max(0) * height.max(0)) as usize;
        sprite.pixels = vec![0u32; len];
        sprite.width = width.max(0);
        sprite.height = height.max(0);
        self.pending = true;
    }

    /// Positions a sprite within the overlay client area.
    pub fn set_sprite_offset(&mut self, id: SpriteId, x: i32, y: i32) {
        let Some(sprite) = self.sprites.get_mut(id) else {
            return;
        };
        if sprite.offset_x != x || sprite.offset_y != y {
            sprite.offset_x = x;
            sprite.offset_y = y;
            self.pending = true;
        }
    }

    /// Mutable access to a sprite's pixels for a renderer to draw
    /// into. Marks the composition pending.
    pub fn sprite_pixels_mut(&mut self, id: SpriteId) -> Option<(&mut [u32], i32, i32)> {
        let sprite = self.sprites.get_mut(id)?;
        self.pending = true;
        Some((&mut sprite.pixels, sprite.width, sprite.height))
    }

    /// Composites the ordered sprites over a transparent canvas.
    fn composite(&self, width: i32, height: i32) -> Vec<u32> {
        let mut canvas = vec![0u32; (width * height) as usize];

        for &id in &self.order {
            let Some(sprite) = self.sprites.get(id) else {
                continue;
            };
            blend_sprite(&mut canvas, width, height, sprite);
        }
        canvas
    }

    /// Publishes the composited canvas via `UpdateLayeredWindow`.
    fn present(&mut self) -> OverlayResult<()> {
        let (w, h) = (self.bounds.width, self.bounds.height);
        if w <= 0 || h <= 0 {
            self.pending = false;
            return Ok(());
        }

        let canvas = self.composite(w, h);

        // SAFETY: classic UpdateLayeredWindow sequence: screen DC,
        // memory DC, top-down 32-bit DIB. Every resource acquired here
        // is released on each exit path, in reverse order.
        unsafe {
            let screen_dc = GetDC(None);
            let mem_dc = CreateCompatibleDC(Some(screen_dc));

            let bmi = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: w,
                    biHeight: -h, // top-down
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };

            let mut bits = std::ptr::null_mut();
            let Ok(bmp) = CreateDIBSection(Some(mem_dc), &bmi, DIB_RGB_COLORS, &mut bits, None, 0)
            else {
                let _ = DeleteDC(mem_dc);
                let _ = ReleaseDC(None, screen_dc);
                return Err("failed to create composition bitmap".into());
            };
            if bits.is_null() {
                let _ = DeleteObject(bmp.into());
                let _ = DeleteDC(mem_dc);
                let _ = ReleaseDC(None, screen_dc);
                return Err("composition bitmap has no pixel store".into());
            }

            let old = SelectObject(mem_dc, bmp.into());

            // SAFETY: `bits` points to `w * h` 32-bit pixels allocated
            // by CreateDIBSection, matching `canvas` exactly.
            let dst = std::slice::from_raw_parts_mut(bits as *mut u32, (w * h) as usize);
            dst.copy_from_slice(&canvas);

            let pt_dst = POINT {
                x: self.bounds.x,
                y: self.bounds.y,
            };
            let size = SIZE { cx: w, cy: h };
            let pt_src = POINT::default();
            let blend = BLENDFUNCTION {
                BlendOp: 0, // AC_SRC_OVER
                SourceConstantAlpha: (self.global_alpha * 255.0).round() as u8,
                AlphaFormat: 1, // AC_SRC_ALPHA
                ..Default::default()
            };

            let result = UpdateLayeredWindow(
                self.hwnd,
                Some(screen_dc),
                Some(&pt_dst),
                Some(&size),
                Some(mem_dc),
                Some(&pt_src),
                COLORREF(0),
                Some(&blend),
                ULW_ALPHA,
            );

            SelectObject(mem_dc, old);
            let _ = DeleteObject(bmp.into());
            let _ = DeleteDC(mem_dc);
            let _ = ReleaseDC(None, screen_dc);

            result?;
        }

        self.pending = false;
        Ok(())
    }
}

impl Compose for WinCompositor {
    type Visual = SpriteId;

    fn create_visual(&mut self) -> OverlayResult<SpriteId> {
        self.sprites.push(Sprite::empty());
        Ok(self.sprites.len() - 1)
    }

    fn restack(&mut self, order: &[&SpriteId]) -> OverlayResult<()> {
        self.order = order.iter().map(|id| **id).collect();
        self.pending = true;
        Ok(())
    }

    fn commit(&mut self) -> OverlayResult<()> {
        if !self.pending {
            return Ok(());
        }
        self.present()
    }
}

/// Premultiplied source-over blend of one sprite onto the canvas.
fn blend_sprite(canvas: &mut [u32], canvas_w: i32, canvas_h: i32, sprite: &Sprite) {
    for sy in 0..sprite.height {
        let cy = sy + sprite.offset_y;
        if cy < 0 || cy >= canvas_h {
            continue;
        }
        for sx in 0..sprite.width {
            let cx = sx + sprite.offset_x;
            if cx < 0 || cx >= canvas_w {
                continue;
            }
            let src = sprite.pixels[(sy * sprite.width + sx) as usize];
            if src == 0 {
                continue;
            }
            let dst = &mut canvas[(cy * canvas_w + cx) as usize];
            *dst = blend_over(src, *dst);
        }
    }
}

/// `src` over `dst`, both premultiplied ARGB.
fn blend_over(src: u32, dst: u32) -> u32 {
    let sa = src >> 24;
    if sa == 0xFF {
        return src;
    }
    let inv = 255 - sa;
    let blend_channel = |shift: u32| -> u32 {
        let s = (src >> shift) & 0xFF;
        let d = (dst >> shift) & 0xFF;
        ((s + (d * inv + 127) / 255) & 0xFF) << shift
    };
    blend_channel(24) | blend_channel(16) | blend_channel(8) | blend_channel(0)
}
