//! The overlay window and its layer stack.
//!
//! [`OverlayWindow`] owns the layered, topmost, non-activating popup
//! `HWND`. [`OverlayStack`] couples it with the compositor and the
//! renderers and implements the core [`OverlaySurface`] seam the
//! controller drives. The window procedure is `DefWindowProcW` only:
//! border highlighting and alignment are polled on the host tick, so
//! no per-window state ever rides on the wndproc.

use std::sync::Once;

use overglass_core::compositor::LayerKind;
use overglass_core::overlay::OverlaySurface;
use overglass_core::{OverlayResult, Rect, ZOrderManager};

use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    CW_USEDEFAULT, CreateWindowExW, DefWindowProcW, DestroyWindow, GWL_EXSTYLE, GetWindowLongPtrW,
    RegisterClassW, SW_HIDE, SW_SHOWNOACTIVATE, SWP_FRAMECHANGED, SWP_NOACTIVATE, SWP_NOMOVE,
    SWP_NOSIZE, SWP_NOZORDER, SetWindowLongPtrW, SetWindowPos, ShowWindow, WNDCLASSW, WS_EX_LAYERED,
    WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
};
use windows::core::w;

use crate::border::{BorderRenderer, Color};
use crate::compose::WinCompositor;
use crate::content::ContentHost;

static REGISTER_CLASS: Once = Once::new();

fn ensure_class_registered() {
    REGISTER_CLASS.call_once(|| {
        let wc = WNDCLASSW {
            lpfnWndProc: Some(overlay_wnd_proc),
            lpszClassName: w!("OverglassOverlay"),
            ..Default::default()
        };
        unsafe {
            RegisterClassW(&wc);
        }
    });
}

unsafe extern "system" fn overlay_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

/// The overlay's platform window.
///
/// Layered for per-pixel composition, topmost so it stays above the
/// target, non-activating so it can never steal OS focus from the
/// game, and a tool window so it stays out of the taskbar.
pub struct OverlayWindow {
    hwnd: HWND,
}

impl OverlayWindow {
    /// Creates the window hidden at the given size.
    pub fn new(width: i32, height: i32) -> OverlayResult<Self> {
        ensure_class_registered();

        let ex = WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_NOACTIVATE | WS_EX_TOOLWINDOW;
        // SAFETY: CreateWindowExW with a registered class; no parent,
        // menu, or instance data needed. The window starts hidden
        // (no WS_VISIBLE).
        let hwnd = unsafe {
            CreateWindowExW(
                ex,
                w!("OverglassOverlay"),
                w!("Overglass"),
                WS_POPUP,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                width,
                height,
                None,
                None,
                None,
                None,
            )?
        };

        Ok(Self { hwnd })
    }

    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }

    pub fn raw(&self) -> usize {
        self.hwnd.0 as usize
    }

    /// Shows the window without activating it.
    pub fn show(&self) {
        // SAFETY: ShowWindow with SW_SHOWNOACTIVATE keeps focus where
        // it is.
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_SHOWNOACTIVATE);
        }
    }

    /// Hides the window without destroying it.
    pub fn hide(&self) {
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_HIDE);
        }
    }

    /// Moves and resizes the window.
    pub fn set_position(&self, bounds: Rect) -> OverlayResult<()> {
        // SAFETY: SetWindowPos with a valid HWND; z-order untouched,
        // no activation.
        unsafe {
            SetWindowPos(
                self.hwnd,
                None,
                bounds.x,
                bounds.y,
                bounds.width,
                bounds.height,
                SWP_NOACTIVATE | SWP_NOZORDER,
            )?;
        }
        Ok(())
    }

    /// Adds or removes the click-through extended style.
    pub fn set_click_through(&self, enabled: bool) -> OverlayResult<()> {
        // SAFETY: read-modify-write of the extended style bits, then a
        // frame-changed SetWindowPos so the style takes effect.
        unsafe {
            let mut ex_style = GetWindowLongPtrW(self.hwnd, GWL_EXSTYLE) as u32;
            if enabled {
                ex_style |= WS_EX_TRANSPARENT.0;
            } else {
                ex_style &= !WS_EX_TRANSPARENT.0;
            }
            SetWindowLongPtrW(self.hwnd, GWL_EXSTYLE, ex_style as isize);

            SetWindowPos(
                self.hwnd,
                None,
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER | SWP_FRAMECHANGED,
            )?;
        }
        Ok(())
    }
}

impl Drop for OverlayWindow {
    fn drop(&mut self) {
        unsafe {
            let _ = DestroyWindow(self.hwnd);
        }
    }
}

/// Layer names used by the stack.
const CONTENT_LAYER: &str = "content";
const BORDER_LAYER: &str = "border";

/// The overlay window plus its composited layer stack.
pub struct OverlayStack {
    window: OverlayWindow,
    compositor: ZOrderManager<WinCompositor>,
    border: BorderRenderer,
    content: ContentHost,
}

impl OverlayStack {
    /// Creates the hidden overlay window with content and border
    /// layers registered.
    pub fn new(width: i32, height: i32, border_color: Color, border_width: i32) -> OverlayResult<Self> {
        let window = OverlayWindow::new(width, height)?;
        let mut compositor = ZOrderManager::new(WinCompositor::new(window.hwnd()));

        compositor.create_layer(CONTENT_LAYER, LayerKind::Content, 0)?;
        compositor.create_layer(BORDER_LAYER, LayerKind::Border, 0)?;
        let content_visual = compositor
            .visual(CONTENT_LAYER)
            .copied()
            .ok_or("content layer missing after creation")?;
        let border_visual = compositor
            .visual(BORDER_LAYER)
            .copied()
            .ok_or("border layer missing after creation")?;

        Ok(Self {
            window,
            compositor,
            border: BorderRenderer::new(border_visual, border_color, border_width),
            content: ContentHost::new(content_visual),
        })
    }

    /// The scene graph, for callers adding further layers.
    pub fn compositor_mut(&mut self) -> &mut ZOrderManager<WinCompositor> {
        &mut self.compositor
    }

    /// Viewport size the embedded content must mirror.
    pub fn content_size(&self) -> (i32, i32) {
        self.content.size()
    }

    /// Accepts one externally rendered BGRA frame.
    pub fn present_content_frame(&mut self, frame: &[u8], width: i32, height: i32) {
        self.content
            .present_frame(self.compositor.backend_mut(), frame, width, height);
    }

    /// Rebuilds (if needed) and publishes pending composition changes.
    pub fn commit(&mut self) -> OverlayResult<()> {
        self.compositor.commit()
    }
}

impl OverlaySurface for OverlayStack {
    fn move_resize(&mut self, bounds: Rect) -> OverlayResult<()> {
        self.window.set_position(bounds)?;
        self.compositor.backend_mut().set_bounds(bounds);
        self.border
            .resize(self.compositor.backend_mut(), bounds.width, bounds.height);
        self.content
            .resize(self.compositor.backend_mut(), bounds.width, bounds.height);
        self.compositor.commit()
    }

    fn set_click_through(&mut self, enabled: bool) -> OverlayResult<()> {
        self.window.set_click_through(enabled)
    }

    fn set_opacity(&mut self, opacity: f32) -> OverlayResult<()> {
        self.compositor.backend_mut().set_global_opacity(opacity);
        self.compositor.commit()
    }

    fn set_border_level(&mut self, level: f32) -> OverlayResult<()> {
        self.border.set_level(self.compositor.backend_mut(), level);
        self.compositor.commit()
    }

    fn show(&mut self) -> OverlayResult<()> {
        self.window.show();
        self.content.set_suppressed(false);
        self.compositor.commit()
    }

    fn hide(&mut self) -> OverlayResult<()> {
        self.window.hide();
        self.content.set_suppressed(true);
        Ok(())
    }

    fn handle(&self) -> usize {
        self.window.raw()
    }
}
