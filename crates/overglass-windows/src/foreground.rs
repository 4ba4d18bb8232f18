use overglass_core::Point;
use overglass_core::focus::ForegroundSource;

use windows::Win32::Foundation::POINT;
use windows::Win32::UI::WindowsAndMessaging::{GetCursorPos, GetForegroundWindow};

use crate::window::Window;

/// [`ForegroundSource`] over the live Win32 foreground window.
pub struct Win32Foreground;

impl Win32Foreground {
    /// Current cursor position in screen coordinates.
    pub fn cursor_position() -> Option<Point> {
        let mut pt = POINT::default();
        // SAFETY: GetCursorPos fills the POINT out-parameter.
        if unsafe { GetCursorPos(&mut pt) }.is_ok() {
            Some(Point::new(pt.x, pt.y))
        } else {
            None
        }
    }
}

impl ForegroundSource for Win32Foreground {
    fn foreground_window(&self) -> usize {
        // SAFETY: GetForegroundWindow reads the current foreground
        // handle; it may be null when no window has focus.
        let hwnd = unsafe { GetForegroundWindow() };
        hwnd.0 as usize
    }

    fn window_info(&self, window: usize) -> Option<(String, u32)> {
        if window == 0 {
            return None;
        }
        let win = Window::from_raw(window);
        if !win.is_alive() {
            return None;
        }
        Some((win.title(), win.process_id()))
    }
}
