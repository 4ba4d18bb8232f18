use overglass_core::Rect;

use windows::Win32::Foundation::{HWND, RECT};
use windows::Win32::UI::WindowsAndMessaging::{
    GWL_EXSTYLE, GetForegroundWindow, GetWindowLongPtrW, GetWindowRect, GetWindowTextLengthW,
    GetWindowTextW, GetWindowThreadProcessId, IsIconic, IsWindow, IsWindowVisible, WS_EX_TOPMOST,
};

/// A window on the Windows platform, wrapping a Win32 `HWND`.
///
/// `HWND` is an opaque handle, a number that identifies a window to
/// the OS. This struct holds that handle and queries the OS lazily.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    hwnd: HWND,
}

impl Window {
    /// Creates a new `Window` from a raw `HWND`.
    pub fn new(hwnd: HWND) -> Self {
        Self { hwnd }
    }

    /// Creates a new `Window` from a raw handle value (pointer-sized
    /// integer), so callers outside this crate never touch `HWND`.
    pub fn from_raw(handle: usize) -> Self {
        Self {
            hwnd: HWND(handle as *mut _),
        }
    }

    /// Returns the raw window handle.
    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }

    /// Returns the handle as a pointer-sized integer.
    pub fn raw(&self) -> usize {
        self.hwnd.0 as usize
    }

    /// Returns whether the handle still names a live window.
    pub fn is_alive(&self) -> bool {
        // SAFETY: IsWindow is a pure query on any handle value.
        unsafe { IsWindow(Some(self.hwnd)).as_bool() }
    }

    /// Returns the window title, empty for titleless or dead windows.
    pub fn title(&self) -> String {
        // SAFETY: GetWindowTextLengthW and GetWindowTextW read window
        // text without modifying state.
        unsafe {
            let length = GetWindowTextLengthW(self.hwnd);
            if length == 0 {
                return String::new();
            }

            // +1 for the null terminator that Windows requires
            let mut buffer = vec![0u16; (length + 1) as usize];
            let copied = GetWindowTextW(self.hwnd, &mut buffer);
            String::from_utf16_lossy(&buffer[..copied as usize])
        }
    }

    /// Returns the id of the process that owns this window.
    pub fn process_id(&self) -> u32 {
        let mut pid = 0u32;
        // SAFETY: GetWindowThreadProcessId writes the owning pid into
        // the provided out-pointer.
        unsafe { GetWindowThreadProcessId(self.hwnd, Some(&mut pid)) };
        pid
    }

    /// Returns the window rectangle in screen coordinates.
    pub fn rect(&self) -> Rect {
        let mut rc = RECT::default();
        // SAFETY: GetWindowRect fills the RECT for a valid HWND; on
        // failure the default zero rect is returned.
        unsafe {
            let _ = GetWindowRect(self.hwnd, &mut rc);
        }
        Rect::new(rc.left, rc.top, rc.right - rc.left, rc.bottom - rc.top)
    }

    /// Returns whether the window is visible.
    pub fn is_visible(&self) -> bool {
        // SAFETY: IsWindowVisible is a simple query returning a BOOL.
        unsafe { IsWindowVisible(self.hwnd).as_bool() }
    }

    /// Returns whether the window is minimized.
    pub fn is_minimized(&self) -> bool {
        // SAFETY: IsIconic is a simple query returning a BOOL.
        unsafe { IsIconic(self.hwnd).as_bool() }
    }

    /// Returns whether this window is the OS foreground window.
    pub fn has_focus(&self) -> bool {
        // SAFETY: GetForegroundWindow reads the current foreground
        // window handle.
        unsafe { GetForegroundWindow() == self.hwnd }
    }

    /// Returns whether the window carries the topmost extended style.
    pub fn is_topmost(&self) -> bool {
        // SAFETY: GetWindowLongPtrW reads the extended style bits.
        let ex_style = unsafe { GetWindowLongPtrW(self.hwnd, GWL_EXSTYLE) } as u32;
        (ex_style & WS_EX_TOPMOST.0) == WS_EX_TOPMOST.0
    }
}
