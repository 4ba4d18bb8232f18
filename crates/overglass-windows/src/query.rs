use overglass_core::window_state::{WindowQuery, WindowState, WindowStateInfo};

use windows::Win32::UI::WindowsAndMessaging::{
    GetWindowPlacement, SW_SHOWMAXIMIZED, SW_SHOWMINIMIZED, WINDOWPLACEMENT,
};

use crate::window::Window;

/// [`WindowQuery`] over live Win32 window state.
pub struct Win32WindowQuery;

impl WindowQuery for Win32WindowQuery {
    fn query(&self, handle: usize) -> WindowStateInfo {
        let win = Window::from_raw(handle);
        if handle == 0 || !win.is_alive() {
            return WindowStateInfo::invalid(handle);
        }

        let mut placement = WINDOWPLACEMENT {
            length: std::mem::size_of::<WINDOWPLACEMENT>() as u32,
            ..Default::default()
        };
        // SAFETY: GetWindowPlacement fills the struct whose length we
        // set, as the API requires.
        unsafe {
            let _ = GetWindowPlacement(win.hwnd(), &mut placement);
        }

        let state = if !win.is_visible() {
            WindowState::Hidden
        } else if placement.showCmd == SW_SHOWMINIMIZED.0 as u32 {
            WindowState::Minimized
        } else if placement.showCmd == SW_SHOWMAXIMIZED.0 as u32 {
            WindowState::Maximized
        } else {
            WindowState::Normal
        };

        WindowStateInfo {
            handle,
            title: win.title(),
            state,
            bounds: win.rect(),
            has_focus: win.has_focus(),
            process_id: win.process_id(),
            is_topmost: win.is_topmost(),
        }
    }
}
