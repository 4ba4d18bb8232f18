use std::mem;

use overglass_core::{OverlayResult, Rect};

use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    GetMonitorInfoW, MONITOR_DEFAULTTOPRIMARY, MONITORINFO, MonitorFromWindow,
};

/// Returns the work area of the primary monitor.
///
/// The work area excludes the taskbar and any docked toolbars. Used
/// to place the overlay before a target window is attached.
pub fn primary_work_area() -> OverlayResult<Rect> {
    // MonitorFromWindow with a null HWND and MONITOR_DEFAULTTOPRIMARY
    // returns the primary monitor handle.
    let monitor = unsafe { MonitorFromWindow(HWND::default(), MONITOR_DEFAULTTOPRIMARY) };

    let mut info = MONITORINFO {
        cbSize: mem::size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };

    // SAFETY: GetMonitorInfoW fills the MONITORINFO struct with
    // monitor dimensions. We set cbSize as required by the API.
    let success = unsafe { GetMonitorInfoW(monitor, &mut info) };

    if !success.as_bool() {
        return Err("failed to get monitor info".into());
    }

    let rc = info.rcWork;
    Ok(Rect::new(
        rc.left,
        rc.top,
        rc.right - rc.left,
        rc.bottom - rc.top,
    ))
}

/// Centers a `width`×`height` rectangle in the primary work area.
pub fn centered_rect(width: i32, height: i32) -> OverlayResult<Rect> {
    let area = primary_work_area()?;
    Ok(Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    ))
}
