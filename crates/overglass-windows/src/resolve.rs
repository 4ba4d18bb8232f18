//! Win32 target resolution.
//!
//! Implements the core [`ProcessResolver`] seam. Resolution order:
//! exact window-title match, substring title match via full window
//! enumeration, then, when a process name is given and no window
//! matched, a process-list scan by image name followed by a second
//! window-enumeration pass filtered by the resolved pid.

use overglass_core::process::{ProcessInfo, ProcessResolver, ProcessState};

use windows::Win32::Foundation::{CloseHandle, HWND, LPARAM};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_NAME_FORMAT, PROCESS_QUERY_LIMITED_INFORMATION, QueryFullProcessImageNameW,
};
use windows::Win32::UI::WindowsAndMessaging::{EnumWindows, FindWindowW};
use windows::core::{BOOL, PCWSTR, PWSTR};

use crate::window::Window;

/// Resolves targets against the live Win32 window and process lists.
pub struct Win32Resolver;

impl ProcessResolver for Win32Resolver {
    fn resolve(&mut self, name_pattern: &str, title_pattern: &str) -> ProcessInfo {
        resolve(name_pattern, title_pattern)
    }

    fn window_has_focus(&self, window: usize) -> bool {
        window != 0 && Window::from_raw(window).has_focus()
    }
}

fn resolve(name_pattern: &str, title_pattern: &str) -> ProcessInfo {
    let mut info = ProcessInfo::not_found(name_pattern, title_pattern);

    // Title passes: exact match first, substring enumeration second.
    let mut window = None;
    if !title_pattern.is_empty() {
        window = find_window_exact(title_pattern).or_else(|| find_window_substring(title_pattern));
    }

    if let Some(hwnd) = window {
        fill_from_window(&mut info, Window::new(hwnd), name_pattern.is_empty());
        return info;
    }

    // No window matched: fall back to the process list by image name,
    // then look for any visible window the process owns.
    if !name_pattern.is_empty()
        && let Some(pid) = process_id_by_name(name_pattern)
    {
        info.process_id = pid;
        info.state = ProcessState::Running;

        if let Some(hwnd) = find_window_for_pid(pid) {
            let win = Window::new(hwnd);
            info.window = win.raw();
            info.title = win.title();
            info.has_focus = win.has_focus();
            info.is_minimized = win.is_minimized();
            info.bounds = win.rect();
        }
    }

    info
}

fn fill_from_window(info: &mut ProcessInfo, win: Window, resolve_name: bool) {
    info.window = win.raw();
    info.process_id = win.process_id();
    info.title = win.title();
    info.has_focus = win.has_focus();
    info.is_minimized = win.is_minimized();
    info.bounds = win.rect();
    info.state = ProcessState::Running;

    if resolve_name && info.process_id != 0 {
        if let Some(name) = image_name(info.process_id) {
            info.name = name;
        }
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Exact title match via `FindWindowW`.
fn find_window_exact(title: &str) -> Option<HWND> {
    let wide = to_wide(title);
    // SAFETY: FindWindowW reads the null-terminated title string.
    unsafe { FindWindowW(PCWSTR::null(), PCWSTR(wide.as_ptr())).ok() }
}

/// State carried through the `EnumWindows` callbacks via `LPARAM`.
struct EnumSearch {
    needle: String,
    pid: u32,
    result: Option<HWND>,
}

/// Substring title match over all visible top-level windows.
fn find_window_substring(needle: &str) -> Option<HWND> {
    let mut search = EnumSearch {
        needle: needle.to_string(),
        pid: 0,
        result: None,
    };

    // SAFETY: EnumWindows runs the callback synchronously; the LPARAM
    // is a pointer to `search`, which outlives the call. Enumeration
    // stops early on a match, which EnumWindows reports as an error we
    // deliberately ignore.
    unsafe {
        let _ = EnumWindows(
            Some(enum_title_callback),
            LPARAM(&mut search as *mut _ as isize),
        );
    }

    search.result
}

/// Callback for the substring title pass.
unsafe extern "system" fn enum_title_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
    // SAFETY: lparam is the pointer passed by find_window_substring.
    let search = unsafe { &mut *(lparam.0 as *mut EnumSearch) };

    let win = Window::new(hwnd);
    if win.is_visible() && win.title().contains(&search.needle) {
        search.result = Some(hwnd);
        return BOOL(0); // stop enumerating
    }
    BOOL(1)
}

/// First visible window owned by the given process.
fn find_window_for_pid(pid: u32) -> Option<HWND> {
    let mut search = EnumSearch {
        needle: String::new(),
        pid,
        result: None,
    };

    // SAFETY: as in find_window_substring.
    unsafe {
        let _ = EnumWindows(
            Some(enum_pid_callback),
            LPARAM(&mut search as *mut _ as isize),
        );
    }

    search.result
}

/// Callback for the pid-filtered pass.
unsafe extern "system" fn enum_pid_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
    // SAFETY: lparam is the pointer passed by find_window_for_pid.
    let search = unsafe { &mut *(lparam.0 as *mut EnumSearch) };

    let win = Window::new(hwnd);
    if win.process_id() == search.pid && win.is_visible() {
        search.result = Some(hwnd);
        return BOOL(0);
    }
    BOOL(1)
}

/// Scans the process list for an image name, case-insensitively.
fn process_id_by_name(name: &str) -> Option<u32> {
    // SAFETY: the snapshot handle is closed before returning on every
    // path; Process32FirstW/NextW fill the entry whose dwSize we set.
    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0).ok()?;

        let mut entry = PROCESSENTRY32W {
            dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };

        let mut found = None;
        if Process32FirstW(snapshot, &mut entry).is_ok() {
            loop {
                let len = entry
                    .szExeFile
                    .iter()
                    .position(|&c| c == 0)
                    .unwrap_or(entry.szExeFile.len());
                let exe = String::from_utf16_lossy(&entry.szExeFile[..len]);
                if exe.eq_ignore_ascii_case(name) {
                    found = Some(entry.th32ProcessID);
                    break;
                }
                if Process32NextW(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }

        let _ = CloseHandle(snapshot);
        found
    }
}

/// Image file name (without path) for a pid.
fn image_name(pid: u32) -> Option<String> {
    // SAFETY: the process handle is opened with the least privilege
    // that allows the query and closed before returning.
    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;

        let mut buffer = vec![0u16; 512];
        let mut size = buffer.len() as u32;
        let ok = QueryFullProcessImageNameW(
            handle,
            PROCESS_NAME_FORMAT(0),
            PWSTR(buffer.as_mut_ptr()),
            &mut size,
        )
        .is_ok();
        let _ = CloseHandle(handle);

        if !ok {
            return None;
        }
        let path = String::from_utf16_lossy(&buffer[..size as usize]);
        Some(path.rsplit('\\').next().unwrap_or(&path).to_string())
    }
}
