use std::sync::mpsc::Sender;

use overglass_core::config::{Action, Keybinding, Modifier};

use windows::Win32::UI::Input::KeyboardAndMouse::{
    HOT_KEY_MODIFIERS, MOD_ALT, MOD_CONTROL, MOD_NOREPEAT, MOD_SHIFT, MOD_WIN, RegisterHotKey,
    UnregisterHotKey,
};

/// A registered global hotkey.
struct Hotkey {
    id: i32,
    action: Action,
}

/// Manages global hotkey registrations.
///
/// Hotkeys are registered on the current thread's message queue.
/// `WM_HOTKEY` messages arrive via the message pump running on the
/// same thread.
pub struct HotkeyManager {
    hotkeys: Vec<Hotkey>,
    sender: Sender<Action>,
}

impl HotkeyManager {
    /// Creates a new hotkey manager.
    ///
    /// Actions triggered by hotkeys are sent through `sender`.
    pub fn new(sender: Sender<Action>) -> Self {
        Self {
            hotkeys: Vec::new(),
            sender,
        }
    }

    /// Registers keybindings from configuration.
    ///
    /// Each keybinding's key name is resolved to a virtual key code
    /// and its modifiers are converted to Win32 flags. Invalid key
    /// names are logged and skipped.
    pub fn register_from_config(&mut self, bindings: &[Keybinding]) {
        for (i, binding) in bindings.iter().enumerate() {
            let id = (i + 1) as i32;

            let Some(vk) = vk_from_name(&binding.key) else {
                eprintln!("Unknown key name: {:?}", binding.key);
                continue;
            };

            let mut modifiers = MOD_NOREPEAT;
            for m in &binding.modifiers {
                modifiers |= modifier_to_flag(*m);
            }

            self.register(id, modifiers, vk, binding.action);
        }
    }

    /// Dispatches a `WM_HOTKEY` message by hotkey ID.
    ///
    /// Called from the message pump when a `WM_HOTKEY` message arrives.
    pub fn dispatch(&self, hotkey_id: i32) {
        if let Some(hotkey) = self.hotkeys.iter().find(|h| h.id == hotkey_id) {
            let _ = self.sender.send(hotkey.action);
        }
    }

    /// Registers a single hotkey.
    fn register(&mut self, id: i32, modifiers: HOT_KEY_MODIFIERS, vk: u32, action: Action) {
        // SAFETY: RegisterHotKey registers a system-wide hotkey on the
        // current thread's message queue. We use unique IDs to avoid
        // collisions.
        let result = unsafe { RegisterHotKey(None, id, modifiers, vk) };

        if result.is_err() {
            eprintln!("Failed to register hotkey {id} (vk=0x{vk:02X})");
            return;
        }

        self.hotkeys.push(Hotkey { id, action });
    }
}

impl Drop for HotkeyManager {
    fn drop(&mut self) {
        for hotkey in &self.hotkeys {
            // SAFETY: UnregisterHotKey removes the hotkey registration.
            unsafe {
                let _ = UnregisterHotKey(None, hotkey.id);
            }
        }
    }
}

/// Converts a platform-agnostic modifier to a Win32 hotkey flag.
fn modifier_to_flag(modifier: Modifier) -> HOT_KEY_MODIFIERS {
    match modifier {
        Modifier::Alt => MOD_ALT,
        Modifier::Shift => MOD_SHIFT,
        Modifier::Ctrl => MOD_CONTROL,
        Modifier::Win => MOD_WIN,
    }
}

/// Resolves a key name to a Win32 virtual key code.
///
/// Letters and digits map to their ASCII codes, `F1`..`F24` to the
/// function-key range, plus a handful of named keys. Computed rather
/// than tabulated; the hotkey surface here is small.
fn vk_from_name(name: &str) -> Option<u32> {
    let upper = name.to_ascii_uppercase();

    if upper.len() == 1 {
        let c = upper.bytes().next()?;
        if c.is_ascii_uppercase() || c.is_ascii_digit() {
            return Some(u32::from(c));
        }
        return None;
    }

    if let Some(n) = upper.strip_prefix('F')
        && let Ok(n) = n.parse::<u32>()
        && (1..=24).contains(&n)
    {
        return Some(0x70 + n - 1); // VK_F1 = 0x70
    }

    match upper.as_str() {
        "SPACE" => Some(0x20),
        "ENTER" | "RETURN" => Some(0x0D),
        "TAB" => Some(0x09),
        "ESCAPE" | "ESC" => Some(0x1B),
        "HOME" => Some(0x24),
        "END" => Some(0x23),
        "PAGEUP" => Some(0x21),
        "PAGEDOWN" => Some(0x22),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_resolve_to_virtual_keys() {
        assert_eq!(vk_from_name("B"), Some(u32::from(b'B')));
        assert_eq!(vk_from_name("b"), Some(u32::from(b'B')));
        assert_eq!(vk_from_name("7"), Some(u32::from(b'7')));
        assert_eq!(vk_from_name("F1"), Some(0x70));
        assert_eq!(vk_from_name("F12"), Some(0x7B));
        assert_eq!(vk_from_name("Space"), Some(0x20));
        assert_eq!(vk_from_name("escape"), Some(0x1B));
    }

    #[test]
    fn unknown_key_names_are_rejected() {
        assert_eq!(vk_from_name("F25"), None);
        assert_eq!(vk_from_name("?"), None);
        assert_eq!(vk_from_name("NOSUCH"), None);
    }
}
