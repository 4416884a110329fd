use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::VariantNames;
use tracing::{debug, trace};

use crate::common::config::FocusSettings;
use crate::layout_engine::WindowManager;
use crate::model::window::ContentId;
use crate::sys::keys::Key;

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::VariantNames,
)]
#[serde(rename_all = "snake_case")]
pub enum ShortcutCommand {
    Maximize,
    Restore,
    FitToSquare,
    /// Needs a double press within the configured window.
    CloseAll,
    PanLeft,
    PanRight,
    PanUp,
    PanDown,
}

static BUILTIN_SHORTCUT_VARIANTS: Lazy<Vec<String>> = Lazy::new(|| {
    ShortcutCommand::VARIANTS
        .iter()
        .map(|v| {
            let mut out = String::with_capacity(v.len());
            for (i, ch) in v.chars().enumerate() {
                if ch.is_uppercase() {
                    if i != 0 {
                        out.push('_');
                    }
                    for lc in ch.to_lowercase() {
                        out.push(lc);
                    }
                } else {
                    out.push(ch);
                }
            }
            out
        })
        .collect()
});

impl ShortcutCommand {
    pub fn builtin_candidates() -> &'static [String] { &BUILTIN_SHORTCUT_VARIANTS }
}

/// A shortcut resolved against the focused window.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortcutAction {
    pub window: ContentId,
    pub command: ShortcutCommand,
}

pub struct FocusController {
    focused: Option<ContentId>,
    bindings: Vec<(Key, ShortcutCommand)>,
    double_press: Duration,
    last_close_all_press: Option<(Key, Instant)>,
}

impl FocusController {
    pub fn new(settings: &FocusSettings, bindings: &[(Key, ShortcutCommand)]) -> Self {
        FocusController {
            focused: None,
            bindings: bindings.to_vec(),
            double_press: settings.escape_double_press,
            last_close_all_press: None,
        }
    }

    pub fn focused(&self) -> Option<&ContentId> { self.focused.as_ref() }

    pub fn focus(&mut self, id: &ContentId) {
        if self.focused.as_ref() != Some(id) {
            trace!(%id, "window focused");
            self.focused = Some(id.clone());
        }
    }

    pub fn on_window_closed(&mut self, id: &ContentId, wm: &mut WindowManager) {
        if self.focused.as_ref() == Some(id) {
            self.focused = None;
            debug!(%id, "focused window closed, focusing host canvas");
            wm.focus_host();
        }
    }

    /// Resolves a key press. Shortcuts only apply to a focused, unlocked
    /// window; close-all additionally needs a second press in time.
    pub fn on_key(&mut self, key: Key, now: Instant, wm: &WindowManager) -> Option<ShortcutAction> {
        let command = self.bindings.iter().find(|(k, _)| *k == key).map(|(_, cmd)| *cmd)?;
        let Some(id) = self.focused.clone() else {
            trace!(%key, "shortcut without a focused window");
            return None;
        };
        match wm.window(&id) {
            None => {
                self.focused = None;
                return None;
            }
            Some(window) if window.locked => {
                trace!(%id, %key, "shortcut ignored on locked window");
                return None;
            }
            Some(_) => {}
        }

        if command == ShortcutCommand::CloseAll {
            let repeated = self
                .last_close_all_press
                .is_some_and(|(prev, at)| prev == key && now.duration_since(at) <= self.double_press);
            if !repeated {
                self.last_close_all_press = Some((key, now));
                return None;
            }
            self.last_close_all_press = None;
        }
        Some(ShortcutAction { window: id, command })
    }
}
