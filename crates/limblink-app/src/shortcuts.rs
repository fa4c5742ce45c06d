//! Keyboard shortcut table and dispatch.

/// Actions a keyboard shortcut can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    CycleGrid,
    FitView,
    HomeView,
    CancelDrag,
}

/// A keyboard shortcut definition.
#[derive(Debug, Clone, Copy)]
pub struct Shortcut {
    pub key: &'static str,
    pub action: ShortcutAction,
    pub description: &'static str,
}

/// All keyboard shortcuts, in the order they are logged at startup.
pub const SHORTCUTS: &[Shortcut] = &[
    Shortcut {
        key: "G",
        action: ShortcutAction::CycleGrid,
        description: "Cycle grid style",
    },
    Shortcut {
        key: "F",
        action: ShortcutAction::FitView,
        description: "Fit the rig in view",
    },
    Shortcut {
        key: "0",
        action: ShortcutAction::HomeView,
        description: "Reset view to 100%",
    },
    Shortcut {
        key: "Escape",
        action: ShortcutAction::CancelDrag,
        description: "Drop an in-flight drag",
    },
];

/// Resolve a pressed key to its action. Letter keys match either case.
pub fn resolve(key: &str) -> Option<ShortcutAction> {
    SHORTCUTS
        .iter()
        .find(|shortcut| shortcut.key.eq_ignore_ascii_case(key))
        .map(|shortcut| shortcut.action)
}
