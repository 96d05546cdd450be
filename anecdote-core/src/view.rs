//! Presentation-side state and hooks.

/// Which screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Home,
    History,
}

impl View {
    /// Path reported with `page_view` events.
    pub fn path(&self) -> &'static str {
        match self {
            View::Home => "/home",
            View::History => "/history",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            View::Home => View::History,
            View::History => View::Home,
        }
    }
}

/// Best-effort presentation affordances requested by the controller.
///
/// Implementations must return promptly; the controller never waits on them.
pub trait ViewHooks: Send + Sync {
    /// Bring the freshly generated result into view.
    fn scroll_to_result(&self) {}

    /// Return to the top of the page.
    fn scroll_to_top(&self) {}
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopView;

impl ViewHooks for NoopView {}
