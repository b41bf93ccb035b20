//! Session-scoped UI selection state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Navigation tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Tab {
    /// The signed-in user's own trips
    Routes,
    #[default]
    Home,
    Friends,
}

impl Tab {
    /// Tabs other than `Home` need a signed-in user.
    pub fn requires_session(self) -> bool {
        !matches!(self, Tab::Home)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tab::Routes => "routes",
            Tab::Home => "home",
            Tab::Friends => "friends",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "routes" => Ok(Tab::Routes),
            "home" => Ok(Tab::Home),
            "friends" => Ok(Tab::Friends),
            other => Err(format!("unknown tab: {}", other)),
        }
    }
}

/// UI flags owned by the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub active_tab: Tab,
    /// Contact handle typed into the login dialog
    pub contact_handle: String,
    pub show_login_modal: bool,
    pub login_help_open: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            active_tab: Tab::Home,
            contact_handle: String::new(),
            show_login_modal: true,
            login_help_open: false,
        }
    }
}

impl UiState {
    /// Drop everything tied to the ended session.
    pub fn reset_for_logout(&mut self) {
        self.active_tab = Tab::Home;
        self.contact_handle.clear();
    }
}
