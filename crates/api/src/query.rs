//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Page-level parameters accepted by the menu and debug endpoints
/// (`?menu=&debug=&loglevel=`).
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    /// Label of the menu entry to select.
    pub menu: Option<String>,
    /// `1` shows the debug page and bypasses the policy cache.
    pub debug: Option<String>,
    /// New log level; administrators only.
    pub loglevel: Option<String>,
}

impl PageParams {
    pub fn debug(&self) -> bool {
        usermgr_core::menu::debug_enabled(self.debug.as_deref())
    }
}

/// Query parameters for list endpoints that support an `include_inactive` flag.
#[derive(Debug, Deserialize)]
pub struct IncludeInactiveParams {
    #[serde(default)]
    pub include_inactive: bool,
}
