//! Main menu model.
//!
//! The menu is rebuilt on every request from the session's permissions and
//! the `menu` / `debug` query parameters. Icons are Bootstrap icon names.

use serde::Serialize;

use crate::permissions::Permissions;

pub const MENU_HOME: &str = "Home";
pub const MENU_USERS: &str = "Users";
pub const MENU_ROLES: &str = "Roles";
pub const MENU_ORGS: &str = "Orgs";
pub const MENU_ABOUT: &str = "About";
pub const MENU_DEBUG: &str = "Debug";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub label: &'static str,
    pub icon: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Menu {
    pub items: Vec<MenuItem>,
    /// Index into `items` of the selected entry.
    pub selected_index: usize,
    pub selected: &'static str,
}

/// Build the menu visible to a session.
///
/// Home and About are always present. Users, Roles and Orgs require the
/// matching read permission; Debug only appears with `debug` on. An unknown
/// or missing `requested` label selects Home.
pub fn build_menu(permissions: &Permissions, debug: bool, requested: Option<&str>) -> Menu {
    let mut items = vec![MenuItem {
        label: MENU_HOME,
        icon: "house",
    }];
    if permissions.read_users {
        items.push(MenuItem {
            label: MENU_USERS,
            icon: "people",
        });
    }
    if permissions.read_roles {
        items.push(MenuItem {
            label: MENU_ROLES,
            icon: "mortarboard",
        });
    }
    if permissions.read_orgs {
        items.push(MenuItem {
            label: MENU_ORGS,
            icon: "building",
        });
    }
    items.push(MenuItem {
        label: MENU_ABOUT,
        icon: "info-circle",
    });
    if debug {
        items.push(MenuItem {
            label: MENU_DEBUG,
            icon: "bug",
        });
    }

    let selected_index = requested
        .and_then(|label| items.iter().position(|item| item.label == label))
        .unwrap_or(0);
    let selected = items[selected_index].label;

    Menu {
        items,
        selected_index,
        selected,
    }
}

/// `debug=1` turns the debug page on; any other value leaves it off.
pub fn debug_enabled(param: Option<&str>) -> bool {
    param == Some("1")
}
