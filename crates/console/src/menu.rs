//! Menu projection: the navigation menu visible to a role.

use serde::Serialize;

use cardkey_auth::{permits, Role};

use crate::routes::{RouteDescriptor, RouteTable};
use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub full_path: String,
    pub name: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuEntry>,
}

/// Project the authenticated part of `table` into menu entries for `role`.
///
/// Hidden routes are skipped together with their subtree, as are routes
/// without a title and routes whose roles exclude `role`. Order follows the
/// table.
pub fn project_menu(table: &RouteTable, role: Option<&Role>) -> Vec<MenuEntry> {
    project(&table.root().children, "", role)
}

/// Menu for whoever is currently signed in.
pub fn menu_for(table: &RouteTable, session: &SessionStore) -> Vec<MenuEntry> {
    project_menu(table, session.role().as_ref())
}

fn project(nodes: &[RouteDescriptor], prefix: &str, role: Option<&Role>) -> Vec<MenuEntry> {
    nodes
        .iter()
        .filter(|node| !node.meta.hidden && permits(&node.meta.roles, role))
        .filter_map(|node| {
            let title = node.meta.title.as_ref()?;
            let full_path = join_path(prefix, &node.path);
            let children = project(&node.children, &full_path, role);
            Some(MenuEntry {
                name: node.name.clone(),
                title: title.clone(),
                icon: node.meta.icon.clone(),
                children,
                full_path,
            })
        })
        .collect()
}

fn join_path(prefix: &str, segment: &str) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        segment.trim_matches('/')
    )
}
