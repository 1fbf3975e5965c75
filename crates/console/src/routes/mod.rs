//! Route table: the static tree of navigable destinations.
//!
//! Public routes sit at the top level with absolute paths. Everything else
//! hangs below the single authenticated root `/` with relative path
//! segments. The table is immutable once built.

pub mod catalog;

use std::collections::HashSet;

use thiserror::Error;

use cardkey_auth::Role;

pub use catalog::console_routes;

/// Path of the public catch-all (not found) route.
pub const CATCH_ALL: &str = "*";

const ROOT: &str = "/";

/// Per-route metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub title: Option<String>,
    pub icon: Option<String>,
    /// Roles allowed in; empty admits every role.
    pub roles: Vec<Role>,
    /// Never shown in the menu (and neither are its children).
    pub hidden: bool,
    pub requires_auth: bool,
    /// Top-level ordering key; missing sorts last.
    pub sort: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub path: String,
    pub name: String,
    pub meta: RouteMeta,
    /// Matching this exact route immediately continues to another location.
    pub redirect: Option<String>,
    pub children: Vec<RouteDescriptor>,
}

impl RouteDescriptor {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: String::new(),
            meta: RouteMeta::default(),
            redirect: None,
            children: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.meta.title = Some(title.into());
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.meta.icon = Some(icon.into());
        self
    }

    pub fn roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.meta.roles = roles.into_iter().collect();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.meta.hidden = true;
        self
    }

    pub fn requires_auth(mut self) -> Self {
        self.meta.requires_auth = true;
        self
    }

    pub fn sort(mut self, key: i32) -> Self {
        self.meta.sort = Some(key);
        self
    }

    pub fn redirect(mut self, to: impl Into<String>) -> Self {
        self.redirect = Some(to.into());
        self
    }

    pub fn children(mut self, children: Vec<RouteDescriptor>) -> Self {
        self.children = children;
        self
    }

    fn segments(&self) -> Vec<&str> {
        split_segments(&self.path)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteTableError {
    #[error("duplicate route path {path:?} under {parent:?}")]
    DuplicatePath { parent: String, path: String },

    #[error("public route path {0:?} must be absolute")]
    RelativePublicPath(String),

    #[error("nested route path {0:?} must be a non-empty relative segment")]
    InvalidNestedPath(String),
}

/// A resolved location: the route chain from the outermost match to the
/// target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub chain: Vec<&'a RouteDescriptor>,
    /// Normalized path, without query or fragment.
    pub path: String,
    /// Normalized path with the original query and fragment.
    pub full_path: String,
}

impl<'a> RouteMatch<'a> {
    pub fn target(&self) -> Option<&'a RouteDescriptor> {
        self.chain.last().copied()
    }

    /// The target or any ancestor requires a signed-in user.
    pub fn requires_auth(&self) -> bool {
        self.chain.iter().any(|r| r.meta.requires_auth)
    }

    pub fn required_roles(&self) -> &'a [Role] {
        self.target().map(|r| r.meta.roles.as_slice()).unwrap_or_default()
    }

    pub fn title(&self) -> Option<&'a str> {
        self.target().and_then(|r| r.meta.title.as_deref())
    }

    pub fn redirect(&self) -> Option<&'a str> {
        self.target().and_then(|r| r.redirect.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    public: Vec<RouteDescriptor>,
    root: RouteDescriptor,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    pub fn public_routes(&self) -> &[RouteDescriptor] {
        &self.public
    }

    /// The authenticated root (`/`).
    pub fn root(&self) -> &RouteDescriptor {
        &self.root
    }

    /// Resolve a location (path plus optional query/fragment).
    ///
    /// Unknown paths fall through to the catch-all route if one is declared.
    pub fn resolve(&self, location: &str) -> Option<RouteMatch<'_>> {
        let (path, full_path) = normalize_location(location);
        let segments = split_segments(&path);

        let chain = if let Some(public) = self
            .public
            .iter()
            .find(|r| r.path != CATCH_ALL && split_segments(&r.path) == segments)
        {
            vec![public]
        } else if segments.is_empty() {
            vec![&self.root]
        } else if let Some(mut chain) = walk(&self.root.children, &segments) {
            chain.insert(0, &self.root);
            chain
        } else {
            vec![self.public.iter().find(|r| r.path == CATCH_ALL)?]
        };

        Some(RouteMatch {
            chain,
            path,
            full_path,
        })
    }
}

fn walk<'a>(nodes: &'a [RouteDescriptor], segments: &[&str]) -> Option<Vec<&'a RouteDescriptor>> {
    for node in nodes {
        let own = node.segments();
        let Some(rest) = segments.strip_prefix(own.as_slice()) else {
            continue;
        };
        if rest.is_empty() {
            return Some(vec![node]);
        }
        if let Some(mut chain) = walk(&node.children, rest) {
            chain.insert(0, node);
            return Some(chain);
        }
    }
    None
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Split a location into `(normalized path, normalized full path)`.
pub fn normalize_location(location: &str) -> (String, String) {
    let (raw_path, suffix) = match location.find(['?', '#']) {
        Some(idx) => location.split_at(idx),
        None => (location, ""),
    };
    let path = format!("/{}", split_segments(raw_path).join("/"));
    let full_path = format!("{path}{suffix}");
    (path, full_path)
}

/// Collects declaration groups and assembles a validated [`RouteTable`].
#[derive(Debug, Clone, Default)]
pub struct RouteTableBuilder {
    public: Vec<RouteDescriptor>,
    root_redirect: Option<String>,
    groups: Vec<Vec<RouteDescriptor>>,
    common: Vec<RouteDescriptor>,
}

impl RouteTableBuilder {
    /// Add a public (absolute path) route.
    pub fn public(mut self, route: RouteDescriptor) -> Self {
        self.public.push(route);
        self
    }

    /// Where a bare `/` continues to.
    pub fn root_redirect(mut self, to: impl Into<String>) -> Self {
        self.root_redirect = Some(to.into());
        self
    }

    /// Add a declaration group of authenticated routes. Groups are merged and
    /// sorted by `sort`.
    pub fn group(mut self, routes: Vec<RouteDescriptor>) -> Self {
        self.groups.push(routes);
        self
    }

    /// Authenticated routes appended after the sorted groups, in order.
    pub fn common(mut self, routes: Vec<RouteDescriptor>) -> Self {
        self.common.extend(routes);
        self
    }

    pub fn build(self) -> Result<RouteTable, RouteTableError> {
        let mut children: Vec<RouteDescriptor> = self.groups.into_iter().flatten().collect();
        // Stable: ties keep declaration order.
        children.sort_by_key(|r| match r.meta.sort {
            Some(key) => (0, key),
            None => (1, 0),
        });
        children.extend(self.common);

        let mut root = RouteDescriptor::new(ROOT).requires_auth().children(children);
        root.redirect = self.root_redirect;

        for route in &self.public {
            if route.path != CATCH_ALL && !route.path.starts_with('/') {
                return Err(RouteTableError::RelativePublicPath(route.path.clone()));
            }
        }
        check_siblings(ROOT, &self.public)?;
        validate_nested(ROOT, &root.children)?;

        Ok(RouteTable {
            public: self.public,
            root,
        })
    }
}

fn check_siblings(parent: &str, routes: &[RouteDescriptor]) -> Result<(), RouteTableError> {
    let mut seen = HashSet::new();
    for route in routes {
        if !seen.insert(route.path.as_str()) {
            return Err(RouteTableError::DuplicatePath {
                parent: parent.to_string(),
                path: route.path.clone(),
            });
        }
    }
    Ok(())
}

fn validate_nested(parent: &str, routes: &[RouteDescriptor]) -> Result<(), RouteTableError> {
    check_siblings(parent, routes)?;
    for route in routes {
        if route.path.is_empty() || route.path.starts_with('/') || route.path == CATCH_ALL {
            return Err(RouteTableError::InvalidNestedPath(route.path.clone()));
        }
        validate_nested(&route.path, &route.children)?;
    }
    Ok(())
}
