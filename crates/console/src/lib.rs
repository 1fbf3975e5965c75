//! `cardkey-console`
//!
//! Client core of the card-key administration console: the signed-in
//! session, the API transport and its envelope protocol, the route table,
//! navigation guarding and the role-filtered menu.
//!
//! Components are constructed explicitly and passed to each other; see
//! [`Console`] for the default wiring.

pub mod api;
pub mod config;
pub mod console;
pub mod guard;
pub mod menu;
pub mod navigation;
pub mod router;
pub mod routes;
pub mod session;
pub mod storage;
pub mod transport;

pub use api::{AuthApi, AuthEndpoints, CurrentUser, LoginRequest, LoginResponse, RegisterRequest};
pub use config::{ConsoleConfig, NavigationPaths};
pub use console::Console;
pub use guard::{Decision, NavigationGuard};
pub use menu::{menu_for, project_menu, MenuEntry};
pub use navigation::{LogNotifier, NavigationQueue, Navigator, Notifier};
pub use router::{Location, NavigationError, Router};
pub use routes::{RouteDescriptor, RouteMatch, RouteMeta, RouteTable, RouteTableError};
pub use session::SessionStore;
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};
pub use transport::{Binary, Payload, Transport};
