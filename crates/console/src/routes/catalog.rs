//! The console's declared routes.
//!
//! Each feature area contributes its own group; groups are merged and
//! ordered by their `sort` key when the table is built.

use cardkey_auth::Role;

use super::{RouteDescriptor, RouteTable, RouteTableError, CATCH_ALL};

fn public_routes() -> Vec<RouteDescriptor> {
    vec![
        RouteDescriptor::new("/login").named("Login").title("Sign in").hidden(),
        RouteDescriptor::new("/forbidden")
            .named("Forbidden")
            .title("Forbidden")
            .hidden(),
        RouteDescriptor::new(CATCH_ALL)
            .named("NotFound")
            .title("Not Found")
            .hidden(),
    ]
}

fn apps() -> Vec<RouteDescriptor> {
    vec![
        RouteDescriptor::new("apps")
            .named("Apps")
            .title("Applications")
            .icon("Grid")
            .roles([Role::ADMIN]),
    ]
}

fn card_permissions() -> Vec<RouteDescriptor> {
    vec![
        RouteDescriptor::new("card-permissions")
            .named("CardPermissions")
            .title("Feature Permissions")
            .icon("Lock")
            .roles([Role::ADMIN]),
    ]
}

fn cards() -> Vec<RouteDescriptor> {
    vec![
        RouteDescriptor::new("cards")
            .named("Cards")
            .title("Card Keys")
            .icon("Ticket")
            .roles([Role::ADMIN]),
    ]
}

fn dashboard() -> Vec<RouteDescriptor> {
    vec![
        RouteDescriptor::new("dashboard")
            .title("Dashboard")
            .icon("DataLine")
            .roles([Role::ADMIN])
            .sort(1)
            .children(vec![
                RouteDescriptor::new("table")
                    .named("Dashboard")
                    .title("Table Data")
                    .icon("DataLine")
                    .roles([Role::ADMIN]),
                RouteDescriptor::new("dashboard2")
                    .named("Dashboard2")
                    .title("Test Page")
                    .icon("DataLine")
                    .roles([Role::ADMIN]),
            ]),
    ]
}

fn devices() -> Vec<RouteDescriptor> {
    vec![
        RouteDescriptor::new("devices")
            .named("Devices")
            .title("Devices")
            .icon("Monitor")
            .roles([Role::ADMIN]),
    ]
}

fn users() -> Vec<RouteDescriptor> {
    vec![
        RouteDescriptor::new("users")
            .named("Users")
            .title("Users")
            .icon("User")
            .roles([Role::ADMIN])
            .sort(2),
    ]
}

/// Pages every signed-in role may open.
fn common() -> Vec<RouteDescriptor> {
    vec![
        RouteDescriptor::new("stats")
            .named("Stats")
            .title("Statistics")
            .icon("DataAnalysis")
            .roles([Role::ADMIN, Role::USER]),
        RouteDescriptor::new("profile")
            .named("Profile")
            .title("Profile")
            .icon("User")
            .roles([Role::ADMIN, Role::USER])
            .hidden(),
    ]
}

/// Build the full console route table.
pub fn console_routes(landing: &str) -> Result<RouteTable, RouteTableError> {
    public_routes()
        .into_iter()
        .fold(RouteTable::builder(), |b, r| b.public(r))
        .root_redirect(landing)
        .group(apps())
        .group(card_permissions())
        .group(cards())
        .group(dashboard())
        .group(devices())
        .group(users())
        .common(common())
        .build()
}
