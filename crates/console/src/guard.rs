//! Navigation guard: decides whether a route transition may proceed.

use std::sync::Arc;

use cardkey_auth::authorize;

use crate::api::AuthEndpoints;
use crate::config::NavigationPaths;
use crate::routes::{normalize_location, RouteMatch, RouteTable};
use crate::session::SessionStore;

/// Outcome of a guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Already signed in; send to the default landing page instead of login.
    RedirectLanding,
    /// Sign-in needed. `return_to` is where to continue after login.
    RedirectLogin { return_to: Option<String> },
    RedirectForbidden,
}

impl Decision {
    /// Location to continue to, or `None` for [`Decision::Allow`].
    pub fn location(&self, paths: &NavigationPaths) -> Option<String> {
        match self {
            Decision::Allow => None,
            Decision::RedirectLanding => Some(paths.landing.clone()),
            Decision::RedirectLogin {
                return_to: Some(back),
            } => Some(format!(
                "{}?redirect={}",
                paths.login,
                urlencoding::encode(back)
            )),
            Decision::RedirectLogin { return_to: None } => Some(paths.login.clone()),
            Decision::RedirectForbidden => Some(paths.forbidden.clone()),
        }
    }
}

#[derive(Clone)]
pub struct NavigationGuard {
    session: SessionStore,
    auth: Arc<dyn AuthEndpoints>,
    routes: Arc<RouteTable>,
    paths: NavigationPaths,
}

impl core::fmt::Debug for NavigationGuard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NavigationGuard")
            .field("session", &self.session)
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

impl NavigationGuard {
    pub fn new(
        session: SessionStore,
        auth: Arc<dyn AuthEndpoints>,
        routes: Arc<RouteTable>,
        paths: NavigationPaths,
    ) -> Self {
        Self {
            session,
            auth,
            routes,
            paths,
        }
    }

    pub fn paths(&self) -> &NavigationPaths {
        &self.paths
    }

    /// Evaluate a transition to `target` (path with optional query).
    pub async fn evaluate(&self, target: &str) -> Decision {
        match self.routes.resolve(target) {
            Some(matched) => self.evaluate_match(&matched).await,
            None => {
                let (path, _) = normalize_location(target);
                if path == self.paths.login && self.session.is_authenticated() {
                    Decision::RedirectLanding
                } else {
                    Decision::Allow
                }
            }
        }
    }

    /// Evaluate a transition to an already resolved route.
    ///
    /// Side-effect free except for the identity refresh (and the logout that
    /// follows a failed refresh).
    pub async fn evaluate_match(&self, target: &RouteMatch<'_>) -> Decision {
        let decision = self.decide(target).await;
        tracing::debug!(path = %target.full_path, ?decision, "navigation guard");
        decision
    }

    async fn decide(&self, target: &RouteMatch<'_>) -> Decision {
        if target.path == self.paths.login {
            return if self.session.is_authenticated() {
                Decision::RedirectLanding
            } else {
                Decision::Allow
            };
        }

        if target.requires_auth() {
            if !self.session.is_authenticated() {
                return Decision::RedirectLogin {
                    return_to: Some(target.full_path.clone()),
                };
            }

            // A token without a profile is never a valid resting state.
            if self.session.needs_profile() {
                let refreshed = self.session.refresh_identity(self.auth.as_ref()).await;
                let usable = refreshed.is_ok()
                    && self.session.is_authenticated()
                    && !self.session.needs_profile();
                if !usable {
                    match refreshed {
                        Err(err) => {
                            tracing::info!(error = %err, "identity refresh failed; signing out")
                        }
                        Ok(()) => tracing::info!("no profile after identity refresh; signing out"),
                    }
                    self.session.logout(self.auth.as_ref()).await;
                    return Decision::RedirectLogin { return_to: None };
                }
            }
        }

        let role = self.session.role();
        if authorize(target.required_roles(), role.as_ref()).is_err() {
            return Decision::RedirectForbidden;
        }

        Decision::Allow
    }
}
