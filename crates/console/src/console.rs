//! Composition root: builds every component from one [`ConsoleConfig`] and
//! wires them together explicitly.

use std::sync::Arc;

use anyhow::Context;

use cardkey_core::ApiResult;

use crate::api::{AuthApi, LoginRequest, LoginResponse};
use crate::config::{ConsoleConfig, SESSION_KEY};
use crate::guard::NavigationGuard;
use crate::menu::{menu_for, MenuEntry};
use crate::navigation::{LogNotifier, NavigationQueue, Notifier};
use crate::router::{Location, NavigationError, Router};
use crate::routes::{console_routes, RouteTable};
use crate::session::SessionStore;
use crate::storage::{FileStorage, MemoryStorage, SessionStorage};
use crate::transport::Transport;

#[derive(Debug)]
pub struct Console {
    config: ConsoleConfig,
    session: SessionStore,
    transport: Transport,
    auth: Arc<AuthApi>,
    routes: Arc<RouteTable>,
    guard: NavigationGuard,
    router: Router,
}

impl Console {
    /// Build a console with file-backed persistence (when configured) and
    /// log-only notifications.
    pub fn open(config: ConsoleConfig) -> anyhow::Result<Self> {
        let storage: Arc<dyn SessionStorage> = match &config.session_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create session directory at {dir:?}"))?;
                Arc::new(FileStorage::new(dir))
            }
            None => Arc::new(MemoryStorage::new()),
        };
        Self::open_with(config, storage, Arc::new(LogNotifier))
    }

    pub fn open_with(
        config: ConsoleConfig,
        storage: Arc<dyn SessionStorage>,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let session = SessionStore::open(storage, SESSION_KEY);
        let forced = NavigationQueue::new();

        let transport = Transport::new(
            &config,
            session.clone(),
            Arc::new(forced.clone()),
            notifier,
        )
        .context("failed to build HTTP transport")?;
        let auth = Arc::new(AuthApi::new(transport.clone()));

        let routes = Arc::new(
            console_routes(&config.paths.landing).context("invalid route declarations")?,
        );
        let guard = NavigationGuard::new(
            session.clone(),
            auth.clone(),
            routes.clone(),
            config.paths.clone(),
        );
        let router = Router::new(guard.clone(), routes.clone(), forced, config.app_title.clone());

        tracing::debug!(api = %transport.base_url(), "console ready");

        Ok(Self {
            config,
            session,
            transport,
            auth,
            routes,
            guard,
            router,
        })
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn auth(&self) -> &AuthApi {
        &self.auth
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse> {
        self.session.login(self.auth.as_ref(), request).await
    }

    /// Sign in, then continue to `return_to` (or the authenticated root).
    pub async fn sign_in(
        &self,
        request: &LoginRequest,
        return_to: Option<&str>,
    ) -> anyhow::Result<Location> {
        self.login(request).await.context("sign-in failed")?;
        let location = self.router.push(return_to.unwrap_or("/")).await?;
        Ok(location)
    }

    pub async fn logout(&self) {
        self.session.logout(self.auth.as_ref()).await;
    }

    pub fn menu(&self) -> Vec<MenuEntry> {
        menu_for(&self.routes, &self.session)
    }

    /// Navigate to `target`, then honor any navigation the transport forced
    /// meanwhile (a 401 during identity refresh, for instance).
    pub async fn navigate(&self, target: &str) -> Result<Location, NavigationError> {
        let location = self.router.push(target).await?;
        match self.router.flush_forced().await? {
            Some(forced) => Ok(forced),
            None => Ok(location),
        }
    }
}
