//! Host navigation: resolves a location, runs the guard, follows redirects
//! and commits the resulting page.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::guard::NavigationGuard;
use crate::navigation::NavigationQueue;
use crate::routes::{RouteMatch, RouteTable};

const MAX_REDIRECTS: usize = 8;

/// A committed page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub full_path: String,
    pub name: String,
    /// Document title, `"<page> - <app>"` or the app title alone.
    pub title: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("too many redirects navigating to {0}")]
    RedirectLoop(String),

    #[error("no route matches {0}")]
    NotFound(String),
}

pub struct Router {
    guard: NavigationGuard,
    routes: Arc<RouteTable>,
    forced: NavigationQueue,
    app_title: String,
    current: Mutex<Option<Location>>,
}

impl core::fmt::Debug for Router {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Router")
            .field("guard", &self.guard)
            .field("app_title", &self.app_title)
            .finish_non_exhaustive()
    }
}

impl Router {
    pub fn new(
        guard: NavigationGuard,
        routes: Arc<RouteTable>,
        forced: NavigationQueue,
        app_title: impl Into<String>,
    ) -> Self {
        Self {
            guard,
            routes,
            forced,
            app_title: app_title.into(),
            current: Mutex::new(None),
        }
    }

    pub async fn current(&self) -> Option<Location> {
        self.current.lock().await.clone()
    }

    /// Navigate to `target`. Navigations are serialized: a second call waits
    /// for the first to commit.
    pub async fn push(&self, target: &str) -> Result<Location, NavigationError> {
        let mut current = self.current.lock().await;
        let location = self.settle(target).await?;
        tracing::info!(path = %location.full_path, title = %location.title, "navigated");
        *current = Some(location.clone());
        Ok(location)
    }

    /// Perform the most recent navigation forced by the transport, if any.
    pub async fn flush_forced(&self) -> Result<Option<Location>, NavigationError> {
        match self.forced.drain().pop() {
            Some(target) => self.push(&target).await.map(Some),
            None => Ok(None),
        }
    }

    async fn settle(&self, target: &str) -> Result<Location, NavigationError> {
        let mut next = target.to_string();
        for _ in 0..=MAX_REDIRECTS {
            let matched = self
                .routes
                .resolve(&next)
                .ok_or_else(|| NavigationError::NotFound(next.clone()))?;

            if let Some(to) = matched.redirect() {
                tracing::debug!(from = %matched.full_path, to, "route redirect");
                next = to.to_string();
                continue;
            }

            match self.guard.evaluate_match(&matched).await.location(self.guard.paths()) {
                Some(to) => next = to,
                None => return Ok(self.commit(&matched)),
            }
        }
        Err(NavigationError::RedirectLoop(target.to_string()))
    }

    fn commit(&self, matched: &RouteMatch<'_>) -> Location {
        let title = match matched.title() {
            Some(page) => format!("{page} - {}", self.app_title),
            None => self.app_title.clone(),
        };
        Location {
            path: matched.path.clone(),
            full_path: matched.full_path.clone(),
            name: matched
                .target()
                .map(|r| r.name.clone())
                .unwrap_or_default(),
            title,
        }
    }
}
