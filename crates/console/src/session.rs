//! Session store: the single source of truth for who is signed in.
//!
//! Constructed explicitly and shared by cloning (all clones see the same
//! identity). Every mutation is written through to the storage side channel
//! so a restart rehydrates the same state. Mutations are last-write-wins.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use cardkey_auth::{AccountStatus, Identity, PersistedIdentity, Role};
use cardkey_core::ApiResult;

use crate::api::{AuthEndpoints, LoginRequest, LoginResponse};
use crate::config::SESSION_KEY;
use crate::storage::{MemoryStorage, SessionStorage};

#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    identity: RwLock<Identity>,
    storage: Arc<dyn SessionStorage>,
    key: String,
}

impl SessionStore {
    /// Open a session backed by `storage`, rehydrating any persisted identity.
    ///
    /// Persisted data that is undecodable or violates the identity invariants
    /// is discarded and the session starts signed out.
    pub fn open(storage: Arc<dyn SessionStorage>, key: impl Into<String>) -> Self {
        let key = key.into();
        let identity = rehydrate(storage.as_ref(), &key);
        Self {
            inner: Arc::new(Inner {
                identity: RwLock::new(identity),
                storage,
                key,
            }),
        }
    }

    /// Session that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::open(Arc::new(MemoryStorage::new()), SESSION_KEY)
    }

    fn read(&self) -> RwLockReadGuard<'_, Identity> {
        self.inner
            .identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a mutation and persist the result.
    fn update(&self, mutate: impl FnOnce(&mut Identity)) {
        let mut identity = self
            .inner
            .identity
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        mutate(&mut *identity);
        self.persist(&identity);
    }

    fn persist(&self, identity: &Identity) {
        let storage = &self.inner.storage;
        let key = &self.inner.key;

        let result = if *identity == Identity::empty() {
            storage.remove(key)
        } else {
            match serde_json::to_string(&PersistedIdentity::from(identity)) {
                Ok(raw) => storage.save(key, &raw),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to encode session");
                    return;
                }
            }
        };

        if let Err(err) = result {
            tracing::warn!(error = %err, "failed to persist session");
        }
    }

    pub fn snapshot(&self) -> Identity {
        self.read().clone()
    }

    /// Current credential, if signed in.
    pub fn token(&self) -> Option<String> {
        let identity = self.read();
        identity
            .is_authenticated()
            .then(|| identity.token().to_string())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.read().is_admin()
    }

    pub fn role(&self) -> Option<Role> {
        self.read().role().cloned()
    }

    pub fn username(&self) -> String {
        self.read().username().to_string()
    }

    pub fn needs_profile(&self) -> bool {
        self.read().needs_profile()
    }

    /// Replace the stored token. No local validation.
    pub fn set_credential(&self, token: impl Into<String>) {
        let token = token.into();
        self.update(|identity| identity.set_token(token));
    }

    /// Overwrite the identity fields in one step; `account_status` is
    /// lower-cased.
    pub fn set_identity(
        &self,
        username: impl Into<String>,
        role: Role,
        account_status: &str,
        has_bound_license: bool,
    ) {
        let username = username.into();
        let status = AccountStatus::new(account_status);
        self.update(|identity| identity.set_profile(username, role, status, has_bound_license));
    }

    /// Reset to the signed-out identity. Never fails.
    pub fn clear(&self) {
        self.update(Identity::clear);
        tracing::debug!("session cleared");
    }

    /// Authenticate and store token plus identity from the one response.
    ///
    /// On failure the session is untouched and the error is returned to the
    /// caller to present.
    pub async fn login(
        &self,
        endpoints: &dyn AuthEndpoints,
        request: &LoginRequest,
    ) -> ApiResult<LoginResponse> {
        let resp = endpoints.login(request).await?;

        self.update(|identity| {
            identity.set_token(resp.token.clone());
            identity.set_profile(
                resp.username.clone(),
                resp.role.clone(),
                resp.user_status.clone(),
                resp.has_card,
            );
        });
        tracing::info!(username = %resp.username, role = %resp.role, "signed in");

        Ok(resp)
    }

    /// Re-fetch the profile for the current token.
    ///
    /// Only username, role and status change; the token and the bound-license
    /// flag are kept. On failure the session is untouched. A result that
    /// arrives after the token was replaced or cleared is dropped.
    pub async fn refresh_identity(&self, endpoints: &dyn AuthEndpoints) -> ApiResult<()> {
        let token_at_start = self.token();
        let user = endpoints.current_user().await?;

        if self.token() != token_at_start || token_at_start.is_none() {
            tracing::debug!("session changed during identity refresh; result dropped");
            return Ok(());
        }

        self.update(|identity| {
            let has_bound_license = identity.has_bound_license();
            identity.set_profile(user.username, user.role, user.status, has_bound_license);
        });
        Ok(())
    }

    /// Best-effort server logout followed by an unconditional local clear.
    pub async fn logout(&self, endpoints: &dyn AuthEndpoints) {
        if let Err(err) = endpoints.logout().await {
            tracing::warn!(error = %err, "logout request failed");
        }
        self.clear();
    }
}

fn rehydrate(storage: &dyn SessionStorage, key: &str) -> Identity {
    let raw = match storage.load(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Identity::empty(),
        Err(err) => {
            tracing::warn!(error = %err, "failed to load persisted session");
            return Identity::empty();
        }
    };

    let restored = serde_json::from_str::<PersistedIdentity>(&raw)
        .map_err(|e| e.to_string())
        .and_then(|p| Identity::try_from(p).map_err(|e| e.to_string()));

    match restored {
        Ok(identity) => identity,
        Err(reason) => {
            tracing::warn!(%reason, "discarding corrupted persisted session");
            if let Err(err) = storage.remove(key) {
                tracing::warn!(error = %err, "failed to remove corrupted session");
            }
            Identity::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use cardkey_core::{ApiError, ApplicationError};
    use proptest::prelude::*;

    use super::*;
    use crate::api::CurrentUser;

    #[derive(Default)]
    struct FakeAuth {
        fail_login: bool,
        fail_me: bool,
        fail_logout: bool,
        logout_calls: AtomicUsize,
        me_role: Mutex<Option<Role>>,
        /// Signs in with another token while `/auth/me` is in flight.
        swap_token_on: Option<SessionStore>,
    }

    fn business_error(code: &str) -> ApiError {
        ApiError::Application(Box::new(ApplicationError {
            code: code.to_string(),
            message: "nope".to_string(),
            api: String::new(),
            platform: String::new(),
            envelope: serde_json::Value::Null,
        }))
    }

    #[async_trait]
    impl AuthEndpoints for FakeAuth {
        async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse> {
            if self.fail_login {
                return Err(business_error("AUTH_FAILED"));
            }
            Ok(LoginResponse {
                token: "tok-1".into(),
                username: request.username.clone(),
                role: Role::ADMIN,
                user_status: AccountStatus::new("NORMAL"),
                has_card: true,
            })
        }

        async fn current_user(&self) -> ApiResult<CurrentUser> {
            if let Some(session) = &self.swap_token_on {
                session.set_credential("other");
            }
            if self.fail_me {
                return Err(ApiError::Unauthorized);
            }
            let role = self
                .me_role
                .lock()
                .unwrap()
                .clone()
                .unwrap_or(Role::ADMIN);
            Ok(CurrentUser {
                id: Some(1),
                username: "alice".into(),
                role,
                status: AccountStatus::new("Banned"),
                created_at: None,
                last_login_at: None,
            })
        }

        async fn logout(&self) -> ApiResult<()> {
            self.logout_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_logout {
                return Err(ApiError::network("connection refused"));
            }
            Ok(())
        }
    }

    fn login_request() -> LoginRequest {
        LoginRequest {
            username: "alice".into(),
            password: "secret".into(),
            app_key: "app".into(),
            device_id: "dev-1".into(),
        }
    }

    #[tokio::test]
    async fn login_stores_token_and_identity() {
        let session = SessionStore::in_memory();
        let auth = FakeAuth::default();

        session.login(&auth, &login_request()).await.unwrap();

        let identity = session.snapshot();
        assert_eq!(identity.token(), "tok-1");
        assert_eq!(identity.username(), "alice");
        assert!(session.is_admin());
        assert_eq!(identity.account_status(), Some(&AccountStatus::NORMAL));
        assert!(identity.has_bound_license());
    }

    #[tokio::test]
    async fn failed_login_leaves_session_untouched() {
        let session = SessionStore::in_memory();
        session.set_credential("previous");
        let auth = FakeAuth {
            fail_login: true,
            ..Default::default()
        };

        let err = session.login(&auth, &login_request()).await.unwrap_err();
        assert_eq!(err.code(), "AUTH_FAILED");
        assert_eq!(session.token().as_deref(), Some("previous"));
        assert!(session.role().is_none());
    }

    #[tokio::test]
    async fn refresh_after_login_keeps_token_and_license_flag() {
        let session = SessionStore::in_memory();
        let auth = FakeAuth::default();
        *auth.me_role.lock().unwrap() = Some(Role::USER);

        session.login(&auth, &login_request()).await.unwrap();
        session.refresh_identity(&auth).await.unwrap();

        let identity = session.snapshot();
        assert_eq!(identity.token(), "tok-1");
        assert_eq!(identity.role(), Some(&Role::USER));
        assert_eq!(identity.account_status(), Some(&AccountStatus::BANNED));
        assert!(identity.has_bound_license());
    }

    #[tokio::test]
    async fn failed_refresh_leaves_session_untouched() {
        let session = SessionStore::in_memory();
        session.set_credential("tok");
        let before = session.snapshot();
        let auth = FakeAuth {
            fail_me: true,
            ..Default::default()
        };

        assert!(session.refresh_identity(&auth).await.is_err());
        assert_eq!(session.snapshot(), before);
    }

    #[tokio::test]
    async fn refresh_result_is_dropped_when_token_changes_mid_call() {
        let session = SessionStore::in_memory();
        session.set_credential("tok");
        let auth = FakeAuth {
            swap_token_on: Some(session.clone()),
            ..Default::default()
        };

        assert!(session.refresh_identity(&auth).await.is_ok());
        assert_eq!(session.username(), "");
        assert_eq!(session.token().as_deref(), Some("other"));
        assert!(session.role().is_none());
    }

    #[tokio::test]
    async fn logout_clears_even_when_server_call_fails() {
        let session = SessionStore::in_memory();
        let auth = FakeAuth {
            fail_logout: true,
            ..Default::default()
        };
        session.login(&auth, &login_request()).await.unwrap();

        session.logout(&auth).await;

        assert_eq!(auth.logout_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.snapshot(), Identity::empty());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn state_survives_reopen() {
        let storage: Arc<dyn SessionStorage> = Arc::new(MemoryStorage::new());
        let session = SessionStore::open(storage.clone(), SESSION_KEY);
        session.set_credential("tok");
        session.set_identity("alice", Role::USER, "NORMAL", false);

        let reopened = SessionStore::open(storage.clone(), SESSION_KEY);
        assert_eq!(reopened.snapshot(), session.snapshot());

        session.clear();
        assert_eq!(storage.load(SESSION_KEY).unwrap(), None);
        assert!(!SessionStore::open(storage, SESSION_KEY).is_authenticated());
    }

    #[test]
    fn token_without_profile_survives_reopen() {
        let storage: Arc<dyn SessionStorage> = Arc::new(MemoryStorage::new());
        SessionStore::open(storage.clone(), SESSION_KEY).set_credential("tok");

        let reopened = SessionStore::open(storage, SESSION_KEY);
        assert!(reopened.is_authenticated());
        assert!(reopened.needs_profile());
    }

    #[test]
    fn corrupted_storage_loads_signed_out() {
        for raw in [
            "not json",
            r#"{"token":"t","username":"a","role":"admin","user_status":""}"#,
            r#"{"token":"","username":"a","role":"admin","user_status":"normal"}"#,
        ] {
            let storage: Arc<dyn SessionStorage> = Arc::new(MemoryStorage::new());
            storage.save(SESSION_KEY, raw).unwrap();

            let session = SessionStore::open(storage.clone(), SESSION_KEY);
            assert_eq!(session.snapshot(), Identity::empty(), "input: {raw}");
            assert_eq!(storage.load(SESSION_KEY).unwrap(), None);
        }
    }

    #[derive(Debug, Clone)]
    enum Op {
        SetCredential(String),
        SetIdentity(bool),
        Clear,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            "(|[a-z]{1,6})".prop_map(Op::SetCredential),
            any::<bool>().prop_map(Op::SetIdentity),
            Just(Op::Clear),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            .. ProptestConfig::default()
        })]

        #[test]
        fn public_operations_never_expose_mixed_state(ops in prop::collection::vec(op(), 0..20)) {
            let session = SessionStore::in_memory();
            for op in ops {
                match op {
                    Op::SetCredential(t) => session.set_credential(t),
                    Op::SetIdentity(admin) => {
                        let role = if admin { Role::ADMIN } else { Role::USER };
                        session.set_identity("alice", role, "Normal", admin);
                    }
                    Op::Clear => session.clear(),
                }
                let identity = session.snapshot();
                prop_assert_eq!(session.is_authenticated(), !identity.token().is_empty());
                prop_assert_eq!(identity.role().is_some(), identity.account_status().is_some());
                prop_assert_eq!(session.token().is_some(), session.is_authenticated());
            }
        }
    }
}
