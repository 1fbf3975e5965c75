//! The signed-in identity and its persisted form.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Role;

/// Account status, normalized to lower case.
///
/// The server is not consistent about casing (`NORMAL`, `Normal`, `normal`),
/// so every constructor folds to lower case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AccountStatus(Cow<'static, str>);

impl AccountStatus {
    pub const NORMAL: AccountStatus = AccountStatus(Cow::Borrowed("normal"));
    pub const BANNED: AccountStatus = AccountStatus(Cow::Borrowed("banned"));

    pub fn new(status: &str) -> Self {
        Self(Cow::Owned(status.trim().to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_banned(&self) -> bool {
        *self == Self::BANNED
    }
}

impl From<String> for AccountStatus {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<AccountStatus> for String {
    fn from(value: AccountStatus) -> Self {
        value.0.into_owned()
    }
}

impl core::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role and account status of a signed-in user.
///
/// They are only ever set together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub role: Role,
    pub account_status: AccountStatus,
}

/// Who is signed in to this client.
///
/// # Invariants
/// - `role` and `account_status` are both set or both unset (see [`Standing`]).
/// - A non-empty token means a login succeeded and has not been cleared since.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    token: String,
    username: String,
    standing: Option<Standing>,
    has_bound_license: bool,
}

impl Identity {
    /// The signed-out identity.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn standing(&self) -> Option<&Standing> {
        self.standing.as_ref()
    }

    pub fn role(&self) -> Option<&Role> {
        self.standing.as_ref().map(|s| &s.role)
    }

    pub fn account_status(&self) -> Option<&AccountStatus> {
        self.standing.as_ref().map(|s| &s.account_status)
    }

    pub fn has_bound_license(&self) -> bool {
        self.has_bound_license
    }

    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn is_admin(&self) -> bool {
        self.role().is_some_and(Role::is_admin)
    }

    /// A token is present but the profile was never fetched (e.g. after a
    /// reload that only kept the credential).
    pub fn needs_profile(&self) -> bool {
        self.is_authenticated() && self.username.is_empty()
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }

    /// Overwrite the profile fields in one step. The token is left alone.
    pub fn set_profile(
        &mut self,
        username: impl Into<String>,
        role: Role,
        account_status: AccountStatus,
        has_bound_license: bool,
    ) {
        self.username = username.into();
        self.standing = Some(Standing {
            role,
            account_status,
        });
        self.has_bound_license = has_bound_license;
    }

    pub fn clear(&mut self) {
        *self = Self::empty();
    }
}

/// Flat storage form of [`Identity`].
///
/// Unset fields are stored as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedIdentity {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub user_status: String,
    #[serde(default)]
    pub has_card: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("role and account status must be set together")]
    PartialStanding,

    #[error("profile data present without a token")]
    ProfileWithoutToken,
}

impl From<&Identity> for PersistedIdentity {
    fn from(identity: &Identity) -> Self {
        Self {
            token: identity.token.clone(),
            username: identity.username.clone(),
            role: identity
                .role()
                .map(|r| r.as_str().to_string())
                .unwrap_or_default(),
            user_status: identity
                .account_status()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            has_card: identity.has_bound_license,
        }
    }
}

impl TryFrom<PersistedIdentity> for Identity {
    type Error = IdentityError;

    fn try_from(p: PersistedIdentity) -> Result<Self, Self::Error> {
        let standing = match (p.role.is_empty(), p.user_status.is_empty()) {
            (true, true) => None,
            (false, false) => Some(Standing {
                role: Role::new(p.role),
                account_status: AccountStatus::new(&p.user_status),
            }),
            _ => return Err(IdentityError::PartialStanding),
        };

        let has_profile = standing.is_some() || !p.username.is_empty() || p.has_card;
        if p.token.is_empty() && has_profile {
            return Err(IdentityError::ProfileWithoutToken);
        }

        Ok(Self {
            token: p.token,
            username: p.username,
            standing,
            has_bound_license: p.has_card,
        })
    }
}
