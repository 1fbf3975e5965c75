//! `cardkey-auth`: pure authorization boundary for the console.
//!
//! No HTTP and no storage: only what an identity looks like and how role
//! requirements are checked.

pub mod authorize;
pub mod identity;
pub mod roles;

pub use authorize::{authorize, check_element, permits, AuthzError};
pub use identity::{AccountStatus, Identity, IdentityError, PersistedIdentity, Standing};
pub use roles::Role;
