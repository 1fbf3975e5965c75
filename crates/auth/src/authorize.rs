use thiserror::Error;

use crate::Role;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("not signed in")]
    Unauthenticated,

    #[error("forbidden: requires one of [{}]", join(.0))]
    Forbidden(Vec<Role>),

    #[error("element permission check needs at least one role, like [\"admin\", \"user\"]")]
    EmptyRequirement,
}

fn join(roles: &[Role]) -> String {
    roles
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `true` if `role` satisfies `required`.
///
/// An empty requirement admits everyone, including the signed-out state.
/// A non-empty requirement needs a role that is listed.
pub fn permits(required: &[Role], role: Option<&Role>) -> bool {
    if required.is_empty() {
        return true;
    }
    role.is_some_and(|r| required.contains(r))
}

/// Authorize a route-level role requirement.
///
/// - No IO
/// - No panics
pub fn authorize(required: &[Role], role: Option<&Role>) -> Result<(), AuthzError> {
    if permits(required, role) {
        return Ok(());
    }
    match role {
        None => Err(AuthzError::Unauthenticated),
        Some(_) => Err(AuthzError::Forbidden(required.to_vec())),
    }
}

/// Element-level (button) visibility check.
///
/// Unlike routes, an element must always name the roles it is shown to; an
/// empty list is a usage error rather than "visible to all".
pub fn check_element(required: &[Role], role: Option<&Role>) -> Result<bool, AuthzError> {
    if required.is_empty() {
        return Err(AuthzError::EmptyRequirement);
    }
    Ok(permits(required, role))
}
