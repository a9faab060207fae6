use crate::error::{AppError, AppResult};
use crate::models::user::Role;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What a session may do. All permission is role-level; there is no
/// row-level permission anywhere in the system.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    SubmitRequest,
    ViewRequest,
    EvaluateRequest,
    ManageRecords,
    ManageAccounts,
}

/// The static role-to-capability table. Evaluated once per operation via
/// [`Session::require`] instead of comparing role strings at call sites.
pub fn role_capabilities(role: Role) -> &'static [Capability] {
    match role {
        Role::Administrator => &[
            Capability::SubmitRequest,
            Capability::ViewRequest,
            Capability::EvaluateRequest,
            Capability::ManageRecords,
            Capability::ManageAccounts,
        ],
        Role::School => &[Capability::SubmitRequest, Capability::ViewRequest],
        Role::Supervisor => &[Capability::ViewRequest, Capability::EvaluateRequest],
    }
}

/// One authenticated session: the account plus the single active role chosen
/// at login. Reconstructed from the token on every request, never stored.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub account_id: i64,
    pub role: Role,
}

impl Session {
    pub fn permitted(&self, capability: Capability) -> bool {
        role_capabilities(self.role).contains(&capability)
    }

    pub fn require(&self, capability: Capability) -> AppResult<()> {
        if !self.permitted(capability) {
            return Err(AppError::Authorization(format!(
                "the {} role is not permitted to perform this action",
                self.role
            )));
        }
        Ok(())
    }
}

/// Resolves the active role for a login. A single assigned role is selected
/// automatically; several assigned roles require an explicit choice, signalled
/// to the caller by `Ok(None)`.
pub fn select_role(candidates: &[Role], chosen: Option<Role>) -> AppResult<Option<Role>> {
    match chosen {
        Some(role) => {
            if candidates.contains(&role) {
                Ok(Some(role))
            } else {
                Err(AppError::Auth(format!(
                    "the {role} role is not assigned to this account"
                )))
            }
        }
        None => {
            if candidates.len() == 1 {
                Ok(Some(candidates[0]))
            } else {
                Ok(None)
            }
        }
    }
}
