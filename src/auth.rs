//! Actor identity for business-rule checks.
//!
//! Authentication happens outside this crate; services receive an already
//! resolved [`Actor`] and only consult its capability, never a token.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated caller of a workflow operation.
///
/// Admins bypass the approval gate and may decide pending quotes; members
/// may create and edit their own documents but cannot approve them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    Admin(Uuid),
    Member(Uuid),
}

impl Actor {
    pub fn id(&self) -> Uuid {
        match self {
            Actor::Admin(id) | Actor::Member(id) => *id,
        }
    }

    /// Capability check resolved once at the boundary.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Actor::Admin(_))
    }

    /// Tag persisted in `created_by_type` columns.
    pub fn kind(&self) -> &'static str {
        match self {
            Actor::Admin(_) => "ADMIN",
            Actor::Member(_) => "MEMBER",
        }
    }
}
