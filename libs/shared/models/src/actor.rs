use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role of a user record as stored by the identity collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Patient,
    Doctor,
    Nurse,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Patient => write!(f, "patient"),
            UserRole::Doctor => write!(f, "doctor"),
            UserRole::Nurse => write!(f, "nurse"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(UserRole::Patient),
            "doctor" | "provider" => Ok(UserRole::Doctor),
            "nurse" => Ok(UserRole::Nurse),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown user role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Nurse,
    Admin,
}

/// The identity performing an operation.
///
/// Authorization decisions match on the variant; nothing downstream compares
/// role strings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Actor {
    Patient { id: Uuid },
    Provider { id: Uuid },
    Staff { id: Uuid, role: StaffRole },
}

impl Actor {
    pub fn patient(id: Uuid) -> Self {
        Actor::Patient { id }
    }

    pub fn provider(id: Uuid) -> Self {
        Actor::Provider { id }
    }

    pub fn nurse(id: Uuid) -> Self {
        Actor::Staff { id, role: StaffRole::Nurse }
    }

    pub fn admin(id: Uuid) -> Self {
        Actor::Staff { id, role: StaffRole::Admin }
    }

    pub fn from_role(role: UserRole, id: Uuid) -> Self {
        match role {
            UserRole::Patient => Actor::patient(id),
            UserRole::Doctor => Actor::provider(id),
            UserRole::Nurse => Actor::nurse(id),
            UserRole::Admin => Actor::admin(id),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Actor::Patient { id } | Actor::Provider { id } | Actor::Staff { id, .. } => *id,
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Actor::Staff { .. })
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::Staff { role: StaffRole::Admin, .. })
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Patient { id } => write!(f, "patient:{}", id),
            Actor::Provider { id } => write!(f, "provider:{}", id),
            Actor::Staff { id, role: StaffRole::Nurse } => write!(f, "nurse:{}", id),
            Actor::Staff { id, role: StaffRole::Admin } => write!(f, "admin:{}", id),
        }
    }
}
