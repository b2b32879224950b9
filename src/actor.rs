use std::str::FromStr;

use uuid::Uuid;

use crate::action::{AgeClass, EligibilityProfile, Gender};
use crate::errors::BackendError;

/// The role the gateway authenticated the caller with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Volunteer,
    Administrator,
}

impl FromStr for Role {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "volunteer" => Ok(Role::Volunteer),
            "administrator" => Ok(Role::Administrator),
            _ => Err(BackendError::BadRequest),
        }
    }
}

/// The authenticated identity attached to every request by the gateway.
/// Authentication itself happens upstream; this subsystem only consumes
/// the result.
#[derive(Clone, Debug)]
pub struct Actor {
    pub volunteer_id: Uuid,
    pub association_id: Uuid,
    pub role: Role,
    pub gender: Option<Gender>,
    pub age_class: Option<AgeClass>,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }

    /// Whether the actor administers the given association.
    pub fn administers(&self, association_id: &Uuid) -> bool {
        self.is_admin() && self.association_id == *association_id
    }

    pub fn profile(&self) -> EligibilityProfile {
        EligibilityProfile {
            gender: self.gender,
            age: self.age_class,
        }
    }
}
