use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::datefmt;
use crate::errors::BackendError;

/// The stored status of an enrollment. `full` is never stored; it is
/// derived at display time from the remaining capacity.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    /// The volunteer has registered for the occurrence.
    Enrolled,
    /// An administrator recorded the volunteer as present.
    Present,
    /// An administrator recorded the volunteer as absent.
    Absent,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Enrolled => "enrolled",
            EnrollmentStatus::Present => "present",
            EnrollmentStatus::Absent => "absent",
        }
    }
}

impl FromStr for EnrollmentStatus {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enrolled" => Ok(EnrollmentStatus::Enrolled),
            "present" => Ok(EnrollmentStatus::Present),
            "absent" => Ok(EnrollmentStatus::Absent),
            other => Err(BackendError::InvalidStatus(other.to_owned())),
        }
    }
}

/// A volunteer's registration for one occurrence.
#[derive(Clone, Debug, Serialize)]
pub struct Enrollment {
    /// The ID of the enrollment.
    pub(crate) id: Uuid,

    /// The enrolled volunteer.
    pub(crate) volunteer_id: Uuid,

    /// The action the occurrence belongs to.
    pub(crate) action_id: Uuid,

    /// The date of the occurrence.
    #[serde(with = "datefmt::date")]
    pub(crate) occurs_on: Date,

    /// The stored status.
    pub(crate) status: EnrollmentStatus,

    /// The date and time it was created.
    #[serde(with = "time::serde::timestamp")]
    pub(crate) created_at: OffsetDateTime,
}

impl Enrollment {
    pub fn new(
        id: Uuid,
        volunteer_id: Uuid,
        action_id: Uuid,
        occurs_on: Date,
        status: EnrollmentStatus,
        created_at: OffsetDateTime,
    ) -> Self {
        Enrollment {
            id,
            volunteer_id,
            action_id,
            occurs_on,
            status,
            created_at,
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn volunteer_id(&self) -> &Uuid {
        &self.volunteer_id
    }

    pub fn occurs_on(&self) -> Date {
        self.occurs_on
    }

    pub fn status(&self) -> EnrollmentStatus {
        self.status
    }
}

/// One row of the participant list for an occurrence, as shown to the
/// responsible person.
#[derive(Clone, Debug, Serialize)]
pub struct Participant {
    /// The ID of the underlying enrollment.
    pub(crate) enrollment_id: Uuid,

    /// The volunteer.
    pub(crate) volunteer_id: Uuid,

    /// The volunteer's display name.
    pub(crate) name: String,

    /// The volunteer's contact address.
    pub(crate) email: String,

    /// The stored status.
    pub(crate) status: EnrollmentStatus,
}

impl Participant {
    pub fn new(
        enrollment_id: Uuid,
        volunteer_id: Uuid,
        name: String,
        email: String,
        status: EnrollmentStatus,
    ) -> Self {
        Participant {
            enrollment_id,
            volunteer_id,
            name,
            email,
            status,
        }
    }
}
