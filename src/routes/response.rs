use serde::Serialize;

use crate::action::Action;
use crate::calendar::MonthGrid;
use crate::enrollment::{Enrollment, Participant};
use crate::occurrence::Occurrence;
use crate::reassignment::CascadeOutcome;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Healthz {
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
    },
    Occurrences {
        occurrences: Vec<Occurrence>,
    },
    Month(MonthGrid),
    ActionCreated {
        action: Action,
        covered_occurrences: usize,
    },
    ActionUpdated {
        action: Action,
        #[serde(skip_serializing_if = "Option::is_none")]
        reassignment: Option<Reassignment>,
    },
    Enrolled {
        enrollment: Enrollment,
        remaining: i64,
    },
    Attendance {
        enrollment: Enrollment,
    },
    SeriesCancelled {
        removed: usize,
        from: Option<String>,
        to: Option<String>,
    },
    Participants {
        action: String,
        date: String,
        participants: Vec<Participant>,
    },
}

/// The summary of a responsible-person migration, for the update
/// response.
#[derive(Debug, Serialize)]
pub struct Reassignment {
    pub(crate) removed: usize,
    pub(crate) created: usize,
}

impl From<&CascadeOutcome> for Reassignment {
    fn from(outcome: &CascadeOutcome) -> Self {
        Reassignment {
            removed: outcome.removed,
            created: outcome.created,
        }
    }
}
