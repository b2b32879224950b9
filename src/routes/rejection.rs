use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            context: self.context.clone(),
            message: format!("{}", self.error),
        }
    }
}

impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    #[serde(flatten)]
    pub(crate) context: Context,
    pub(crate) message: String,
}

/// Which operation failed, echoed back in error responses.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Context {
    Actions { association: String },
    Attendance { enrollment: String },
    Calendar { year: i32, month: u8 },
    CreateAction { association: String },
    Enroll { action: String, date: String },
    Mask { action: String, date: String },
    Participants { action: String, date: Option<String> },
    Unenroll { enrollment: String },
    UnenrollSeries { enrollment: String },
    Unmask { action: String, date: String },
    UpdateAction { action: String },
}

impl Context {
    pub fn actions(association: String) -> Context {
        Context::Actions { association }
    }

    pub fn attendance(enrollment: String) -> Context {
        Context::Attendance { enrollment }
    }

    pub fn calendar(year: i32, month: u8) -> Context {
        Context::Calendar { year, month }
    }

    pub fn create_action(association: String) -> Context {
        Context::CreateAction { association }
    }

    pub fn enroll(action: String, date: String) -> Context {
        Context::Enroll { action, date }
    }

    pub fn mask(action: String, date: String) -> Context {
        Context::Mask { action, date }
    }

    pub fn participants(action: String, date: Option<String>) -> Context {
        Context::Participants { action, date }
    }

    pub fn unenroll(enrollment: String) -> Context {
        Context::Unenroll { enrollment }
    }

    pub fn unenroll_series(enrollment: String) -> Context {
        Context::UnenrollSeries { enrollment }
    }

    pub fn unmask(action: String, date: String) -> Context {
        Context::Unmask { action, date }
    }

    pub fn update_action(action: String) -> Context {
        Context::UpdateAction { action }
    }
}
