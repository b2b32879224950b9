use serde::Deserialize;

/// Query parameters of the occurrence listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Query parameters of the month grid.
#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    #[serde(default)]
    pub enrolled_only: bool,
}

/// Query parameters of the participant listing.
#[derive(Debug, Deserialize)]
pub struct ParticipantsQuery {
    pub date: Option<String>,
}
