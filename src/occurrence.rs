use serde::Serialize;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::action::{Action, RepeatKind};
use crate::datefmt;
use crate::enrollment::{Enrollment, EnrollmentStatus};

/// What one occurrence looks like to a specific viewer. `Full` is derived
/// from the remaining capacity and is never stored.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayState {
    Open,
    Full,
    Enrolled,
    Present,
    Absent,
}

/// An action projected onto one concrete date, decorated for a viewer.
#[derive(Clone, Debug, Serialize)]
pub struct Occurrence {
    /// The action this occurrence derives from.
    pub(crate) action_id: Uuid,

    /// The action's title.
    pub(crate) title: String,

    /// The action's description.
    pub(crate) description: String,

    /// The action's location, if any.
    pub(crate) location: Option<String>,

    /// The concrete date.
    #[serde(with = "datefmt::date")]
    pub(crate) date: Date,

    /// The time of day at which it starts.
    #[serde(with = "datefmt::time_of_day")]
    pub(crate) starts_at: Time,

    /// The time of day at which it ends.
    #[serde(with = "datefmt::time_of_day")]
    pub(crate) ends_at: Time,

    /// The action's repeat rule.
    pub(crate) repeat: RepeatKind,

    /// Whether the date differs from the action's anchor date.
    pub(crate) repeated: bool,

    /// The configured number of places.
    pub(crate) capacity: i32,

    /// The authoritative number of enrollments for this occurrence.
    pub(crate) enrolled_count: i64,

    /// Places left.
    pub(crate) remaining: i64,

    /// The viewer's enrollment, if any.
    pub(crate) enrollment_id: Option<Uuid>,

    /// The viewer's stored status, if enrolled.
    pub(crate) status: Option<EnrollmentStatus>,

    /// Whether the occurrence has already ended.
    pub(crate) is_past: bool,

    /// The state shown to the viewer.
    pub(crate) state: DisplayState,
}

impl Occurrence {
    /// Projects `action` onto `date` for one viewer. `enrolled_count` must
    /// be the authoritative ledger count for (action, date), never the
    /// viewer's own enrollment list.
    pub fn project(
        action: &Action,
        date: Date,
        enrolled_count: i64,
        viewer_enrollment: Option<&Enrollment>,
        now: OffsetDateTime,
    ) -> Occurrence {
        let remaining = i64::from(action.capacity) - enrolled_count;
        let is_past = date.with_time(action.ends_at).assume_utc() <= now;

        let state = match viewer_enrollment.map(Enrollment::status) {
            Some(EnrollmentStatus::Enrolled) => DisplayState::Enrolled,
            Some(EnrollmentStatus::Present) => DisplayState::Present,
            Some(EnrollmentStatus::Absent) => DisplayState::Absent,
            None if remaining <= 0 => DisplayState::Full,
            None => DisplayState::Open,
        };

        Occurrence {
            action_id: action.id,
            title: action.title.clone(),
            description: action.description.clone(),
            location: action.location.clone(),
            date,
            starts_at: action.starts_at,
            ends_at: action.ends_at,
            repeat: action.repeat,
            repeated: date != action.anchor_date,
            capacity: action.capacity,
            enrolled_count,
            remaining,
            enrollment_id: viewer_enrollment.map(|e| *e.id()),
            status: viewer_enrollment.map(Enrollment::status),
            is_past,
            state,
        }
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn is_enrolled(&self) -> bool {
        self.enrollment_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, Time};
    use uuid::Uuid;

    use super::*;
    use crate::action::{
        AgeClassFilter, Eligibility, GenderFilter, NewAction, RepeatKind, Times,
    };

    fn action(capacity: i32, anchor: Date) -> Action {
        let now = OffsetDateTime::now_utc();

        Action::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Times {
                created_at: now,
                updated_at: now,
            },
            NewAction {
                title: "Collecte".to_owned(),
                description: String::new(),
                location: None,
                anchor_date: anchor,
                starts_at: Time::try_from_hms(9, 0, 0).unwrap(),
                ends_at: Time::try_from_hms(12, 0, 0).unwrap(),
                repeat: RepeatKind::Weekly,
                responsible: "lea@example.org".to_owned(),
                capacity,
                eligibility: Eligibility::new(GenderFilter::Mixed, AgeClassFilter::Any),
            },
        )
    }

    fn enrollment(action: &Action, date: Date, status: EnrollmentStatus) -> Enrollment {
        Enrollment::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            *action.id(),
            date,
            status,
            OffsetDateTime::now_utc(),
        )
    }

    #[test]
    fn full_is_derived_only_for_outsiders() {
        let now = OffsetDateTime::now_utc();
        let date = now.date() + Duration::days(7);
        let action = action(2, date);

        let outsider = Occurrence::project(&action, date, 2, None, now);
        assert_eq!(outsider.state, DisplayState::Full);
        assert_eq!(outsider.remaining, 0);

        let mine = enrollment(&action, date, EnrollmentStatus::Enrolled);
        let insider = Occurrence::project(&action, date, 2, Some(&mine), now);
        assert_eq!(insider.state, DisplayState::Enrolled);
    }

    #[test]
    fn attendance_states_win_over_capacity() {
        let now = OffsetDateTime::now_utc();
        let date = now.date() + Duration::days(7);
        let action = action(1, date);

        let mine = enrollment(&action, date, EnrollmentStatus::Present);
        let occurrence = Occurrence::project(&action, date, 1, Some(&mine), now);

        assert_eq!(occurrence.state, DisplayState::Present);
        assert_eq!(occurrence.status, Some(EnrollmentStatus::Present));
    }

    #[test]
    fn is_past_uses_the_end_time_of_the_day() {
        let date = Date::try_from_ymd(2025, 1, 6).unwrap();
        let action = action(2, date);

        let during = date.with_time(Time::try_from_hms(10, 0, 0).unwrap()).assume_utc();
        assert!(!Occurrence::project(&action, date, 0, None, during).is_past);

        let after = date.with_time(Time::try_from_hms(12, 0, 0).unwrap()).assume_utc();
        assert!(Occurrence::project(&action, date, 0, None, after).is_past);
    }

    #[test]
    fn repeated_flags_dates_other_than_the_anchor() {
        let anchor = Date::try_from_ymd(2025, 1, 6).unwrap();
        let action = action(2, anchor);
        let now = OffsetDateTime::now_utc();

        assert!(!Occurrence::project(&action, anchor, 0, None, now).repeated);
        assert!(Occurrence::project(&action, anchor + Duration::weeks(1), 0, None, now).repeated);
    }
}
