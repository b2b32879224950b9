//! The recurrence expander: the single authoritative translation of an
//! action definition into concrete occurrence dates. Both read paths
//! (listing, calendar) and write paths (enrollment checks, reassignment)
//! go through this module; nothing else recomputes occurrence dates.

use std::cmp;
use std::collections::HashSet;

use time::{Date, Duration};

use crate::action::{Action, RepeatKind};

/// How many daily occurrences a standing enrollment covers.
pub(crate) const DAILY_SPAN_DAYS: i64 = 365;

/// How many weekly occurrences a standing enrollment covers.
pub(crate) const WEEKLY_SPAN: i64 = 52;

/// An inclusive date window requested by a caller.
#[derive(Clone, Copy, Debug)]
pub struct Window {
    pub start: Date,
    pub end: Date,
}

impl Window {
    pub fn new(start: Date, end: Date) -> Self {
        Window { start, end }
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The furthest future date a caller may see or enroll into. The policy
/// (30 days for volunteers, 90 for responsible persons, unbounded for
/// administrators) belongs to the caller, not to the expander.
#[derive(Clone, Copy, Debug)]
pub enum Horizon {
    Bounded(Date),
    Unbounded,
}

impl Horizon {
    /// A horizon reaching `days` days past `today`.
    pub fn days_from(today: Date, days: u16) -> Horizon {
        Horizon::Bounded(today + Duration::days(i64::from(days)))
    }

    pub fn admits(&self, date: Date) -> bool {
        match self {
            Horizon::Bounded(cutoff) => date <= *cutoff,
            Horizon::Unbounded => true,
        }
    }
}

/// Expands `action` into its occurrence dates within `window`, capped by
/// `horizon`, with masked dates removed. Deterministic and stateless;
/// dates come out in ascending order, one per pattern step.
///
/// The iteration always walks from the anchor date rather than jumping to
/// the window start, so the yielded dates stay aligned with the anchor's
/// step grid.
pub fn expand(action: &Action, window: Window, horizon: Horizon, masked: &HashSet<Date>) -> Vec<Date> {
    let step = match action.repeat {
        RepeatKind::None => {
            let date = action.anchor_date;

            if window.contains(date) && horizon.admits(date) && !masked.contains(&date) {
                return vec![date];
            }

            return vec![];
        }
        RepeatKind::Daily => Duration::days(1),
        RepeatKind::Weekly => Duration::weeks(1),
    };

    let mut dates = vec![];
    let mut date = action.anchor_date;

    while date <= window.end && horizon.admits(date) {
        if date >= window.start && !masked.contains(&date) {
            dates.push(date);
        }

        date = date + step;
    }

    dates
}

/// Whether `date` lies on the action's occurrence grid at all, masking
/// and horizons aside.
pub fn is_occurrence_date(action: &Action, date: Date) -> bool {
    match action.repeat {
        RepeatKind::None => date == action.anchor_date,
        RepeatKind::Daily => date >= action.anchor_date,
        RepeatKind::Weekly => {
            date >= action.anchor_date && date.weekday() == action.anchor_date.weekday()
        }
    }
}

/// The occurrence dates a standing enrollment must cover, anchored at
/// `today` rather than at the action's anchor date. Used when seeding or
/// migrating the responsible person's implicit RSVP.
///
/// When today falls on the anchor weekday of a started weekly action, the
/// first covered date is next week's occurrence, not today's.
pub fn future_dates(action: &Action, today: Date) -> Vec<Date> {
    match action.repeat {
        RepeatKind::None => {
            if action.anchor_date >= today {
                vec![action.anchor_date]
            } else {
                vec![]
            }
        }
        RepeatKind::Daily => {
            let start = cmp::max(today, action.anchor_date);

            (0..DAILY_SPAN_DAYS).map(|i| start + Duration::days(i)).collect()
        }
        RepeatKind::Weekly => {
            let start = if action.anchor_date >= today {
                action.anchor_date
            } else {
                let anchor_weekday = i64::from(action.anchor_date.weekday().number_days_from_monday());
                let today_weekday = i64::from(today.weekday().number_days_from_monday());

                let ahead = match (anchor_weekday - today_weekday).rem_euclid(7) {
                    0 => 7,
                    days => days,
                };

                today + Duration::days(ahead)
            };

            (0..WEEKLY_SPAN).map(|i| start + Duration::weeks(i)).collect()
        }
    }
}
