//! Month-grid presentation structure for the calendar view. The grid is
//! built from already-decorated occurrences; all expansion and capacity
//! math happens upstream so the view never recomputes eligibility.

use std::collections::HashMap;

use serde::Serialize;
use time::{Date, Duration};

use crate::datefmt;
use crate::errors::BackendError;
use crate::occurrence::Occurrence;
use crate::recurrence::Window;

/// A Monday-aligned month of whole weeks, including the overflow days
/// needed to complete the first and last week.
#[derive(Clone, Debug, Serialize)]
pub struct MonthGrid {
    pub(crate) year: i32,
    pub(crate) month: u8,
    pub(crate) weeks: Vec<Vec<GridDay>>,
}

impl MonthGrid {
    pub fn weeks(&self) -> &[Vec<GridDay>] {
        &self.weeks
    }
}

/// One cell of the month grid.
#[derive(Clone, Debug, Serialize)]
pub struct GridDay {
    /// The calendar date of the cell.
    #[serde(with = "datefmt::date")]
    pub(crate) date: Date,

    /// Whether the cell belongs to the displayed month or is overflow
    /// from an adjacent one.
    pub(crate) in_month: bool,

    /// The occurrences taking place on this date.
    pub(crate) occurrences: Vec<Occurrence>,
}

impl GridDay {
    pub fn date(&self) -> Date {
        self.date
    }

    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }
}

/// The expansion window guaranteeing full coverage of the displayed
/// month: from mid previous month through mid following month, so the
/// leading and trailing overflow weeks are always populated.
pub fn month_window(year: i32, month: u8) -> Result<Window, BackendError> {
    // Validates the month before any arithmetic on it.
    let _ = first_of_month(year, month)?;

    let (start_year, start_month) = previous_month(year, month);
    let (end_year, end_month) = next_month(year, month);

    let start = mid_month(start_year, start_month)?;
    let end = mid_month(end_year, end_month)?;

    Ok(Window::new(start, end))
}

/// Builds the grid for `year`/`month` from decorated occurrences.
/// `enrolled_only` removes the occurrences the viewer is not enrolled in
/// from each day, after expansion, without altering the grid shape.
pub fn build_month(
    year: i32,
    month: u8,
    occurrences: Vec<Occurrence>,
    enrolled_only: bool,
) -> Result<MonthGrid, BackendError> {
    let first = first_of_month(year, month)?;
    let (next_year, next_month_num) = next_month(year, month);
    let last = first_of_month(next_year, next_month_num)? - Duration::days(1);

    // Lookup container keyed by date, scoped to this one build.
    let mut by_date: HashMap<Date, Vec<Occurrence>> = HashMap::new();

    for occurrence in occurrences {
        if enrolled_only && !occurrence.is_enrolled() {
            continue;
        }

        by_date.entry(occurrence.date()).or_insert_with(Vec::new).push(occurrence);
    }

    let mut weeks = vec![];
    let mut date = monday_on_or_before(first);
    let grid_end = sunday_on_or_after(last);

    while date <= grid_end {
        let mut week = Vec::with_capacity(7);

        for _ in 0..7 {
            week.push(GridDay {
                date,
                in_month: date.month() == month && date.year() == year,
                occurrences: by_date.remove(&date).unwrap_or_default(),
            });

            date = date + Duration::days(1);
        }

        weeks.push(week);
    }

    Ok(MonthGrid { year, month, weeks })
}

fn first_of_month(year: i32, month: u8) -> Result<Date, BackendError> {
    Date::try_from_ymd(year, month, 1).map_err(|_| BackendError::BadRequest)
}

fn mid_month(year: i32, month: u8) -> Result<Date, BackendError> {
    Date::try_from_ymd(year, month, 15).map_err(|_| BackendError::BadRequest)
}

fn previous_month(year: i32, month: u8) -> (i32, u8) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

fn next_month(year: i32, month: u8) -> (i32, u8) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn monday_on_or_before(date: Date) -> Date {
    date - Duration::days(i64::from(date.weekday().number_days_from_monday()))
}

fn sunday_on_or_after(date: Date) -> Date {
    let from_monday = i64::from(date.weekday().number_days_from_monday());

    date + Duration::days(6 - from_monday)
}

#[cfg(test)]
mod tests {
    use time::{OffsetDateTime, Time, Weekday};
    use uuid::Uuid;

    use super::*;
    use crate::action::{
        Action, AgeClassFilter, Eligibility, GenderFilter, NewAction, RepeatKind, Times,
    };
    use crate::enrollment::{Enrollment, EnrollmentStatus};

    fn date(year: i32, month: u8, day: u8) -> Date {
        Date::try_from_ymd(year, month, day).unwrap()
    }

    fn action(anchor: Date) -> Action {
        let now = OffsetDateTime::now_utc();

        Action::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Times {
                created_at: now,
                updated_at: now,
            },
            NewAction {
                title: "Permanence".to_owned(),
                description: String::new(),
                location: None,
                anchor_date: anchor,
                starts_at: Time::try_from_hms(14, 0, 0).unwrap(),
                ends_at: Time::try_from_hms(17, 0, 0).unwrap(),
                repeat: RepeatKind::Weekly,
                responsible: "lea@example.org".to_owned(),
                capacity: 3,
                eligibility: Eligibility::new(GenderFilter::Mixed, AgeClassFilter::Any),
            },
        )
    }

    fn occurrence(action: &Action, on: Date, enrolled: bool) -> Occurrence {
        let now = OffsetDateTime::now_utc();

        let enrollment = if enrolled {
            Some(Enrollment::new(
                Uuid::new_v4(),
                Uuid::new_v4(),
                *action.id(),
                on,
                EnrollmentStatus::Enrolled,
                now,
            ))
        } else {
            None
        };

        Occurrence::project(action, on, 0, enrollment.as_ref(), now)
    }

    #[test]
    fn the_grid_is_whole_weeks_starting_on_monday() {
        // January 2025 starts on a Wednesday and ends on a Friday.
        let grid = build_month(2025, 1, vec![], false).unwrap();

        assert_eq!(grid.weeks.len(), 5);

        for week in grid.weeks() {
            assert_eq!(week.len(), 7);
            assert_eq!(week[0].date().weekday(), Weekday::Monday);
        }

        assert_eq!(grid.weeks[0][0].date(), date(2024, 12, 30));
        assert!(!grid.weeks[0][0].in_month);
        assert_eq!(grid.weeks[4][6].date(), date(2025, 2, 2));
        assert!(!grid.weeks[4][6].in_month);
    }

    #[test]
    fn occurrences_land_on_their_grid_day() {
        let action = action(date(2025, 1, 6));
        let occurrences = vec![
            occurrence(&action, date(2025, 1, 6), false),
            occurrence(&action, date(2025, 1, 13), false),
        ];

        let grid = build_month(2025, 1, occurrences, false).unwrap();

        let monday_week_one = &grid.weeks[1][0];
        assert_eq!(monday_week_one.date(), date(2025, 1, 6));
        assert_eq!(monday_week_one.occurrences().len(), 1);

        let monday_week_two = &grid.weeks[2][0];
        assert_eq!(monday_week_two.occurrences().len(), 1);
    }

    #[test]
    fn overflow_days_can_carry_occurrences() {
        let action = action(date(2024, 12, 30));
        let occurrences = vec![occurrence(&action, date(2024, 12, 30), false)];

        let grid = build_month(2025, 1, occurrences, false).unwrap();

        assert!(!grid.weeks[0][0].in_month);
        assert_eq!(grid.weeks[0][0].occurrences().len(), 1);
    }

    #[test]
    fn enrolled_only_filters_occurrences_but_not_days() {
        let action = action(date(2025, 1, 6));
        let occurrences = vec![
            occurrence(&action, date(2025, 1, 6), true),
            occurrence(&action, date(2025, 1, 13), false),
        ];

        let grid = build_month(2025, 1, occurrences, true).unwrap();

        assert_eq!(grid.weeks.len(), 5);
        assert_eq!(grid.weeks[1][0].occurrences().len(), 1);
        assert!(grid.weeks[2][0].occurrences().is_empty());
    }

    #[test]
    fn the_expansion_window_spans_the_adjacent_mid_months() {
        let window = month_window(2025, 1).unwrap();

        assert_eq!(window.start, date(2024, 12, 15));
        assert_eq!(window.end, date(2025, 2, 15));

        let december = month_window(2024, 12).unwrap();

        assert_eq!(december.start, date(2024, 11, 15));
        assert_eq!(december.end, date(2025, 1, 15));
    }

    #[test]
    fn invalid_months_are_rejected() {
        assert!(build_month(2025, 13, vec![], false).is_err());
        assert!(month_window(2025, 0).is_err());
    }
}
