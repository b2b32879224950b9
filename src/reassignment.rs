//! Keeps the responsible person's standing enrollment aligned with an
//! action's future occurrences. A responsible person is implicitly
//! enrolled in every future occurrence of their action; changing the
//! responsible reference migrates that standing RSVP from the old person
//! to the new one.

use std::sync::Arc;

use log::{debug, trace, warn, Logger};
use time::Date;
use uuid::Uuid;

use crate::action::Action;
use crate::environment::{SafeDb, SafeDirectory};
use crate::errors::BackendError;
use crate::recurrence::future_dates;

/// What a cascade run did, for logging and for the response body.
#[derive(Clone, Debug)]
pub struct CascadeOutcome {
    /// Enrollments removed from the old responsible person.
    pub removed: usize,

    /// Enrollments created for the new responsible person.
    pub created: usize,

    /// The dates now covered.
    pub covered: Vec<Date>,
}

/// Migrates the standing RSVP of `action` from its stored responsible
/// person to `new_responsible`, recomputing "future" relative to `today`
/// rather than to the action's anchor date.
///
/// The removal half is best-effort: when the old responsible cannot be
/// resolved any more, it is skipped and the cascade continues. The
/// insertion half is idempotent, so a cascade interrupted between the two
/// halves can simply be run again.
pub async fn reassign(
    logger: Arc<Logger>,
    db: Arc<SafeDb>,
    directory: Arc<SafeDirectory>,
    action: &Action,
    new_responsible: &str,
    today: Date,
) -> Result<CascadeOutcome, BackendError> {
    let new_id = directory
        .resolve(new_responsible)
        .await?
        .ok_or_else(|| BackendError::UnknownResponsible(new_responsible.to_owned()))?;

    let removed = match directory.resolve(action.responsible()).await? {
        Some(old_id) => {
            let dates = db
                .delete_future_enrollments(&old_id, action.id(), today)
                .await?;

            debug!(
                logger,
                "Removed future enrollments of previous responsible";
                "action" => %action.id(),
                "volunteer" => %old_id,
                "count" => dates.len()
            );

            dates.len()
        }
        None => {
            warn!(
                logger,
                "Previous responsible could not be resolved; skipping removal";
                "action" => %action.id(),
                "responsible" => action.responsible()
            );

            0
        }
    };

    let (created, covered) = cover_future_occurrences(&logger, &db, &new_id, action, today).await?;

    Ok(CascadeOutcome {
        removed,
        created,
        covered,
    })
}

/// Enrolls `volunteer_id` in every future occurrence of `action`,
/// skipping the dates already covered. Used both by the cascade and when
/// seeding a freshly created action.
pub async fn cover_future_occurrences(
    logger: &Arc<Logger>,
    db: &Arc<SafeDb>,
    volunteer_id: &Uuid,
    action: &Action,
    today: Date,
) -> Result<(usize, Vec<Date>), BackendError> {
    let dates = future_dates(action, today);
    let mut created = 0;

    for date in &dates {
        trace!(
            logger,
            "Covering occurrence";
            "action" => %action.id(),
            "volunteer" => %volunteer_id,
            "date" => %date
        );

        if db
            .insert_standing_enrollment(volunteer_id, action.id(), *date)
            .await?
        {
            created += 1;
        }
    }

    debug!(
        logger,
        "Covered future occurrences";
        "action" => %action.id(),
        "volunteer" => %volunteer_id,
        "created" => created,
        "dates" => dates.len()
    );

    Ok((created, dates))
}
