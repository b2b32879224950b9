use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use log::{debug, error};
use serde::Deserialize;
use time::{Date, OffsetDateTime};
use uuid::Uuid;
use warp::{
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::action::{Action, NewAction};
use crate::actor::Actor;
use crate::calendar;
use crate::datefmt::{self, DATE_FORMAT};
use crate::enrollment::{Enrollment, EnrollmentStatus};
use crate::environment::Environment;
use crate::errors::BackendError;
use crate::notify::{Notification, Template};
use crate::occurrence::Occurrence;
use crate::reassignment;
use crate::recurrence::{self, Horizon, Window};
use crate::routes::{
    query::{CalendarQuery, ListQuery, ParticipantsQuery},
    rejection::{Context, Rejection},
    response::{Reassignment, SuccessResponse},
};

const SERVER_TIMING_HEADER: &str = "server-timing";
type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($expression:stmt);+) => {
        let start = Instant::now();

        // TODO when `try` blocks are stabilized, we can wrap the body
        // and return the headers even on errors
        let result = { $($expression)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

/// The body of an enrollment request. Administrators may enroll another
/// volunteer; everyone else enrolls themselves.
#[derive(Debug, Deserialize)]
pub struct EnrollmentRequest {
    pub action_id: Uuid,
    pub date: String,
    #[serde(default)]
    pub volunteer_id: Option<Uuid>,
}

/// The body of an attendance update.
#[derive(Debug, Deserialize)]
pub struct AttendanceRequest {
    pub status: EnrollmentStatus,
}

pub async fn list(environment: Environment, actor: Actor, query: ListQuery) -> RouteResult {
    timed! {
        let error_handler =
            |e: BackendError| Rejection::new(Context::actions(actor.association_id.to_string()), e);

        let now = OffsetDateTime::now_utc();
        let today = now.date();

        let from = match &query.from {
            Some(s) => parse_date(s).map_err(error_handler)?,
            None => today,
        };
        let to = match &query.to {
            Some(s) => parse_date(s).map_err(error_handler)?,
            None => today
                + time::Duration::days(i64::from(environment.config.responsible_horizon_days)),
        };

        ensure(from <= to, BackendError::BadRequest).map_err(error_handler)?;

        let window = Window::new(from, to);

        debug!(environment.logger, "Listing occurrences..."; "association" => %actor.association_id, "from" => %from, "to" => %to);

        let actions = environment
            .db
            .list_actions(&actor.association_id)
            .await
            .map_err(error_handler)?;

        let occurrences = decorated_occurrences(&environment, &actor, &actions, window, today, now)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::Occurrences { occurrences })
    }
}

pub async fn month(
    environment: Environment,
    actor: Actor,
    year: i32,
    month: u8,
    query: CalendarQuery,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::calendar(year, month), e);

        let now = OffsetDateTime::now_utc();
        let today = now.date();

        let window = calendar::month_window(year, month).map_err(error_handler)?;

        debug!(environment.logger, "Building month grid..."; "association" => %actor.association_id, "year" => year, "month" => month);

        let actions = environment
            .db
            .list_actions(&actor.association_id)
            .await
            .map_err(error_handler)?;

        let occurrences = decorated_occurrences(&environment, &actor, &actions, window, today, now)
            .await
            .map_err(error_handler)?;

        let grid = calendar::build_month(year, month, occurrences, query.enrolled_only)
            .map_err(error_handler)?;

        json(&SuccessResponse::Month(grid))
    }
}

pub async fn create_action(
    environment: Environment,
    actor: Actor,
    definition: NewAction,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| {
            Rejection::new(Context::create_action(actor.association_id.to_string()), e)
        };

        ensure(actor.is_admin(), BackendError::Forbidden).map_err(error_handler)?;
        validate_definition(&definition).map_err(error_handler)?;

        debug!(environment.logger, "Resolving responsible person..."; "responsible" => &definition.responsible);
        let responsible_id = environment
            .directory
            .resolve(&definition.responsible)
            .await
            .map_err(error_handler)?
            .ok_or_else(|| {
                error_handler(BackendError::UnknownResponsible(definition.responsible.clone()))
            })?;

        debug!(environment.logger, "Writing action to database...");
        let action = environment
            .db
            .insert_action(&actor.association_id, definition)
            .await
            .map_err(error_handler)?;

        debug!(environment.logger, "Seeding the responsible person's standing enrollment..."; "action" => %action.id());
        let today = OffsetDateTime::now_utc().date();
        let (covered_occurrences, _) = reassignment::cover_future_occurrences(
            &environment.logger,
            &environment.db,
            &responsible_id,
            &action,
            today,
        )
        .await
        .map_err(error_handler)?;

        let location = environment.urls.action(action.id());
        let response = SuccessResponse::ActionCreated {
            action,
            covered_occurrences,
        };

        with_header(
            with_status(json(&response), StatusCode::CREATED),
            "location",
            location.as_str(),
        )
    }
}

pub async fn update_action(
    environment: Environment,
    actor: Actor,
    id: String,
    definition: NewAction,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::update_action(id.clone()), e);

        let action_id = parse_id(&id).map_err(error_handler)?;

        ensure(actor.is_admin(), BackendError::Forbidden).map_err(error_handler)?;
        validate_definition(&definition).map_err(error_handler)?;

        let action = retrieve_action(&environment, &action_id)
            .await
            .map_err(error_handler)?;

        ensure(
            actor.administers(action.association_id()),
            BackendError::Forbidden,
        )
        .map_err(error_handler)?;

        // The cascade runs against the schedule being saved, but still
        // resolves the currently stored responsible for the removal
        // half; it runs before the update is persisted, so an
        // unresolvable new responsible rejects the whole update.
        let reassignment = match definition.responsible != *action.responsible() {
            true => {
                debug!(environment.logger, "Responsible changed; migrating standing enrollment..."; "action" => %action.id());

                let preview = Action {
                    responsible: action.responsible().to_owned(),
                    ..action.with_definition(&definition)
                };

                let today = OffsetDateTime::now_utc().date();
                let outcome = reassignment::reassign(
                    environment.logger.clone(),
                    environment.db.clone(),
                    environment.directory.clone(),
                    &preview,
                    &definition.responsible,
                    today,
                )
                .await
                .map_err(error_handler)?;

                Some(Reassignment::from(&outcome))
            }
            false => None,
        };

        debug!(environment.logger, "Applying action changes..."; "action" => %action.id());
        let action = environment
            .db
            .update_action(&action_id, definition)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::ActionUpdated {
            action,
            reassignment,
        })
    }
}

pub async fn enroll(
    environment: Environment,
    actor: Actor,
    request: EnrollmentRequest,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| {
            Rejection::new(
                Context::enroll(request.action_id.to_string(), request.date.clone()),
                e,
            )
        };

        let date = parse_date(&request.date).map_err(error_handler)?;

        let volunteer_id = resolve_enrollment_target(&actor, request.volunteer_id)
            .map_err(error_handler)?;

        let action = retrieve_action(&environment, &request.action_id)
            .await
            .map_err(error_handler)?;

        ensure(
            action.association_id() == &actor.association_id,
            BackendError::Forbidden,
        )
        .map_err(error_handler)?;
        ensure(
            actor.is_admin() || action.eligibility.admits(&actor.profile()),
            BackendError::Forbidden,
        )
        .map_err(error_handler)?;

        let now = OffsetDateTime::now_utc();
        let today = now.date();

        ensure_enrollable(&environment, &actor, &action, date, today)
            .await
            .map_err(error_handler)?;

        debug!(environment.logger, "Writing enrollment to ledger..."; "action" => %action.id(), "volunteer" => %volunteer_id, "date" => %date);
        let enrollment = environment
            .db
            .insert_enrollment(&volunteer_id, &action, date)
            .await
            .map_err(error_handler)?;

        let enrolled = environment
            .db
            .count_enrollments(action.id(), date)
            .await
            .map_err(error_handler)?;
        let remaining = i64::from(action.capacity) - enrolled;

        debug!(environment.logger, "Dispatching enrollment notifications...");
        notify_both_parties(
            &environment,
            &action,
            &enrollment,
            Template::EnrollmentCreated,
            "Enrollment confirmed",
        )
        .await;

        let response = SuccessResponse::Enrolled {
            enrollment,
            remaining,
        };

        with_status(json(&response), StatusCode::CREATED)
    }
}

pub async fn unenroll(environment: Environment, actor: Actor, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::unenroll(id.clone()), e);

        let enrollment_id = parse_id(&id).map_err(error_handler)?;

        let enrollment = retrieve_enrollment(&environment, &enrollment_id)
            .await
            .map_err(error_handler)?;
        let action = retrieve_action(&environment, &enrollment.action_id)
            .await
            .map_err(error_handler)?;

        authorize_over_enrollment(&actor, &enrollment, &action).map_err(error_handler)?;

        debug!(environment.logger, "Deleting enrollment..."; "enrollment" => %enrollment.id());
        environment
            .db
            .delete_enrollment(&enrollment_id)
            .await
            .map_err(error_handler)?;

        debug!(environment.logger, "Dispatching cancellation notifications...");
        notify_both_parties(
            &environment,
            &action,
            &enrollment,
            Template::EnrollmentCancelled,
            "Enrollment cancelled",
        )
        .await;

        StatusCode::NO_CONTENT
    }
}

pub async fn unenroll_series(environment: Environment, actor: Actor, id: String) -> RouteResult {
    timed! {
        let error_handler =
            |e: BackendError| Rejection::new(Context::unenroll_series(id.clone()), e);

        let enrollment_id = parse_id(&id).map_err(error_handler)?;

        let enrollment = retrieve_enrollment(&environment, &enrollment_id)
            .await
            .map_err(error_handler)?;
        let action = retrieve_action(&environment, &enrollment.action_id)
            .await
            .map_err(error_handler)?;

        authorize_over_enrollment(&actor, &enrollment, &action).map_err(error_handler)?;

        ensure(
            action.repeat().repeats(),
            BackendError::InvalidRepeatKind(action.repeat().as_str().to_owned()),
        )
        .map_err(error_handler)?;

        debug!(environment.logger, "Deleting future enrollments..."; "enrollment" => %enrollment.id(), "from" => %enrollment.occurs_on());
        let removed = environment
            .db
            .delete_future_enrollments(
                enrollment.volunteer_id(),
                &enrollment.action_id,
                enrollment.occurs_on(),
            )
            .await
            .map_err(error_handler)?;

        let from = removed.first().map(|d| datefmt::format_date(*d));
        let to = removed.last().map(|d| datefmt::format_date(*d));

        // One summary notification for the whole series, not one per
        // occurrence.
        debug!(environment.logger, "Dispatching series cancellation notification...");
        notify_both_parties(
            &environment,
            &action,
            &enrollment,
            Template::SeriesCancelled,
            "Series cancelled",
        )
        .await;

        json(&SuccessResponse::SeriesCancelled {
            removed: removed.len(),
            from,
            to,
        })
    }
}

pub async fn attendance(
    environment: Environment,
    actor: Actor,
    id: String,
    request: AttendanceRequest,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::attendance(id.clone()), e);

        let enrollment_id = parse_id(&id).map_err(error_handler)?;

        let enrollment = retrieve_enrollment(&environment, &enrollment_id)
            .await
            .map_err(error_handler)?;
        let action = retrieve_action(&environment, &enrollment.action_id)
            .await
            .map_err(error_handler)?;

        ensure(
            actor.administers(action.association_id()),
            BackendError::Forbidden,
        )
        .map_err(error_handler)?;

        // Only the attendance states can be assigned; re-opening an
        // enrollment means deleting and recreating it.
        ensure(
            request.status != EnrollmentStatus::Enrolled,
            BackendError::BadRequest,
        )
        .map_err(error_handler)?;

        debug!(environment.logger, "Updating enrollment status..."; "enrollment" => %enrollment.id(), "status" => request.status.as_str());
        let enrollment = environment
            .db
            .update_enrollment_status(&enrollment_id, request.status)
            .await
            .map_err(error_handler)?;

        confirm_presence(&environment, request.status, &enrollment).await;

        json(&SuccessResponse::Attendance { enrollment })
    }
}

pub async fn mask(environment: Environment, actor: Actor, id: String, date: String) -> RouteResult {
    timed! {
        let error_handler =
            |e: BackendError| Rejection::new(Context::mask(id.clone(), date.clone()), e);

        let action_id = parse_id(&id).map_err(error_handler)?;
        let parsed = parse_date(&date).map_err(error_handler)?;

        let action = retrieve_action(&environment, &action_id)
            .await
            .map_err(error_handler)?;

        ensure(
            actor.administers(action.association_id()),
            BackendError::Forbidden,
        )
        .map_err(error_handler)?;
        ensure(
            recurrence::is_occurrence_date(&action, parsed),
            BackendError::UnknownOccurrence {
                action: action_id,
                date: parsed,
            },
        )
        .map_err(error_handler)?;

        // The responsible person's standing enrollment is system-managed
        // and retracted with the mask; anyone else's enrollment blocks
        // the mask, since masking never cancels a volunteer's
        // registration.
        let standing = standing_enrollment(&environment, &action, parsed)
            .await
            .map_err(error_handler)?;

        let enrolled = environment
            .db
            .count_enrollments(&action_id, parsed)
            .await
            .map_err(error_handler)?;
        let others = enrolled - standing.as_ref().map_or(0, |_| 1);

        ensure(
            others == 0,
            BackendError::OccurrenceHasEnrollments { count: others },
        )
        .map_err(error_handler)?;

        retract_standing_enrollment(&environment, standing)
            .await
            .map_err(error_handler)?;

        debug!(environment.logger, "Masking occurrence..."; "action" => %action_id, "date" => %parsed);
        environment
            .db
            .add_mask(&action_id, parsed, &actor.association_id)
            .await
            .map_err(error_handler)?;

        StatusCode::NO_CONTENT
    }
}

/// The responsible person's enrollment for one occurrence, if any.
async fn standing_enrollment(
    environment: &Environment,
    action: &Action,
    date: Date,
) -> Result<Option<Enrollment>, BackendError> {
    let responsible_id = match environment.directory.resolve(action.responsible()).await? {
        Some(id) => id,
        None => return Ok(None),
    };

    let single_day = Window::new(date, date);

    Ok(environment
        .db
        .enrollments_for_volunteer(&responsible_id, action.id(), single_day)
        .await?
        .into_iter()
        .next())
}

async fn retract_standing_enrollment(
    environment: &Environment,
    standing: Option<Enrollment>,
) -> Result<(), BackendError> {
    match standing {
        Some(enrollment) => {
            debug!(environment.logger, "Retracting standing enrollment..."; "enrollment" => %enrollment.id());

            environment.db.delete_enrollment(enrollment.id()).await
        }
        None => Ok(()),
    }
}

pub async fn unmask(
    environment: Environment,
    actor: Actor,
    id: String,
    date: String,
) -> RouteResult {
    timed! {
        let error_handler =
            |e: BackendError| Rejection::new(Context::unmask(id.clone(), date.clone()), e);

        let action_id = parse_id(&id).map_err(error_handler)?;
        let parsed = parse_date(&date).map_err(error_handler)?;

        let action = retrieve_action(&environment, &action_id)
            .await
            .map_err(error_handler)?;

        ensure(
            actor.administers(action.association_id()),
            BackendError::Forbidden,
        )
        .map_err(error_handler)?;

        debug!(environment.logger, "Unmasking occurrence..."; "action" => %action_id, "date" => %parsed);
        let removed = environment
            .db
            .remove_mask(&action_id, parsed)
            .await
            .map_err(error_handler)?;

        ensure(
            removed,
            BackendError::UnknownOccurrence {
                action: action_id,
                date: parsed,
            },
        )
        .map_err(error_handler)?;

        StatusCode::NO_CONTENT
    }
}

pub async fn participants(
    environment: Environment,
    actor: Actor,
    id: String,
    query: ParticipantsQuery,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| {
            Rejection::new(Context::participants(id.clone(), query.date.clone()), e)
        };

        let action_id = parse_id(&id).map_err(error_handler)?;
        let date = match &query.date {
            Some(s) => parse_date(s).map_err(error_handler)?,
            None => return Err(error_handler(BackendError::BadRequest).into()),
        };

        let action = retrieve_action(&environment, &action_id)
            .await
            .map_err(error_handler)?;

        let allowed = may_view_participants(&environment, &actor, &action)
            .await
            .map_err(error_handler)?;

        ensure(allowed, BackendError::Forbidden).map_err(error_handler)?;

        let participants = environment
            .db
            .participants(&action_id, date)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::Participants {
            action: action_id.to_string(),
            date: datefmt::format_date(date),
            participants,
        })
    }
}

fn ensure(condition: bool, error: BackendError) -> Result<(), BackendError> {
    if condition {
        Ok(())
    } else {
        Err(error)
    }
}

fn validate_definition(definition: &NewAction) -> Result<(), BackendError> {
    ensure(definition.capacity >= 1, BackendError::BadRequest)?;
    ensure(
        definition.starts_at < definition.ends_at,
        BackendError::BadRequest,
    )?;

    Ok(())
}

/// Enrolling someone else is an administrator privilege.
fn resolve_enrollment_target(
    actor: &Actor,
    requested: Option<Uuid>,
) -> Result<Uuid, BackendError> {
    match requested {
        Some(id) if id != actor.volunteer_id => {
            ensure(actor.is_admin(), BackendError::Forbidden)?;

            Ok(id)
        }
        _ => Ok(actor.volunteer_id),
    }
}

async fn retrieve_action(environment: &Environment, id: &Uuid) -> Result<Action, BackendError> {
    environment
        .db
        .retrieve_action(id)
        .await?
        .ok_or(BackendError::UnknownAction(*id))
}

async fn retrieve_enrollment(
    environment: &Environment,
    id: &Uuid,
) -> Result<Enrollment, BackendError> {
    environment
        .db
        .retrieve_enrollment(id)
        .await?
        .ok_or(BackendError::UnknownEnrollment(*id))
}

/// Only the owning volunteer and the owning association's administrators
/// may touch an enrollment.
fn authorize_over_enrollment(
    actor: &Actor,
    enrollment: &Enrollment,
    action: &Action,
) -> Result<(), BackendError> {
    ensure(
        enrollment.volunteer_id() == &actor.volunteer_id
            || actor.administers(action.association_id()),
        BackendError::Forbidden,
    )
}

/// Only the responsible person and the owning association's
/// administrators may see who enrolled.
async fn may_view_participants(
    environment: &Environment,
    actor: &Actor,
    action: &Action,
) -> Result<bool, BackendError> {
    if actor.administers(action.association_id()) {
        return Ok(true);
    }

    let responsible_id = environment.directory.resolve(action.responsible()).await?;

    Ok(responsible_id == Some(actor.volunteer_id))
}

/// Verifies that (action, date) denotes an occurrence the actor may
/// enroll into: on the pattern, not in the past, within the actor's
/// horizon and not masked.
async fn ensure_enrollable(
    environment: &Environment,
    actor: &Actor,
    action: &Action,
    date: Date,
    today: Date,
) -> Result<(), BackendError> {
    let unknown = || BackendError::UnknownOccurrence {
        action: *action.id(),
        date,
    };

    if !recurrence::is_occurrence_date(action, date) || date < today {
        return Err(unknown());
    }

    let horizon = horizon_for(environment, actor, action, today).await?;

    if !horizon.admits(date) {
        return Err(unknown());
    }

    if environment.db.is_masked(action.id(), date).await? {
        return Err(unknown());
    }

    Ok(())
}

/// The horizon policy: administrators are unbounded, the action's
/// responsible person sees further than other volunteers.
async fn horizon_for(
    environment: &Environment,
    actor: &Actor,
    action: &Action,
    today: Date,
) -> Result<Horizon, BackendError> {
    if actor.is_admin() {
        return Ok(Horizon::Unbounded);
    }

    let responsible_id = environment.directory.resolve(action.responsible()).await?;

    let days = if responsible_id == Some(actor.volunteer_id) {
        environment.config.responsible_horizon_days
    } else {
        environment.config.volunteer_horizon_days
    };

    Ok(Horizon::days_from(today, days))
}

/// Expands every listed action over `window` and decorates the result
/// for the viewing actor. Lookups are keyed containers scoped to this
/// one request.
async fn decorated_occurrences(
    environment: &Environment,
    actor: &Actor,
    actions: &[Action],
    window: Window,
    today: Date,
    now: OffsetDateTime,
) -> Result<Vec<Occurrence>, BackendError> {
    let mut occurrences = vec![];

    for action in actions {
        let responsible_id = environment.directory.resolve(action.responsible()).await?;
        let is_responsible = responsible_id == Some(actor.volunteer_id);

        // The responsible person always sees their own action, whatever
        // its eligibility filter says.
        if !actor.is_admin() && !is_responsible && !action.eligibility.admits(&actor.profile()) {
            continue;
        }

        let horizon = if actor.is_admin() {
            Horizon::Unbounded
        } else if is_responsible {
            Horizon::days_from(today, environment.config.responsible_horizon_days)
        } else {
            Horizon::days_from(today, environment.config.volunteer_horizon_days)
        };

        let masked: HashSet<Date> = environment
            .db
            .masked_dates(action.id(), window)
            .await?
            .into_iter()
            .collect();

        let dates = recurrence::expand(action, window, horizon, &masked);

        if dates.is_empty() {
            continue;
        }

        let counts: HashMap<Date, i64> = environment
            .db
            .enrollment_counts(action.id(), window)
            .await?
            .into_iter()
            .collect();

        let mine: HashMap<Date, Enrollment> = environment
            .db
            .enrollments_for_volunteer(&actor.volunteer_id, action.id(), window)
            .await?
            .into_iter()
            .map(|e| (e.occurs_on(), e))
            .collect();

        for date in dates {
            occurrences.push(Occurrence::project(
                action,
                date,
                counts.get(&date).copied().unwrap_or(0),
                mine.get(&date),
                now,
            ));
        }
    }

    occurrences.sort_by(|a, b| (a.date, a.starts_at, &a.title).cmp(&(b.date, b.starts_at, &b.title)));

    Ok(occurrences)
}

/// On a transition to `present`, tells the volunteer directory to
/// confirm the profile. Failures are logged and swallowed; the ledger
/// update stands either way.
async fn confirm_presence(
    environment: &Environment,
    status: EnrollmentStatus,
    enrollment: &Enrollment,
) {
    if status != EnrollmentStatus::Present {
        return;
    }

    debug!(environment.logger, "Confirming volunteer..."; "volunteer" => %enrollment.volunteer_id());

    if let Err(e) = environment.directory.confirm(enrollment.volunteer_id()).await {
        error!(environment.logger, "Failed to confirm volunteer"; "volunteer" => %enrollment.volunteer_id(), "error" => format!("{:?}", e));
    }
}

/// Sends the same templated message to the volunteer and to the action's
/// responsible person. Delivery failures are logged and swallowed; they
/// never fail the mutation that triggered them.
async fn notify_both_parties(
    environment: &Environment,
    action: &Action,
    enrollment: &Enrollment,
    template: Template,
    subject: &str,
) {
    let volunteer_contact = match environment.directory.contact(enrollment.volunteer_id()).await {
        Ok(contact) => contact,
        Err(e) => {
            error!(environment.logger, "Failed to look up volunteer contact"; "volunteer" => %enrollment.volunteer_id(), "error" => format!("{:?}", e));

            None
        }
    };

    let recipients = volunteer_contact
        .into_iter()
        .chain(std::iter::once(action.responsible().to_owned()));

    for recipient in recipients {
        let notification = Notification::new(recipient, template, subject)
            .with_variable("action", action.title.clone())
            .with_variable("date", datefmt::format_date(enrollment.occurs_on()))
            .with_variable("link", environment.urls.action(action.id()).to_string());

        dispatch(environment, notification).await;
    }
}

async fn dispatch(environment: &Environment, notification: Notification) {
    if let Err(e) = environment.notifier.send(notification).await {
        error!(environment.logger, "Failed to dispatch notification"; "error" => format!("{:?}", e));
    }
}

fn parse_id(s: &str) -> Result<Uuid, BackendError> {
    Uuid::parse_str(s).map_err(|_| BackendError::InvalidId(s.to_owned()))
}

fn parse_date(s: &str) -> Result<Date, BackendError> {
    Date::parse(s, DATE_FORMAT).map_err(|_| BackendError::InvalidDate(s.to_owned()))
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}
