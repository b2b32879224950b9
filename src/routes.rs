use std::sync::Arc;

use log::{error, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, WithStatus};

use crate::errors::BackendError;

pub mod admin;
mod handlers;
mod query;
mod rejection;
mod response;

pub use internal::*;

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status_code_for(e), "message" => %r.error);
        let flattened = r.flatten();

        return Ok(with_status(json(&flattened), status_code_for(e)));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        UnknownAction(..) | UnknownEnrollment(..) | UnknownOccurrence { .. } => {
            StatusCode::NOT_FOUND
        }
        Full | AlreadyEnrolled | OccurrenceHasEnrollments { .. } => StatusCode::CONFLICT,
        Forbidden => StatusCode::FORBIDDEN,
        UnknownResponsible(..) | InvalidRepeatKind(..) | InvalidStatus(..) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        InvalidId(..) | InvalidDate(..) | BadRequest => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

mod internal {
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{delete, get as g, path as p, path::param as par, post, put, query};

    use super::{handlers, query as q};
    use crate::action::{AgeClass, Gender};
    use crate::actor::{Actor, Role};
    use crate::environment::Environment;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    /// Materializes the identity the gateway attached to the request.
    fn actor() -> impl Filter<Extract = (Actor,), Error = warp::reject::Rejection> + Clone {
        warp::header::<uuid::Uuid>("x-volunteer-id")
            .and(warp::header::<uuid::Uuid>("x-association-id"))
            .and(warp::header::<Role>("x-role"))
            .and(warp::header::optional::<Gender>("x-gender"))
            .and(warp::header::optional::<AgeClass>("x-age-class"))
            .map(
                |volunteer_id, association_id, role, gender, age_class| Actor {
                    volunteer_id,
                    association_id,
                    role,
                    gender,
                    age_class,
                },
            )
    }

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $prefix:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let prefix = environment.urls.$prefix.clone();

            let $route_variable = warp::any()
                .map(move || environment.clone())
                .and(p(prefix))
                .and(actor());

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_list_route => list, actions_path, rt; end(), g(), query::<q::ListQuery>());
    route!(make_create_action_route => create_action, actions_path, rt; end(), post(), warp::body::json());
    route!(make_update_action_route => update_action, actions_path, rt; par::<String>(), end(), put(), warp::body::json());
    route!(make_mask_route => mask, actions_path, rt; par::<String>(), p("masks"), par::<String>(), end(), put());
    route!(make_unmask_route => unmask, actions_path, rt; par::<String>(), p("masks"), par::<String>(), end(), delete());
    route!(make_participants_route => participants, actions_path, rt; par::<String>(), p("participants"), end(), g(), query::<q::ParticipantsQuery>());
    route!(make_enroll_route => enroll, enrollments_path, rt; end(), post(), warp::body::json());
    route!(make_unenroll_route => unenroll, enrollments_path, rt; par::<String>(), end(), delete());
    route!(make_unenroll_series_route => unenroll_series, enrollments_path, rt; par::<String>(), p("future"), end(), delete());
    route!(make_attendance_route => attendance, enrollments_path, rt; par::<String>(), p("status"), end(), put(), warp::body::json());
    route!(make_month_route => month, calendar_path, rt; par::<i32>(), par::<u8>(), end(), g(), query::<q::CalendarQuery>());

    /// Every volunteer-facing route, combined. The caller adds rejection
    /// handling.
    pub fn api(environment: Environment) -> Route {
        make_list_route(environment.clone())
            .or(make_create_action_route(environment.clone()))
            .unify()
            .or(make_update_action_route(environment.clone()))
            .unify()
            .or(make_mask_route(environment.clone()))
            .unify()
            .or(make_unmask_route(environment.clone()))
            .unify()
            .or(make_participants_route(environment.clone()))
            .unify()
            .or(make_enroll_route(environment.clone()))
            .unify()
            .or(make_unenroll_series_route(environment.clone()))
            .unify()
            .or(make_unenroll_route(environment.clone()))
            .unify()
            .or(make_attendance_route(environment.clone()))
            .unify()
            .or(make_month_route(environment))
            .unify()
            .boxed()
    }
}
