use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::{json, Value};
use time::{Duration, OffsetDateTime, Weekday};
use uuid::Uuid;
use warp::http::StatusCode;
use warp::Filter;

use backend::datefmt::DATE_FORMAT;
use backend::db::memory::MemoryDb;
use backend::directory::mock::MockDirectory;
use backend::environment::{Config, Environment};
use backend::notify::mock::MockNotifier;
use backend::notify::Template;
use backend::routes;
use backend::urls::Urls;
use log::Logger;

static LOGGER: Lazy<Arc<Logger>> = Lazy::new(|| Arc::new(log::discard_logger()));

const VOLUNTEER_HORIZON_DAYS: u16 = 30;
const RESPONSIBLE_HORIZON_DAYS: u16 = 90;
const WEEKLY_COVERAGE: usize = 52;

struct World {
    environment: Environment,
    db: Arc<MemoryDb>,
    directory: Arc<MockDirectory>,
    notifier: Arc<MockNotifier>,
    association: Uuid,
}

#[derive(Clone)]
struct TestActor {
    id: Uuid,
    association: Uuid,
    role: &'static str,
    gender: Option<&'static str>,
    age_class: Option<&'static str>,
}

fn world() -> World {
    let db = Arc::new(MemoryDb::new());
    let directory = Arc::new(MockDirectory::new());
    let notifier = Arc::new(MockNotifier::new());

    let urls = Arc::new(Urls::new("https://backoffice.example.org/", "actions"));
    let config = Config::new(VOLUNTEER_HORIZON_DAYS, RESPONSIBLE_HORIZON_DAYS);

    let environment = Environment::new(
        LOGGER.clone(),
        db.clone(),
        directory.clone(),
        notifier.clone(),
        urls,
        config,
    );

    World {
        environment,
        db,
        directory,
        notifier,
        association: Uuid::new_v4(),
    }
}

impl World {
    fn admin(&self) -> TestActor {
        TestActor {
            id: self.directory.register("admin@example.org"),
            association: self.association,
            role: "administrator",
            gender: None,
            age_class: None,
        }
    }

    fn volunteer(&self, email: &str) -> TestActor {
        let id = self.directory.register(email);
        self.db.register_volunteer(&id, email, email);

        TestActor {
            id,
            association: self.association,
            role: "volunteer",
            gender: Some("female"),
            age_class: Some("adult"),
        }
    }

    fn responsible(&self, email: &str) -> (TestActor, Uuid) {
        let actor = self.volunteer(email);
        let id = actor.id;

        (actor, id)
    }

    async fn reply(
        &self,
        request: warp::test::RequestBuilder,
        actor: &TestActor,
    ) -> (StatusCode, Value) {
        let logger = LOGGER.clone();
        let filter = routes::api(self.environment.clone())
            .recover(move |r| routes::format_rejection(logger.clone(), r));

        let mut request = request
            .header("x-volunteer-id", actor.id.to_string())
            .header("x-association-id", actor.association.to_string())
            .header("x-role", actor.role);

        if let Some(gender) = actor.gender {
            request = request.header("x-gender", gender);
        }

        if let Some(age_class) = actor.age_class {
            request = request.header("x-age-class", age_class);
        }

        let response = request.reply(&filter).await;
        let status = response.status();

        let body = if response.body().is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(response.body()).expect("parse response body as JSON")
        };

        (status, body)
    }
}

fn today() -> time::Date {
    OffsetDateTime::now_utc().date()
}

/// The next date with the given weekday, at least `weeks` whole weeks
/// ahead, so every test date is comfortably inside the volunteer
/// horizon.
fn upcoming(weekday: Weekday, weeks: i64) -> time::Date {
    let mut date = today() + Duration::days(1);

    while date.weekday() != weekday {
        date = date + Duration::days(1);
    }

    date + Duration::weeks(weeks - 1)
}

fn iso(date: time::Date) -> String {
    date.format(DATE_FORMAT)
}

fn weekly_action_body(responsible: &str, anchor: time::Date, capacity: i32) -> Value {
    json!({
        "title": "Distribution alimentaire",
        "description": "Aide à la distribution",
        "location": "Entrepôt central",
        "anchor_date": iso(anchor),
        "starts_at": "09:00:00",
        "ends_at": "12:00:00",
        "repeat": "weekly",
        "responsible": responsible,
        "capacity": capacity,
        "gender_filter": "mixed",
        "age_filter": "any"
    })
}

async fn create_weekly_action(
    world: &World,
    admin: &TestActor,
    responsible: &str,
    anchor: time::Date,
    capacity: i32,
) -> Uuid {
    let (status, body) = world
        .reply(
            warp::test::request()
                .path("/actions")
                .method("POST")
                .json(&weekly_action_body(responsible, anchor, capacity)),
            admin,
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "create action: {}", body);

    body["action"]["id"]
        .as_str()
        .expect("response carries the action ID")
        .parse()
        .expect("parse action ID")
}

#[tokio::test]
async fn creating_an_action_seeds_the_responsible_coverage() {
    let world = world();
    let admin = world.admin();
    let (_, responsible_id) = world.responsible("lea@example.org");

    let anchor = upcoming(Weekday::Monday, 1);

    let (status, body) = world
        .reply(
            warp::test::request()
                .path("/actions")
                .method("POST")
                .json(&weekly_action_body("lea@example.org", anchor, 2)),
            &admin,
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["covered_occurrences"], json!(WEEKLY_COVERAGE));
    assert_eq!(body["action"]["anchor_date"], json!(iso(anchor)));

    let covered = world.db.enrollment_dates(&responsible_id, &parse_id(&body["action"]["id"]));
    assert_eq!(covered.len(), WEEKLY_COVERAGE);
    assert_eq!(covered[0], anchor);
}

#[tokio::test]
async fn an_unknown_responsible_rejects_creation() {
    let world = world();
    let admin = world.admin();

    let (status, body) = world
        .reply(
            warp::test::request()
                .path("/actions")
                .method("POST")
                .json(&weekly_action_body(
                    "nobody@example.org",
                    upcoming(Weekday::Monday, 1),
                    2,
                )),
            &admin,
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("nobody@example.org"));
}

#[tokio::test]
async fn volunteers_may_not_create_actions() {
    let world = world();
    let volunteer = world.volunteer("vol@example.org");

    let (status, _) = world
        .reply(
            warp::test::request()
                .path("/actions")
                .method("POST")
                .json(&weekly_action_body(
                    "vol@example.org",
                    upcoming(Weekday::Monday, 1),
                    2,
                )),
            &volunteer,
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn enrollment_enforces_capacity_then_uniqueness() {
    let world = world();
    let admin = world.admin();
    world.responsible("lea@example.org");

    let anchor = upcoming(Weekday::Monday, 1);
    let action_id = create_weekly_action(&world, &admin, "lea@example.org", anchor, 2).await;

    let x = world.volunteer("x@example.org");
    let y = world.volunteer("y@example.org");

    // The responsible person already holds one of the two places.
    let (status, body) = enroll(&world, &x, &action_id, anchor).await;
    assert_eq!(status, StatusCode::CREATED, "first enrollment: {}", body);
    assert_eq!(body["remaining"], json!(0));
    assert_eq!(body["enrollment"]["status"], json!("enrolled"));

    let (status, body) = enroll(&world, &y, &action_id, anchor).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("no places left"));

    let (status, body) = enroll(&world, &x, &action_id, anchor).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("already enrolled"));
}

#[tokio::test]
async fn enrollment_notifies_volunteer_and_responsible() {
    let world = world();
    let admin = world.admin();
    world.responsible("lea@example.org");

    let anchor = upcoming(Weekday::Tuesday, 1);
    let action_id = create_weekly_action(&world, &admin, "lea@example.org", anchor, 5).await;

    let volunteer = world.volunteer("vol@example.org");
    let (status, _) = enroll(&world, &volunteer, &action_id, anchor).await;
    assert_eq!(status, StatusCode::CREATED);

    assert_eq!(world.notifier.count(Template::EnrollmentCreated), 2);
    assert_eq!(world.notifier.sent_to("vol@example.org").len(), 1);
    assert_eq!(world.notifier.sent_to("lea@example.org").len(), 1);
}

#[tokio::test]
async fn enrollment_is_bounded_by_the_volunteer_horizon() {
    let world = world();
    let admin = world.admin();
    world.responsible("lea@example.org");

    let anchor = upcoming(Weekday::Monday, 1);
    let action_id = create_weekly_action(&world, &admin, "lea@example.org", anchor, 5).await;

    let volunteer = world.volunteer("vol@example.org");

    let far = anchor + Duration::weeks(10);
    let (status, _) = enroll(&world, &volunteer, &action_id, far).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // An administrator has no horizon.
    let (status, _) = enroll(&world, &admin, &action_id, far).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn off_pattern_dates_are_not_occurrences() {
    let world = world();
    let admin = world.admin();
    world.responsible("lea@example.org");

    let anchor = upcoming(Weekday::Monday, 1);
    let action_id = create_weekly_action(&world, &admin, "lea@example.org", anchor, 5).await;

    let volunteer = world.volunteer("vol@example.org");

    let (status, _) = enroll(&world, &volunteer, &action_id, anchor + Duration::days(1)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn eligibility_filters_enrollment_and_listing() {
    let world = world();
    let admin = world.admin();
    world.responsible("lea@example.org");

    let anchor = upcoming(Weekday::Monday, 1);

    let body = json!({
        "title": "Accueil de jour",
        "anchor_date": iso(anchor),
        "starts_at": "14:00:00",
        "ends_at": "18:00:00",
        "repeat": "weekly",
        "responsible": "lea@example.org",
        "capacity": 4,
        "gender_filter": "male",
        "age_filter": "adult"
    });

    let (status, created) = world
        .reply(
            warp::test::request().path("/actions").method("POST").json(&body),
            &admin,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let action_id = parse_id(&created["action"]["id"]);

    // The fixture volunteer is female; the filter excludes her.
    let excluded = world.volunteer("vol@example.org");

    let (status, _) = enroll(&world, &excluded, &action_id, anchor).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, listed) = world
        .reply(warp::test::request().path("/actions").method("GET"), &excluded)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["occurrences"], json!([]));
}

#[tokio::test]
async fn listing_decorates_occurrences_for_the_viewer() {
    let world = world();
    let admin = world.admin();
    world.responsible("lea@example.org");

    let anchor = upcoming(Weekday::Monday, 1);
    let action_id = create_weekly_action(&world, &admin, "lea@example.org", anchor, 3).await;

    let volunteer = world.volunteer("vol@example.org");
    let (status, _) = enroll(&world, &volunteer, &action_id, anchor).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = world
        .reply(warp::test::request().path("/actions").method("GET"), &volunteer)
        .await;
    assert_eq!(status, StatusCode::OK);

    let occurrences = body["occurrences"].as_array().unwrap();

    // Weekly occurrences within the 30-day horizon only.
    assert!(!occurrences.is_empty());
    assert!(occurrences.len() <= 5);

    let first = &occurrences[0];
    assert_eq!(first["date"], json!(iso(anchor)));
    assert_eq!(first["state"], json!("enrolled"));
    assert_eq!(first["enrolled_count"], json!(2));
    assert_eq!(first["remaining"], json!(1));
    assert_eq!(first["repeated"], json!(false));

    let second = &occurrences[1];
    assert_eq!(second["date"], json!(iso(anchor + Duration::weeks(1))));
    assert_eq!(second["state"], json!("open"));
    assert_eq!(second["repeated"], json!(true));
}

#[tokio::test]
async fn full_occurrences_display_as_full_to_outsiders() {
    let world = world();
    let admin = world.admin();
    world.responsible("lea@example.org");

    let anchor = upcoming(Weekday::Monday, 1);
    create_weekly_action(&world, &admin, "lea@example.org", anchor, 1).await;

    let outsider = world.volunteer("late@example.org");

    // The responsible person's standing enrollment fills capacity 1.
    let (status, body) = world
        .reply(warp::test::request().path("/actions").method("GET"), &outsider)
        .await;
    assert_eq!(status, StatusCode::OK);

    let first = &body["occurrences"].as_array().unwrap()[0];
    assert_eq!(first["state"], json!("full"));
    assert_eq!(first["remaining"], json!(0));
}

#[tokio::test]
async fn masking_suppresses_an_occurrence_and_unmasking_restores_it() {
    let world = world();
    let admin = world.admin();
    world.responsible("lea@example.org");

    let anchor = upcoming(Weekday::Monday, 1);
    let action_id = create_weekly_action(&world, &admin, "lea@example.org", anchor, 3).await;

    let masked_date = anchor + Duration::weeks(1);
    let mask_path = format!("/actions/{}/masks/{}", action_id, iso(masked_date));

    let (status, _) = world
        .reply(warp::test::request().path(&mask_path).method("PUT"), &admin)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let volunteer = world.volunteer("vol@example.org");

    let (_, body) = world
        .reply(warp::test::request().path("/actions").method("GET"), &volunteer)
        .await;
    let dates: Vec<&str> = body["occurrences"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["date"].as_str().unwrap())
        .collect();

    assert!(dates.contains(&iso(anchor).as_str()));
    assert!(!dates.contains(&iso(masked_date).as_str()));

    // Enrolling into the masked occurrence is refused too.
    let (status, _) = enroll(&world, &volunteer, &action_id, masked_date).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = world
        .reply(warp::test::request().path(&mask_path).method("DELETE"), &admin)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = world
        .reply(warp::test::request().path("/actions").method("GET"), &volunteer)
        .await;
    let dates: Vec<String> = body["occurrences"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["date"].as_str().unwrap().to_owned())
        .collect();

    assert!(dates.contains(&iso(masked_date)));
}

#[tokio::test]
async fn masking_is_refused_while_volunteers_are_enrolled() {
    let world = world();
    let admin = world.admin();
    world.responsible("lea@example.org");

    let anchor = upcoming(Weekday::Monday, 1);
    let action_id = create_weekly_action(&world, &admin, "lea@example.org", anchor, 3).await;

    let volunteer = world.volunteer("vol@example.org");
    let (status, _) = enroll(&world, &volunteer, &action_id, anchor).await;
    assert_eq!(status, StatusCode::CREATED);

    let mask_path = format!("/actions/{}/masks/{}", action_id, iso(anchor));
    let (status, body) = world
        .reply(warp::test::request().path(&mask_path).method("PUT"), &admin)
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("active enrollment"));
}

#[tokio::test]
async fn unenrolling_is_restricted_to_the_owner_and_administrators() {
    let world = world();
    let admin = world.admin();
    world.responsible("lea@example.org");

    let anchor = upcoming(Weekday::Monday, 1);
    let action_id = create_weekly_action(&world, &admin, "lea@example.org", anchor, 5).await;

    let owner = world.volunteer("owner@example.org");
    let stranger = world.volunteer("stranger@example.org");

    let (_, body) = enroll(&world, &owner, &action_id, anchor).await;
    let enrollment_id = body["enrollment"]["id"].as_str().unwrap().to_owned();
    let path = format!("/enrollments/{}", enrollment_id);

    let (status, _) = world
        .reply(warp::test::request().path(&path).method("DELETE"), &stranger)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = world
        .reply(warp::test::request().path(&path).method("DELETE"), &owner)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = world
        .reply(warp::test::request().path(&path).method("DELETE"), &owner)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn a_series_can_be_left_from_a_date_onwards() {
    let world = world();
    let admin = world.admin();
    world.responsible("lea@example.org");

    let anchor = upcoming(Weekday::Monday, 1);
    let action_id = create_weekly_action(&world, &admin, "lea@example.org", anchor, 5).await;

    let volunteer = world.volunteer("vol@example.org");

    let mut enrollment_ids = vec![];

    for week in 0..3 {
        let (status, body) =
            enroll(&world, &volunteer, &action_id, anchor + Duration::weeks(week)).await;
        assert_eq!(status, StatusCode::CREATED);
        enrollment_ids.push(body["enrollment"]["id"].as_str().unwrap().to_owned());
    }

    let path = format!("/enrollments/{}/future", enrollment_ids[1]);
    let (status, body) = world
        .reply(warp::test::request().path(&path).method("DELETE"), &volunteer)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], json!(2));
    assert_eq!(body["from"], json!(iso(anchor + Duration::weeks(1))));
    assert_eq!(body["to"], json!(iso(anchor + Duration::weeks(2))));

    assert_eq!(
        world.db.enrollment_dates(&volunteer.id, &action_id),
        vec![anchor]
    );

    // One summary notification per recipient, not one per occurrence.
    assert_eq!(world.notifier.count(Template::SeriesCancelled), 2);
}

#[tokio::test]
async fn leaving_a_series_requires_a_repeating_action() {
    let world = world();
    let admin = world.admin();
    world.responsible("lea@example.org");

    let anchor = upcoming(Weekday::Friday, 1);

    let body = json!({
        "title": "Collecte exceptionnelle",
        "anchor_date": iso(anchor),
        "starts_at": "09:00:00",
        "ends_at": "17:00:00",
        "repeat": "none",
        "responsible": "lea@example.org",
        "capacity": 5,
        "gender_filter": "mixed",
        "age_filter": "any"
    });

    let (status, created) = world
        .reply(
            warp::test::request().path("/actions").method("POST").json(&body),
            &admin,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["covered_occurrences"], json!(1));

    let action_id = parse_id(&created["action"]["id"]);
    let volunteer = world.volunteer("vol@example.org");

    let (_, enrolled) = enroll(&world, &volunteer, &action_id, anchor).await;
    let path = format!(
        "/enrollments/{}/future",
        enrolled["enrollment"]["id"].as_str().unwrap()
    );

    let (status, body) = world
        .reply(warp::test::request().path(&path).method("DELETE"), &volunteer)
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("none"));
}

#[tokio::test]
async fn attendance_is_recorded_and_confirms_the_volunteer() {
    let world = world();
    let admin = world.admin();
    world.responsible("lea@example.org");

    let anchor = upcoming(Weekday::Monday, 1);
    let action_id = create_weekly_action(&world, &admin, "lea@example.org", anchor, 5).await;

    let volunteer = world.volunteer("vol@example.org");
    let (_, body) = enroll(&world, &volunteer, &action_id, anchor).await;
    let enrollment_id = body["enrollment"]["id"].as_str().unwrap().to_owned();
    let path = format!("/enrollments/{}/status", enrollment_id);

    // Only administrators record attendance.
    let (status, _) = world
        .reply(
            warp::test::request()
                .path(&path)
                .method("PUT")
                .json(&json!({ "status": "present" })),
            &volunteer,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = world
        .reply(
            warp::test::request()
                .path(&path)
                .method("PUT")
                .json(&json!({ "status": "present" })),
            &admin,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enrollment"]["status"], json!("present"));
    assert!(world.directory.is_confirmed(&volunteer.id));

    // `enrolled` cannot be assigned back.
    let (status, _) = world
        .reply(
            warp::test::request()
                .path(&path)
                .method("PUT")
                .json(&json!({ "status": "enrolled" })),
            &admin,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn participants_are_visible_to_the_responsible_only() {
    let world = world();
    let admin = world.admin();
    let (responsible, _) = world.responsible("lea@example.org");

    let anchor = upcoming(Weekday::Monday, 1);
    let action_id = create_weekly_action(&world, &admin, "lea@example.org", anchor, 5).await;

    let volunteer = world.volunteer("vol@example.org");
    let (status, _) = enroll(&world, &volunteer, &action_id, anchor).await;
    assert_eq!(status, StatusCode::CREATED);

    let path = format!("/actions/{}/participants?date={}", action_id, iso(anchor));

    let (status, body) = world
        .reply(warp::test::request().path(&path).method("GET"), &responsible)
        .await;
    assert_eq!(status, StatusCode::OK);

    let participants = body["participants"].as_array().unwrap();
    assert_eq!(participants.len(), 2);
    assert!(participants
        .iter()
        .any(|p| p["email"] == json!("vol@example.org")));

    let (status, _) = world
        .reply(warp::test::request().path(&path).method("GET"), &volunteer)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn reassigning_the_responsible_migrates_future_enrollments() {
    let world = world();
    let admin = world.admin();
    let (_, p1) = world.responsible("p1@example.org");
    let (_, p2) = world.responsible("p2@example.org");

    let anchor = upcoming(Weekday::Monday, 1);
    let action_id = create_weekly_action(&world, &admin, "p1@example.org", anchor, 2).await;

    assert_eq!(
        world.db.enrollment_dates(&p1, &action_id).len(),
        WEEKLY_COVERAGE
    );

    let path = format!("/actions/{}", action_id);
    let (status, body) = world
        .reply(
            warp::test::request()
                .path(&path)
                .method("PUT")
                .json(&weekly_action_body("p2@example.org", anchor, 2)),
            &admin,
        )
        .await;

    assert_eq!(status, StatusCode::OK, "update action: {}", body);
    assert_eq!(body["action"]["responsible"], json!("p2@example.org"));
    assert_eq!(body["reassignment"]["removed"], json!(WEEKLY_COVERAGE));
    assert_eq!(body["reassignment"]["created"], json!(WEEKLY_COVERAGE));

    assert!(world.db.enrollment_dates(&p1, &action_id).is_empty());
    assert_eq!(
        world.db.enrollment_dates(&p2, &action_id).len(),
        WEEKLY_COVERAGE
    );

    // A second identical update has no responsible change and no cascade.
    let (status, body) = world
        .reply(
            warp::test::request()
                .path(&path)
                .method("PUT")
                .json(&weekly_action_body("p2@example.org", anchor, 2)),
            &admin,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["reassignment"].is_null());
}

#[tokio::test]
async fn reassigning_to_an_unknown_responsible_rejects_the_update() {
    let world = world();
    let admin = world.admin();
    let (_, p1) = world.responsible("p1@example.org");

    let anchor = upcoming(Weekday::Monday, 1);
    let action_id = create_weekly_action(&world, &admin, "p1@example.org", anchor, 2).await;

    let path = format!("/actions/{}", action_id);
    let (status, _) = world
        .reply(
            warp::test::request()
                .path(&path)
                .method("PUT")
                .json(&weekly_action_body("ghost@example.org", anchor, 2)),
            &admin,
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // The action is untouched, P1 still covers it.
    let (_, body) = world
        .reply(warp::test::request().path("/actions").method("GET"), &admin)
        .await;
    assert_eq!(
        body["occurrences"].as_array().unwrap()[0]["title"],
        json!("Distribution alimentaire")
    );
    assert_eq!(
        world.db.enrollment_dates(&p1, &action_id).len(),
        WEEKLY_COVERAGE
    );
}

#[tokio::test]
async fn the_month_grid_is_whole_weeks_with_decorated_days() {
    let world = world();
    let admin = world.admin();
    world.responsible("lea@example.org");

    let anchor = upcoming(Weekday::Monday, 2);
    let action_id = create_weekly_action(&world, &admin, "lea@example.org", anchor, 3).await;

    let volunteer = world.volunteer("vol@example.org");
    let (status, _) = enroll(&world, &volunteer, &action_id, anchor).await;
    assert_eq!(status, StatusCode::CREATED);

    let path = format!("/calendar/{}/{}", anchor.year(), anchor.month());
    let (status, body) = world
        .reply(warp::test::request().path(&path).method("GET"), &volunteer)
        .await;
    assert_eq!(status, StatusCode::OK);

    let weeks = body["weeks"].as_array().unwrap();
    assert!(weeks.len() >= 4);

    for week in weeks {
        assert_eq!(week.as_array().unwrap().len(), 7);
    }

    let anchor_day = weeks
        .iter()
        .flat_map(|w| w.as_array().unwrap())
        .find(|d| d["date"] == json!(iso(anchor)))
        .expect("anchor day is in the grid");

    assert_eq!(anchor_day["in_month"], json!(true));

    let occurrences = anchor_day["occurrences"].as_array().unwrap();
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0]["state"], json!("enrolled"));

    // The filtered view drops other occurrences but keeps the grid shape.
    let filtered_path = format!(
        "/calendar/{}/{}?enrolled_only=true",
        anchor.year(),
        anchor.month()
    );
    let (status, filtered) = world
        .reply(
            warp::test::request().path(&filtered_path).method("GET"),
            &volunteer,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let filtered_weeks = filtered["weeks"].as_array().unwrap();
    assert_eq!(filtered_weeks.len(), weeks.len());

    let enrolled_days: usize = filtered_weeks
        .iter()
        .flat_map(|w| w.as_array().unwrap())
        .filter(|d| !d["occurrences"].as_array().unwrap().is_empty())
        .count();
    assert_eq!(enrolled_days, 1);
}

#[tokio::test]
async fn invalid_months_and_dates_are_rejected() {
    let world = world();
    let admin = world.admin();

    let (status, _) = world
        .reply(warp::test::request().path("/calendar/2025/13").method("GET"), &admin)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = world
        .reply(
            warp::test::request()
                .path("/enrollments")
                .method("POST")
                .json(&json!({
                    "action_id": Uuid::new_v4(),
                    "date": "not-a-date"
                })),
            &admin,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = world
        .reply(
            warp::test::request()
                .path("/enrollments")
                .method("POST")
                .json(&json!({
                    "action_id": Uuid::new_v4(),
                    "date": iso(today() + Duration::days(3))
                })),
            &admin,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn enroll(
    world: &World,
    actor: &TestActor,
    action_id: &Uuid,
    date: time::Date,
) -> (StatusCode, Value) {
    world
        .reply(
            warp::test::request()
                .path("/enrollments")
                .method("POST")
                .json(&json!({
                    "action_id": action_id,
                    "date": iso(date)
                })),
            actor,
        )
        .await
}

fn parse_id(value: &Value) -> Uuid {
    value
        .as_str()
        .expect("ID is a string")
        .parse()
        .expect("parse ID")
}
