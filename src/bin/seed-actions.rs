use std::error::Error;

use dotenv::dotenv;
use log::{debug, info, initialize_logger};
use structopt::StructOpt;
use uuid::Uuid;

use backend::config::get_variable;
use backend::db::PgDb;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "seed-actions",
    about = "Create sample actions for the given association"
)]
struct Opt {
    /// The association to seed
    #[structopt(parse(try_from_str = Uuid::parse_str))]
    association_id: Uuid,

    /// The responsible person's address
    responsible: String,

    /// How many weekly actions to create
    #[structopt(default_value = "3")]
    count: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let opt = Opt::from_args();

    let logger = initialize_logger();

    let connection_string = get_variable("BACKEND_DB_CONNECTION_STRING");
    let pool = sqlx::Pool::connect(&connection_string)
        .await
        .expect("create database pool from BACKEND_DB_CONNECTION_STRING");
    let db = PgDb::new(pool);

    info!(
        logger,
        "Seeding {} actions for association {}...", opt.count, opt.association_id
    );

    let today = time::OffsetDateTime::now_utc().date();

    for number in 1..=opt.count {
        use backend::action::NewAction;
        use backend::db::Db;

        let definition: NewAction = serde_json::from_value(serde_json::json!({
            "title": format!("Sample action #{}", number),
            "description": "Seeded for local development",
            "location": "Main hall",
            "anchor_date": (today + time::Duration::days(i64::from(number)))
                .format(backend::datefmt::DATE_FORMAT),
            "starts_at": "09:00:00",
            "ends_at": "12:00:00",
            "repeat": "weekly",
            "responsible": opt.responsible,
            "capacity": 4,
            "gender_filter": "mixed",
            "age_filter": "any"
        }))
        .expect("build action definition");

        let action = db
            .insert_action(&opt.association_id, definition)
            .await
            .expect("insert action");

        debug!(logger, "Created action #{}: {}", number, action.id());
    }

    info!(logger, "Done.");

    Ok(())
}
