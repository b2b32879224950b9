use futures::future::BoxFuture;
use time::Date;
use uuid::Uuid;

use crate::action::{Action, NewAction};
use crate::enrollment::{Enrollment, EnrollmentStatus, Participant};
use crate::errors::BackendError;
use crate::recurrence::Window;

pub trait Db {
    fn insert_action(
        &self,
        association_id: &Uuid,
        definition: NewAction,
    ) -> BoxFuture<Result<Action, BackendError>>;

    fn retrieve_action(&self, id: &Uuid) -> BoxFuture<Result<Option<Action>, BackendError>>;

    fn update_action(
        &self,
        id: &Uuid,
        definition: NewAction,
    ) -> BoxFuture<Result<Action, BackendError>>;

    fn list_actions(&self, association_id: &Uuid) -> BoxFuture<Result<Vec<Action>, BackendError>>;

    fn add_mask(
        &self,
        action_id: &Uuid,
        date: Date,
        association_id: &Uuid,
    ) -> BoxFuture<Result<(), BackendError>>;

    fn remove_mask(&self, action_id: &Uuid, date: Date) -> BoxFuture<Result<bool, BackendError>>;

    fn masked_dates(
        &self,
        action_id: &Uuid,
        window: Window,
    ) -> BoxFuture<Result<Vec<Date>, BackendError>>;

    fn is_masked(&self, action_id: &Uuid, date: Date) -> BoxFuture<Result<bool, BackendError>>;

    /// Inserts an enrollment, enforcing the uniqueness and capacity
    /// invariants in the storage layer itself: the capacity check and the
    /// insert are one statement.
    fn insert_enrollment(
        &self,
        volunteer_id: &Uuid,
        action: &Action,
        date: Date,
    ) -> BoxFuture<Result<Enrollment, BackendError>>;

    /// Inserts a standing enrollment for a responsible person. A
    /// duplicate (volunteer, action, date) is a no-op, not an error, so a
    /// partially-applied cascade can be re-run safely. Returns whether a
    /// row was created.
    fn insert_standing_enrollment(
        &self,
        volunteer_id: &Uuid,
        action_id: &Uuid,
        date: Date,
    ) -> BoxFuture<Result<bool, BackendError>>;

    fn retrieve_enrollment(&self, id: &Uuid)
        -> BoxFuture<Result<Option<Enrollment>, BackendError>>;

    fn delete_enrollment(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>>;

    /// Deletes every enrollment of the volunteer for the action with a
    /// date on or after `from`. Returns the deleted dates in ascending
    /// order.
    fn delete_future_enrollments(
        &self,
        volunteer_id: &Uuid,
        action_id: &Uuid,
        from: Date,
    ) -> BoxFuture<Result<Vec<Date>, BackendError>>;

    fn count_enrollments(
        &self,
        action_id: &Uuid,
        date: Date,
    ) -> BoxFuture<Result<i64, BackendError>>;

    fn enrollment_counts(
        &self,
        action_id: &Uuid,
        window: Window,
    ) -> BoxFuture<Result<Vec<(Date, i64)>, BackendError>>;

    fn enrollments_for_volunteer(
        &self,
        volunteer_id: &Uuid,
        action_id: &Uuid,
        window: Window,
    ) -> BoxFuture<Result<Vec<Enrollment>, BackendError>>;

    fn update_enrollment_status(
        &self,
        id: &Uuid,
        status: EnrollmentStatus,
    ) -> BoxFuture<Result<Enrollment, BackendError>>;

    fn participants(
        &self,
        action_id: &Uuid,
        date: Date,
    ) -> BoxFuture<Result<Vec<Participant>, BackendError>>;
}

pub mod memory;

pub use self::postgres::*;

mod postgres {
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::{
        self,
        postgres::{PgPool, PgRow},
    };
    use time::{Date, OffsetDateTime};
    use uuid::Uuid;

    use crate::action::{Action, NewAction, Times};
    use crate::enrollment::{Enrollment, EnrollmentStatus, Participant};
    use crate::errors::BackendError;
    use crate::recurrence::Window;

    const ENROLLMENTS_OCCURRENCE_CONSTRAINT: &str = "enrollments_occurrence_volunteer";

    pub struct PgDb {
        pool: PgPool,
    }

    impl PgDb {
        pub fn new(pool: PgPool) -> Self {
            PgDb { pool }
        }
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::Db for PgDb {
        fn insert_action(
            &self,
            association_id: &Uuid,
            definition: NewAction,
        ) -> BoxFuture<Result<Action, BackendError>> {
            let association_id = *association_id;

            async move {
                let query = sqlx::query_as(include_str!("queries/create_action.sql"));

                let (id, created_at, updated_at): (Uuid, OffsetDateTime, OffsetDateTime) = query
                    .bind(association_id)
                    .bind(&definition.title)
                    .bind(&definition.description)
                    .bind(&definition.location)
                    .bind(definition.anchor_date)
                    .bind(definition.starts_at)
                    .bind(definition.ends_at)
                    .bind(definition.repeat.as_str())
                    .bind(&definition.responsible)
                    .bind(definition.capacity)
                    .bind(definition.eligibility.gender.as_str())
                    .bind(definition.eligibility.age.as_str())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(Action::new(
                    id,
                    association_id,
                    Times {
                        created_at,
                        updated_at,
                    },
                    definition,
                ))
            }
            .boxed()
        }

        fn retrieve_action(&self, id: &Uuid) -> BoxFuture<Result<Option<Action>, BackendError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/retrieve_action.sql"));

                let action: Option<Action> = query
                    .bind(id)
                    .try_map(|row: PgRow| action_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(action)
            }
            .boxed()
        }

        fn update_action(
            &self,
            id: &Uuid,
            definition: NewAction,
        ) -> BoxFuture<Result<Action, BackendError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/update_action.sql"));

                let action: Option<Action> = query
                    .bind(id)
                    .bind(&definition.title)
                    .bind(&definition.description)
                    .bind(&definition.location)
                    .bind(definition.anchor_date)
                    .bind(definition.starts_at)
                    .bind(definition.ends_at)
                    .bind(definition.repeat.as_str())
                    .bind(&definition.responsible)
                    .bind(definition.capacity)
                    .bind(definition.eligibility.gender.as_str())
                    .bind(definition.eligibility.age.as_str())
                    .try_map(|row: PgRow| action_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                action.ok_or(BackendError::UnknownAction(id))
            }
            .boxed()
        }

        fn list_actions(
            &self,
            association_id: &Uuid,
        ) -> BoxFuture<Result<Vec<Action>, BackendError>> {
            let association_id = *association_id;

            async move {
                let query = sqlx::query(include_str!("queries/list_actions.sql"));

                let actions: Vec<Action> = query
                    .bind(association_id)
                    .try_map(|row: PgRow| action_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(actions)
            }
            .boxed()
        }

        fn add_mask(
            &self,
            action_id: &Uuid,
            date: Date,
            association_id: &Uuid,
        ) -> BoxFuture<Result<(), BackendError>> {
            let action_id = *action_id;
            let association_id = *association_id;

            async move {
                let query = sqlx::query(include_str!("queries/add_mask.sql"));

                query
                    .bind(action_id)
                    .bind(date)
                    .bind(association_id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(())
            }
            .boxed()
        }

        fn remove_mask(
            &self,
            action_id: &Uuid,
            date: Date,
        ) -> BoxFuture<Result<bool, BackendError>> {
            let action_id = *action_id;

            async move {
                let query = sqlx::query(include_str!("queries/remove_mask.sql"));

                let count = query
                    .bind(action_id)
                    .bind(date)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                Ok(count > 0)
            }
            .boxed()
        }

        fn masked_dates(
            &self,
            action_id: &Uuid,
            window: Window,
        ) -> BoxFuture<Result<Vec<Date>, BackendError>> {
            let action_id = *action_id;

            async move {
                let query = sqlx::query_as(include_str!("queries/masked_dates.sql"));

                let dates: Vec<(Date,)> = query
                    .bind(action_id)
                    .bind(window.start)
                    .bind(window.end)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(dates.into_iter().map(|(date,)| date).collect())
            }
            .boxed()
        }

        fn is_masked(&self, action_id: &Uuid, date: Date) -> BoxFuture<Result<bool, BackendError>> {
            let action_id = *action_id;

            async move {
                let query = sqlx::query_as(include_str!("queries/is_masked.sql"));

                let (masked,): (bool,) = query
                    .bind(action_id)
                    .bind(date)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(masked)
            }
            .boxed()
        }

        fn insert_enrollment(
            &self,
            volunteer_id: &Uuid,
            action: &Action,
            date: Date,
        ) -> BoxFuture<Result<Enrollment, BackendError>> {
            let volunteer_id = *volunteer_id;
            let action_id = *action.id();
            let capacity = i64::from(action.capacity);

            async move {
                let exists_query = sqlx::query_as(include_str!("queries/enrollment_exists.sql"));

                let (exists,): (bool,) = exists_query
                    .bind(volunteer_id)
                    .bind(action_id)
                    .bind(date)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                if exists {
                    return Err(BackendError::AlreadyEnrolled);
                }

                let query = sqlx::query_as(include_str!("queries/create_enrollment.sql"));

                let row: Option<(Uuid, String, OffsetDateTime)> = query
                    .bind(volunteer_id)
                    .bind(action_id)
                    .bind(date)
                    .bind(capacity)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                match row {
                    Some((id, status, created_at)) => Ok(Enrollment::new(
                        id,
                        volunteer_id,
                        action_id,
                        date,
                        status.parse()?,
                        created_at,
                    )),
                    None => Err(BackendError::Full),
                }
            }
            .boxed()
        }

        fn insert_standing_enrollment(
            &self,
            volunteer_id: &Uuid,
            action_id: &Uuid,
            date: Date,
        ) -> BoxFuture<Result<bool, BackendError>> {
            let volunteer_id = *volunteer_id;
            let action_id = *action_id;

            async move {
                let query = sqlx::query(include_str!("queries/create_standing_enrollment.sql"));

                let count = query
                    .bind(volunteer_id)
                    .bind(action_id)
                    .bind(date)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                Ok(count > 0)
            }
            .boxed()
        }

        fn retrieve_enrollment(
            &self,
            id: &Uuid,
        ) -> BoxFuture<Result<Option<Enrollment>, BackendError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/retrieve_enrollment.sql"));

                let enrollment: Option<Enrollment> = query
                    .bind(id)
                    .try_map(|row: PgRow| enrollment_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(enrollment)
            }
            .boxed()
        }

        fn delete_enrollment(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/delete_enrollment.sql"));

                let count = query
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(BackendError::UnknownEnrollment(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn delete_future_enrollments(
            &self,
            volunteer_id: &Uuid,
            action_id: &Uuid,
            from: Date,
        ) -> BoxFuture<Result<Vec<Date>, BackendError>> {
            let volunteer_id = *volunteer_id;
            let action_id = *action_id;

            async move {
                let query =
                    sqlx::query_as(include_str!("queries/delete_future_enrollments.sql"));

                let mut dates: Vec<(Date,)> = query
                    .bind(volunteer_id)
                    .bind(action_id)
                    .bind(from)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                dates.sort();

                Ok(dates.into_iter().map(|(date,)| date).collect())
            }
            .boxed()
        }

        fn count_enrollments(
            &self,
            action_id: &Uuid,
            date: Date,
        ) -> BoxFuture<Result<i64, BackendError>> {
            let action_id = *action_id;

            async move {
                let query = sqlx::query_as(include_str!("queries/count_enrollments.sql"));

                let (count,): (i64,) = query
                    .bind(action_id)
                    .bind(date)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(count)
            }
            .boxed()
        }

        fn enrollment_counts(
            &self,
            action_id: &Uuid,
            window: Window,
        ) -> BoxFuture<Result<Vec<(Date, i64)>, BackendError>> {
            let action_id = *action_id;

            async move {
                let query = sqlx::query_as(include_str!("queries/enrollment_counts.sql"));

                let counts: Vec<(Date, i64)> = query
                    .bind(action_id)
                    .bind(window.start)
                    .bind(window.end)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(counts)
            }
            .boxed()
        }

        fn enrollments_for_volunteer(
            &self,
            volunteer_id: &Uuid,
            action_id: &Uuid,
            window: Window,
        ) -> BoxFuture<Result<Vec<Enrollment>, BackendError>> {
            let volunteer_id = *volunteer_id;
            let action_id = *action_id;

            async move {
                let query = sqlx::query(include_str!("queries/enrollments_for_volunteer.sql"));

                let enrollments: Vec<Enrollment> = query
                    .bind(volunteer_id)
                    .bind(action_id)
                    .bind(window.start)
                    .bind(window.end)
                    .try_map(|row: PgRow| enrollment_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(enrollments)
            }
            .boxed()
        }

        fn update_enrollment_status(
            &self,
            id: &Uuid,
            status: EnrollmentStatus,
        ) -> BoxFuture<Result<Enrollment, BackendError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/update_enrollment_status.sql"));

                let enrollment: Option<Enrollment> = query
                    .bind(id)
                    .bind(status.as_str())
                    .try_map(|row: PgRow| enrollment_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                enrollment.ok_or(BackendError::UnknownEnrollment(id))
            }
            .boxed()
        }

        fn participants(
            &self,
            action_id: &Uuid,
            date: Date,
        ) -> BoxFuture<Result<Vec<Participant>, BackendError>> {
            let action_id = *action_id;

            async move {
                let query = sqlx::query(include_str!("queries/participants.sql"));

                let participants: Vec<Participant> = query
                    .bind(action_id)
                    .bind(date)
                    .try_map(|row: PgRow| {
                        let status: String = try_get(&row, "status")?;

                        Ok(Participant::new(
                            try_get(&row, "id")?,
                            try_get(&row, "volunteer_id")?,
                            try_get(&row, "name")?,
                            try_get(&row, "email")?,
                            parse_in_row(&status)?,
                        ))
                    })
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(participants)
            }
            .boxed()
        }
    }

    fn action_from_row(row: &PgRow) -> Result<Action, sqlx::Error> {
        let repeat: String = try_get(row, "repeat_kind")?;
        let gender: String = try_get(row, "gender_filter")?;
        let age: String = try_get(row, "age_filter")?;

        let definition = NewAction {
            title: try_get(row, "title")?,
            description: try_get(row, "description")?,
            location: try_get(row, "location")?,
            anchor_date: try_get(row, "anchor_date")?,
            starts_at: try_get(row, "starts_at")?,
            ends_at: try_get(row, "ends_at")?,
            repeat: parse_in_row(&repeat)?,
            responsible: try_get(row, "responsible")?,
            capacity: try_get(row, "capacity")?,
            eligibility: crate::action::Eligibility::new(
                parse_in_row(&gender)?,
                parse_in_row(&age)?,
            ),
        };

        Ok(Action::new(
            try_get(row, "id")?,
            try_get(row, "association_id")?,
            Times {
                created_at: try_get(row, "created_at")?,
                updated_at: try_get(row, "updated_at")?,
            },
            definition,
        ))
    }

    fn enrollment_from_row(row: &PgRow) -> Result<Enrollment, sqlx::Error> {
        let status: String = try_get(row, "status")?;

        Ok(Enrollment::new(
            try_get(row, "id")?,
            try_get(row, "volunteer_id")?,
            try_get(row, "action_id")?,
            try_get(row, "occurs_on")?,
            parse_in_row(&status)?,
            try_get(row, "created_at")?,
        ))
    }

    /// Parses a stored text column into a domain enum, reporting failures
    /// as decode errors. These should never happen, since the database
    /// constrains the columns, but just for completeness...
    fn parse_in_row<T: std::str::FromStr<Err = BackendError>>(
        value: &str,
    ) -> Result<T, sqlx::Error> {
        value
            .parse()
            .map_err(|e: BackendError| sqlx::Error::Decode(Box::new(e)))
    }

    fn try_get<'a, T: sqlx::Type<sqlx::Postgres> + sqlx::decode::Decode<'a, sqlx::Postgres>>(
        row: &'a PgRow,
        column: &str,
    ) -> Result<T, sqlx::Error> {
        use sqlx::prelude::*;

        row.try_get(column)
    }

    fn map_sqlx_error(error: sqlx::Error) -> BackendError {
        use sqlx::Error;

        match error {
            Error::Database(ref e) if e.constraint() == Some(ENROLLMENTS_OCCURRENCE_CONSTRAINT) => {
                BackendError::AlreadyEnrolled
            }
            _ => BackendError::Sqlx { source: error },
        }
    }
}
