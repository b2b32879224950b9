//! Boundary to the volunteer-profile subsystem. This service only
//! resolves person references, looks up contact addresses, and flips the
//! confirmation flag when a volunteer is first recorded present; profile
//! management itself lives elsewhere.

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::errors::BackendError;

pub trait Directory {
    /// Resolves a responsible-person reference to a volunteer ID.
    fn resolve(&self, reference: &str) -> BoxFuture<Result<Option<Uuid>, BackendError>>;

    /// Returns the contact address for a volunteer.
    fn contact(&self, volunteer_id: &Uuid) -> BoxFuture<Result<Option<String>, BackendError>>;

    /// Records that a volunteer was seen at an occurrence, confirming
    /// their profile.
    fn confirm(&self, volunteer_id: &Uuid) -> BoxFuture<Result<(), BackendError>>;
}

pub use self::postgres::*;

mod postgres {
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::postgres::PgPool;
    use uuid::Uuid;

    use crate::errors::BackendError;

    pub struct PgDirectory {
        pool: PgPool,
    }

    impl PgDirectory {
        pub fn new(pool: PgPool) -> Self {
            PgDirectory { pool }
        }
    }

    impl super::Directory for PgDirectory {
        fn resolve(&self, reference: &str) -> BoxFuture<Result<Option<Uuid>, BackendError>> {
            let reference = reference.to_owned();

            async move {
                let query = sqlx::query_as(include_str!("queries/resolve_volunteer.sql"));

                let id: Option<(Uuid,)> = query
                    .bind(reference)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|source| BackendError::Sqlx { source })?;

                Ok(id.map(|(id,)| id))
            }
            .boxed()
        }

        fn contact(&self, volunteer_id: &Uuid) -> BoxFuture<Result<Option<String>, BackendError>> {
            let volunteer_id = *volunteer_id;

            async move {
                let query = sqlx::query_as(include_str!("queries/volunteer_contact.sql"));

                let email: Option<(String,)> = query
                    .bind(volunteer_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|source| BackendError::Sqlx { source })?;

                Ok(email.map(|(email,)| email))
            }
            .boxed()
        }

        fn confirm(&self, volunteer_id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
            let volunteer_id = *volunteer_id;

            async move {
                let query = sqlx::query(include_str!("queries/confirm_volunteer.sql"));

                query
                    .bind(volunteer_id)
                    .execute(&self.pool)
                    .await
                    .map_err(|source| BackendError::Sqlx { source })?;

                Ok(())
            }
            .boxed()
        }
    }
}

pub mod mock {
    use std::collections::{HashMap, HashSet};
    use std::sync::RwLock;

    use futures::future::{BoxFuture, FutureExt};
    use uuid::Uuid;

    use super::Directory;
    use crate::errors::BackendError;

    /// An in-memory directory for tests and local development.
    #[derive(Default)]
    pub struct MockDirectory {
        volunteers: RwLock<HashMap<String, Uuid>>,
        confirmed: RwLock<HashSet<Uuid>>,
    }

    impl MockDirectory {
        pub fn new() -> Self {
            Default::default()
        }

        /// Registers a volunteer under the given reference and returns
        /// their ID.
        pub fn register(&self, reference: impl AsRef<str>) -> Uuid {
            let id = Uuid::new_v4();

            self.volunteers
                .write()
                .unwrap()
                .insert(reference.as_ref().to_owned(), id);

            id
        }

        pub fn is_confirmed(&self, volunteer_id: &Uuid) -> bool {
            self.confirmed.read().unwrap().contains(volunteer_id)
        }
    }

    impl Directory for MockDirectory {
        fn resolve(&self, reference: &str) -> BoxFuture<Result<Option<Uuid>, BackendError>> {
            let id = self.volunteers.read().unwrap().get(reference).copied();

            async move { Ok(id) }.boxed()
        }

        fn contact(&self, volunteer_id: &Uuid) -> BoxFuture<Result<Option<String>, BackendError>> {
            let reference = self
                .volunteers
                .read()
                .unwrap()
                .iter()
                .find(|(_, id)| *id == volunteer_id)
                .map(|(reference, _)| reference.clone());

            async move { Ok(reference) }.boxed()
        }

        fn confirm(&self, volunteer_id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
            self.confirmed.write().unwrap().insert(*volunteer_id);

            async move { Ok(()) }.boxed()
        }
    }
}
