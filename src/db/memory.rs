//! An in-memory implementation of the storage interface, used by the
//! test suites and for running the service without a database. It
//! enforces the same uniqueness and capacity invariants as the SQL
//! schema.

use std::collections::HashMap;
use std::sync::RwLock;

use futures::future::{BoxFuture, FutureExt};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::Db;
use crate::action::{Action, NewAction, Times};
use crate::enrollment::{Enrollment, EnrollmentStatus, Participant};
use crate::errors::BackendError;
use crate::recurrence::Window;

#[derive(Default)]
pub struct MemoryDb {
    actions: RwLock<HashMap<Uuid, Action>>,
    enrollments: RwLock<HashMap<Uuid, Enrollment>>,
    masks: RwLock<HashMap<(Uuid, Date), Uuid>>,
    volunteers: RwLock<HashMap<Uuid, (String, String)>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers a volunteer's display name and address for the
    /// participant listing.
    pub fn register_volunteer(&self, id: &Uuid, name: impl Into<String>, email: impl Into<String>) {
        self.volunteers
            .write()
            .unwrap()
            .insert(*id, (name.into(), email.into()));
    }

    /// The enrollments of one volunteer for one action, in date order.
    /// Test helper; the service itself always goes through the windowed
    /// queries.
    pub fn enrollment_dates(&self, volunteer_id: &Uuid, action_id: &Uuid) -> Vec<Date> {
        let mut dates: Vec<Date> = self
            .enrollments
            .read()
            .unwrap()
            .values()
            .filter(|e| e.volunteer_id == *volunteer_id && e.action_id == *action_id)
            .map(|e| e.occurs_on)
            .collect();

        dates.sort();
        dates
    }

    fn occurrence_count(enrollments: &HashMap<Uuid, Enrollment>, action_id: &Uuid, date: Date) -> i64 {
        enrollments
            .values()
            .filter(|e| e.action_id == *action_id && e.occurs_on == date)
            .count() as i64
    }
}

impl Db for MemoryDb {
    fn insert_action(
        &self,
        association_id: &Uuid,
        definition: NewAction,
    ) -> BoxFuture<Result<Action, BackendError>> {
        let now = OffsetDateTime::now_utc();

        let action = Action::new(
            Uuid::new_v4(),
            *association_id,
            Times {
                created_at: now,
                updated_at: now,
            },
            definition,
        );

        self.actions
            .write()
            .unwrap()
            .insert(*action.id(), action.clone());

        async move { Ok(action) }.boxed()
    }

    fn retrieve_action(&self, id: &Uuid) -> BoxFuture<Result<Option<Action>, BackendError>> {
        let action = self.actions.read().unwrap().get(id).cloned();

        async move { Ok(action) }.boxed()
    }

    fn update_action(
        &self,
        id: &Uuid,
        definition: NewAction,
    ) -> BoxFuture<Result<Action, BackendError>> {
        let mut actions = self.actions.write().unwrap();

        let result = match actions.get(id) {
            Some(existing) => {
                let mut updated = existing.with_definition(&definition);
                updated.times.updated_at = OffsetDateTime::now_utc();
                actions.insert(*id, updated.clone());

                Ok(updated)
            }
            None => Err(BackendError::UnknownAction(*id)),
        };

        async move { result }.boxed()
    }

    fn list_actions(&self, association_id: &Uuid) -> BoxFuture<Result<Vec<Action>, BackendError>> {
        let mut actions: Vec<Action> = self
            .actions
            .read()
            .unwrap()
            .values()
            .filter(|a| a.association_id == *association_id)
            .cloned()
            .collect();

        actions.sort_by(|a, b| {
            (a.anchor_date, a.starts_at, &a.title).cmp(&(b.anchor_date, b.starts_at, &b.title))
        });

        async move { Ok(actions) }.boxed()
    }

    fn add_mask(
        &self,
        action_id: &Uuid,
        date: Date,
        association_id: &Uuid,
    ) -> BoxFuture<Result<(), BackendError>> {
        self.masks
            .write()
            .unwrap()
            .entry((*action_id, date))
            .or_insert(*association_id);

        async move { Ok(()) }.boxed()
    }

    fn remove_mask(&self, action_id: &Uuid, date: Date) -> BoxFuture<Result<bool, BackendError>> {
        let removed = self
            .masks
            .write()
            .unwrap()
            .remove(&(*action_id, date))
            .is_some();

        async move { Ok(removed) }.boxed()
    }

    fn masked_dates(
        &self,
        action_id: &Uuid,
        window: Window,
    ) -> BoxFuture<Result<Vec<Date>, BackendError>> {
        let mut dates: Vec<Date> = self
            .masks
            .read()
            .unwrap()
            .keys()
            .filter(|(id, date)| id == action_id && window.contains(*date))
            .map(|(_, date)| *date)
            .collect();

        dates.sort();

        async move { Ok(dates) }.boxed()
    }

    fn is_masked(&self, action_id: &Uuid, date: Date) -> BoxFuture<Result<bool, BackendError>> {
        let masked = self
            .masks
            .read()
            .unwrap()
            .contains_key(&(*action_id, date));

        async move { Ok(masked) }.boxed()
    }

    fn insert_enrollment(
        &self,
        volunteer_id: &Uuid,
        action: &Action,
        date: Date,
    ) -> BoxFuture<Result<Enrollment, BackendError>> {
        let mut enrollments = self.enrollments.write().unwrap();

        let duplicate = enrollments
            .values()
            .any(|e| e.volunteer_id == *volunteer_id && e.action_id == *action.id() && e.occurs_on == date);

        let result = if duplicate {
            Err(BackendError::AlreadyEnrolled)
        } else if Self::occurrence_count(&enrollments, action.id(), date) >= i64::from(action.capacity) {
            Err(BackendError::Full)
        } else {
            let enrollment = Enrollment::new(
                Uuid::new_v4(),
                *volunteer_id,
                *action.id(),
                date,
                EnrollmentStatus::Enrolled,
                OffsetDateTime::now_utc(),
            );

            enrollments.insert(*enrollment.id(), enrollment.clone());

            Ok(enrollment)
        };

        async move { result }.boxed()
    }

    fn insert_standing_enrollment(
        &self,
        volunteer_id: &Uuid,
        action_id: &Uuid,
        date: Date,
    ) -> BoxFuture<Result<bool, BackendError>> {
        let mut enrollments = self.enrollments.write().unwrap();

        let duplicate = enrollments
            .values()
            .any(|e| e.volunteer_id == *volunteer_id && e.action_id == *action_id && e.occurs_on == date);

        let inserted = if duplicate {
            false
        } else {
            let enrollment = Enrollment::new(
                Uuid::new_v4(),
                *volunteer_id,
                *action_id,
                date,
                EnrollmentStatus::Enrolled,
                OffsetDateTime::now_utc(),
            );

            enrollments.insert(*enrollment.id(), enrollment);

            true
        };

        async move { Ok(inserted) }.boxed()
    }

    fn retrieve_enrollment(
        &self,
        id: &Uuid,
    ) -> BoxFuture<Result<Option<Enrollment>, BackendError>> {
        let enrollment = self.enrollments.read().unwrap().get(id).cloned();

        async move { Ok(enrollment) }.boxed()
    }

    fn delete_enrollment(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
        let result = match self.enrollments.write().unwrap().remove(id) {
            Some(_) => Ok(()),
            None => Err(BackendError::UnknownEnrollment(*id)),
        };

        async move { result }.boxed()
    }

    fn delete_future_enrollments(
        &self,
        volunteer_id: &Uuid,
        action_id: &Uuid,
        from: Date,
    ) -> BoxFuture<Result<Vec<Date>, BackendError>> {
        let mut enrollments = self.enrollments.write().unwrap();

        let doomed: Vec<Uuid> = enrollments
            .values()
            .filter(|e| {
                e.volunteer_id == *volunteer_id && e.action_id == *action_id && e.occurs_on >= from
            })
            .map(|e| *e.id())
            .collect();

        let mut dates: Vec<Date> = doomed
            .iter()
            .filter_map(|id| enrollments.remove(id))
            .map(|e| e.occurs_on)
            .collect();

        dates.sort();

        async move { Ok(dates) }.boxed()
    }

    fn count_enrollments(
        &self,
        action_id: &Uuid,
        date: Date,
    ) -> BoxFuture<Result<i64, BackendError>> {
        let count =
            Self::occurrence_count(&self.enrollments.read().unwrap(), action_id, date);

        async move { Ok(count) }.boxed()
    }

    fn enrollment_counts(
        &self,
        action_id: &Uuid,
        window: Window,
    ) -> BoxFuture<Result<Vec<(Date, i64)>, BackendError>> {
        let mut counts: HashMap<Date, i64> = HashMap::new();

        for enrollment in self.enrollments.read().unwrap().values() {
            if enrollment.action_id == *action_id && window.contains(enrollment.occurs_on) {
                *counts.entry(enrollment.occurs_on).or_insert(0) += 1;
            }
        }

        let mut counts: Vec<(Date, i64)> = counts.into_iter().collect();
        counts.sort();

        async move { Ok(counts) }.boxed()
    }

    fn enrollments_for_volunteer(
        &self,
        volunteer_id: &Uuid,
        action_id: &Uuid,
        window: Window,
    ) -> BoxFuture<Result<Vec<Enrollment>, BackendError>> {
        let mut enrollments: Vec<Enrollment> = self
            .enrollments
            .read()
            .unwrap()
            .values()
            .filter(|e| {
                e.volunteer_id == *volunteer_id
                    && e.action_id == *action_id
                    && window.contains(e.occurs_on)
            })
            .cloned()
            .collect();

        enrollments.sort_by_key(|e| e.occurs_on);

        async move { Ok(enrollments) }.boxed()
    }

    fn update_enrollment_status(
        &self,
        id: &Uuid,
        status: EnrollmentStatus,
    ) -> BoxFuture<Result<Enrollment, BackendError>> {
        let mut enrollments = self.enrollments.write().unwrap();

        let result = match enrollments.get_mut(id) {
            Some(enrollment) => {
                enrollment.status = status;

                Ok(enrollment.clone())
            }
            None => Err(BackendError::UnknownEnrollment(*id)),
        };

        async move { result }.boxed()
    }

    fn participants(
        &self,
        action_id: &Uuid,
        date: Date,
    ) -> BoxFuture<Result<Vec<Participant>, BackendError>> {
        let volunteers = self.volunteers.read().unwrap();

        let mut participants: Vec<Participant> = self
            .enrollments
            .read()
            .unwrap()
            .values()
            .filter(|e| e.action_id == *action_id && e.occurs_on == date)
            .map(|e| {
                let (name, email) = volunteers
                    .get(&e.volunteer_id)
                    .cloned()
                    .unwrap_or_default();

                Participant::new(*e.id(), e.volunteer_id, name, email, e.status)
            })
            .collect();

        participants.sort_by(|a, b| a.name.cmp(&b.name));

        async move { Ok(participants) }.boxed()
    }
}
