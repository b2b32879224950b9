use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::datefmt;
use crate::errors::BackendError;
use crate::normalization;

/// How an action repeats after its anchor date.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatKind {
    /// A single occurrence on the anchor date.
    None,
    /// One occurrence every calendar day from the anchor date.
    Daily,
    /// One occurrence per week, on the anchor date's weekday.
    Weekly,
}

impl RepeatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatKind::None => "none",
            RepeatKind::Daily => "daily",
            RepeatKind::Weekly => "weekly",
        }
    }

    /// Whether the action produces more than one occurrence.
    pub fn repeats(&self) -> bool {
        !matches!(self, RepeatKind::None)
    }
}

impl FromStr for RepeatKind {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(RepeatKind::None),
            "daily" => Ok(RepeatKind::Daily),
            "weekly" => Ok(RepeatKind::Weekly),
            other => Err(BackendError::InvalidRepeatKind(other.to_owned())),
        }
    }
}

/// A volunteer's gender, as carried in the gateway identity.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(BackendError::BadRequest),
        }
    }
}

/// A volunteer's age class, as carried in the gateway identity.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeClass {
    Minor,
    Adult,
}

impl FromStr for AgeClass {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minor" => Ok(AgeClass::Minor),
            "adult" => Ok(AgeClass::Adult),
            _ => Err(BackendError::BadRequest),
        }
    }
}

/// Which genders an action accepts.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderFilter {
    Mixed,
    Male,
    Female,
}

impl GenderFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenderFilter::Mixed => "mixed",
            GenderFilter::Male => "male",
            GenderFilter::Female => "female",
        }
    }
}

impl FromStr for GenderFilter {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mixed" => Ok(GenderFilter::Mixed),
            "male" => Ok(GenderFilter::Male),
            "female" => Ok(GenderFilter::Female),
            _ => Err(BackendError::BadRequest),
        }
    }
}

/// Which age classes an action accepts.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeClassFilter {
    Any,
    Minor,
    Adult,
}

impl AgeClassFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeClassFilter::Any => "any",
            AgeClassFilter::Minor => "minor",
            AgeClassFilter::Adult => "adult",
        }
    }
}

impl FromStr for AgeClassFilter {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(AgeClassFilter::Any),
            "minor" => Ok(AgeClassFilter::Minor),
            "adult" => Ok(AgeClassFilter::Adult),
            _ => Err(BackendError::BadRequest),
        }
    }
}

/// What a volunteer brings to the eligibility check. Fields the gateway
/// did not provide only match the unrestricted filters.
#[derive(Clone, Copy, Debug, Default)]
pub struct EligibilityProfile {
    pub gender: Option<Gender>,
    pub age: Option<AgeClass>,
}

/// The eligibility filter configured on an action.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct Eligibility {
    #[serde(rename = "gender_filter")]
    pub(crate) gender: GenderFilter,

    #[serde(rename = "age_filter")]
    pub(crate) age: AgeClassFilter,
}

impl Eligibility {
    pub fn new(gender: GenderFilter, age: AgeClassFilter) -> Self {
        Self { gender, age }
    }

    /// Whether a volunteer with the given profile may see and join the
    /// action's occurrences.
    pub fn admits(&self, profile: &EligibilityProfile) -> bool {
        let gender_admitted = match self.gender {
            GenderFilter::Mixed => true,
            GenderFilter::Male => profile.gender == Some(Gender::Male),
            GenderFilter::Female => profile.gender == Some(Gender::Female),
        };

        let age_admitted = match self.age {
            AgeClassFilter::Any => true,
            AgeClassFilter::Minor => profile.age == Some(AgeClass::Minor),
            AgeClassFilter::Adult => profile.age == Some(AgeClass::Adult),
        };

        gender_admitted && age_admitted
    }
}

/// A single volunteering-slot definition. Occurrences are always derived
/// from it on demand, never stored.
#[derive(Clone, Debug, Serialize)]
pub struct Action {
    /// The ID of the action.
    pub(crate) id: Uuid,

    /// The association that owns the action.
    pub(crate) association_id: Uuid,

    /// The title shown to volunteers.
    pub(crate) title: String,

    /// The free-text description.
    pub(crate) description: String,

    /// The free-text location, if any.
    pub(crate) location: Option<String>,

    /// The date of the first (or only) occurrence.
    #[serde(with = "datefmt::date")]
    pub(crate) anchor_date: Date,

    /// The time of day at which each occurrence starts.
    #[serde(with = "datefmt::time_of_day")]
    pub(crate) starts_at: Time,

    /// The time of day at which each occurrence ends.
    #[serde(with = "datefmt::time_of_day")]
    pub(crate) ends_at: Time,

    /// The repeat rule.
    pub(crate) repeat: RepeatKind,

    /// The reference of the responsible person, resolved through the
    /// volunteer directory.
    pub(crate) responsible: String,

    /// The number of places per occurrence. Always positive.
    pub(crate) capacity: i32,

    /// Who may see and join the occurrences.
    #[serde(flatten)]
    pub(crate) eligibility: Eligibility,

    /// The times it was created and updated.
    #[serde(flatten)]
    pub(crate) times: Times,
}

impl Action {
    pub fn new(id: Uuid, association_id: Uuid, times: Times, definition: NewAction) -> Self {
        Action {
            id,
            association_id,
            title: definition.title,
            description: definition.description,
            location: definition.location,
            anchor_date: definition.anchor_date,
            starts_at: definition.starts_at,
            ends_at: definition.ends_at,
            repeat: definition.repeat,
            responsible: definition.responsible,
            capacity: definition.capacity,
            eligibility: definition.eligibility,
            times,
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn association_id(&self) -> &Uuid {
        &self.association_id
    }

    pub fn responsible(&self) -> &str {
        &self.responsible
    }

    pub fn repeat(&self) -> RepeatKind {
        self.repeat
    }

    /// The definition this action would have after applying `definition`,
    /// used to compute cascades before the changes are persisted.
    pub fn with_definition(&self, definition: &NewAction) -> Action {
        Action::new(
            self.id,
            self.association_id,
            self.times.clone(),
            definition.clone(),
        )
    }
}

/// The administrator-submitted definition of an action, used both to
/// create and to update one.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewAction {
    /// The title shown to volunteers.
    #[serde(deserialize_with = "normalization::deserialize")]
    pub(crate) title: String,

    /// The free-text description.
    #[serde(default)]
    pub(crate) description: String,

    /// The free-text location.
    #[serde(default)]
    #[serde(deserialize_with = "normalization::deserialize_option")]
    pub(crate) location: Option<String>,

    /// The date of the first (or only) occurrence.
    #[serde(with = "datefmt::date")]
    pub(crate) anchor_date: Date,

    /// The time of day at which each occurrence starts.
    #[serde(with = "datefmt::time_of_day")]
    pub(crate) starts_at: Time,

    /// The time of day at which each occurrence ends.
    #[serde(with = "datefmt::time_of_day")]
    pub(crate) ends_at: Time,

    /// The repeat rule.
    pub(crate) repeat: RepeatKind,

    /// The reference of the responsible person.
    pub(crate) responsible: String,

    /// The number of places per occurrence.
    pub(crate) capacity: i32,

    /// Who may see and join the occurrences.
    #[serde(flatten)]
    pub(crate) eligibility: Eligibility,
}

/// Creation and modification times of a stored row.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Times {
    /// The date and time it was created.
    #[serde(with = "time::serde::timestamp")]
    pub(crate) created_at: OffsetDateTime,

    /// The date and time it was last modified.
    #[serde(with = "time::serde::timestamp")]
    pub(crate) updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(gender: Option<Gender>, age: Option<AgeClass>) -> EligibilityProfile {
        EligibilityProfile { gender, age }
    }

    #[test]
    fn mixed_any_admits_everyone() {
        let eligibility = Eligibility::new(GenderFilter::Mixed, AgeClassFilter::Any);

        assert!(eligibility.admits(&profile(None, None)));
        assert!(eligibility.admits(&profile(Some(Gender::Female), Some(AgeClass::Minor))));
    }

    #[test]
    fn restrictive_filters_require_a_known_profile() {
        let eligibility = Eligibility::new(GenderFilter::Female, AgeClassFilter::Adult);

        assert!(eligibility.admits(&profile(Some(Gender::Female), Some(AgeClass::Adult))));
        assert!(!eligibility.admits(&profile(Some(Gender::Male), Some(AgeClass::Adult))));
        assert!(!eligibility.admits(&profile(Some(Gender::Female), Some(AgeClass::Minor))));
        assert!(!eligibility.admits(&profile(None, None)));
    }

    #[test]
    fn repeat_kinds_parse_and_print_consistently() {
        for kind in &[RepeatKind::None, RepeatKind::Daily, RepeatKind::Weekly] {
            assert_eq!(kind.as_str().parse::<RepeatKind>().unwrap(), *kind);
        }

        assert!("fortnightly".parse::<RepeatKind>().is_err());
    }
}
