//! Serde helpers for calendar dates and clock times.
//!
//! Occurrence arithmetic works on calendar dates only, so the wire format
//! is the date alone, never a timestamp.

use time::{Date, Time};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

pub mod date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    use super::DATE_FORMAT;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let s: String = Deserialize::deserialize(deserializer)?;
        Date::parse(&s, DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}

pub mod time_of_day {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Time;

    use super::TIME_FORMAT;

    pub fn serialize<S: Serializer>(time: &Time, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(TIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Time, D::Error> {
        let s: String = Deserialize::deserialize(deserializer)?;
        Time::parse(&s, TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Formats a date with the wire format used everywhere in responses.
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT)
}

/// Formats a clock time with the wire format used everywhere in responses.
pub fn format_time(time: Time) -> String {
    time.format(TIME_FORMAT)
}
