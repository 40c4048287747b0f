//! RAML temporal values that JSON carries as plain strings.
//!
//! `TimeOnly` is a clock time (`HH:mm:ss[.SSS]`), `DateOnly` a calendar date
//! (`yyyy-MM-dd`) and `DateTimeOnly` a date and time without offset
//! (`yyyy-MM-ddTHH:mm:ss[.SSS]`). Each parses with `FromStr`, formats with
//! `Display` and (de)serializes as a JSON string. Fractional seconds are only
//! written when non-zero, using 3, 6 or 9 digits as needed, so parsing a
//! formatted value always gives back the same value.
//!
//! Generated models use `Option<T>` fields with the [`optional`] helper so that
//! `null`, a missing field and `""` all decode to `None`.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

const TIME_FORMAT: &str = "%H:%M:%S%.f";
const SHORT_TIME_FORMAT: &str = "%H:%M";
const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A string that is not a valid temporal value of the expected kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} value {input:?}: {source}")]
pub struct TemporalParseError {
    kind: &'static str,
    input: String,
    #[source]
    source: chrono::ParseError,
}

impl TemporalParseError {
    fn new(kind: &'static str, input: &str, source: chrono::ParseError) -> Self {
        Self {
            kind,
            input: input.to_string(),
            source,
        }
    }

    /// `time-only`, `date-only` or `datetime-only`.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// The text that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

macro_rules! string_codec {
    ($name:ident) => {
        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                text.parse().map_err(de::Error::custom)
            }
        }

        impl $name {
            /// Parse optional text. Absent and empty input yield `Ok(None)`.
            pub fn decode(text: Option<&str>) -> Result<Option<Self>, TemporalParseError> {
                match text {
                    None | Some("") => Ok(None),
                    Some(text) => text.parse().map(Some),
                }
            }
        }
    };
}

/// A clock time without a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOnly(NaiveTime);

impl TimeOnly {
    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, second).map(Self)
    }

    pub fn from_hms_milli(hour: u32, minute: u32, second: u32, milli: u32) -> Option<Self> {
        NaiveTime::from_hms_milli_opt(hour, minute, second, milli).map(Self)
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn second(&self) -> u32 {
        self.0.second()
    }

    pub fn millisecond(&self) -> u32 {
        self.0.nanosecond() / 1_000_000
    }

    pub fn nanosecond(&self) -> u32 {
        self.0.nanosecond()
    }

    pub fn as_naive_time(&self) -> NaiveTime {
        self.0
    }
}

impl FromStr for TimeOnly {
    type Err = TemporalParseError;

    /// Accepts `HH:mm:ss`, `HH:mm:ss.fraction` and `HH:mm`.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(text, TIME_FORMAT)
            .or_else(|err| NaiveTime::parse_from_str(text, SHORT_TIME_FORMAT).map_err(|_| err))
            .map(Self)
            .map_err(|source| TemporalParseError::new("time-only", text, source))
    }
}

impl fmt::Display for TimeOnly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIME_FORMAT))
    }
}

impl From<NaiveTime> for TimeOnly {
    fn from(time: NaiveTime) -> Self {
        Self(time)
    }
}

impl From<TimeOnly> for NaiveTime {
    fn from(time: TimeOnly) -> Self {
        time.0
    }
}

string_codec!(TimeOnly);

/// A calendar date without a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateOnly(NaiveDate);

impl DateOnly {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn as_naive_date(&self) -> NaiveDate {
        self.0
    }
}

impl FromStr for DateOnly {
    type Err = TemporalParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(text, DATE_FORMAT)
            .map(Self)
            .map_err(|source| TemporalParseError::new("date-only", text, source))
    }
}

impl fmt::Display for DateOnly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl From<NaiveDate> for DateOnly {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

string_codec!(DateOnly);

/// A date and clock time without an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTimeOnly(NaiveDateTime);

impl DateTimeOnly {
    pub fn new(date: DateOnly, time: TimeOnly) -> Self {
        Self(NaiveDateTime::new(date.0, time.0))
    }

    pub fn date(&self) -> DateOnly {
        DateOnly(self.0.date())
    }

    pub fn time(&self) -> TimeOnly {
        TimeOnly(self.0.time())
    }

    pub fn as_naive_date_time(&self) -> NaiveDateTime {
        self.0
    }
}

impl FromStr for DateTimeOnly {
    type Err = TemporalParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        NaiveDateTime::parse_from_str(text, DATE_TIME_FORMAT)
            .map(Self)
            .map_err(|source| TemporalParseError::new("datetime-only", text, source))
    }
}

impl fmt::Display for DateTimeOnly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_TIME_FORMAT))
    }
}

impl From<NaiveDateTime> for DateTimeOnly {
    fn from(date_time: NaiveDateTime) -> Self {
        Self(date_time)
    }
}

string_codec!(DateTimeOnly);

/// serde `with` module for optional string-encoded fields.
///
/// ```ignore
/// #[serde(default, with = "restgen_core::temporal::optional")]
/// ring_at: Option<TimeOnly>,
/// ```
pub mod optional {
    use std::fmt;
    use std::str::FromStr;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: fmt::Display,
        S: Serializer,
    {
        match value {
            Some(value) => serializer.collect_str(value),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: FromStr,
        T::Err: fmt::Display,
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)?.as_deref() {
            None | Some("") => Ok(None),
            Some(text) => text.parse().map(Some).map_err(de::Error::custom),
        }
    }
}
