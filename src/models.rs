use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workout kinds recognised by the training log
///
/// Anything the log does not recognise is kept verbatim in `Other` so that
/// it round-trips through storage and falls back to the default intensity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkoutKind {
    EasyRun,
    LongRun,
    TempoRun,
    QualityRun,
    Other(String),
}

impl WorkoutKind {
    /// Display name as stored in the training log ("Easy Run", "Long Run", ...)
    pub fn as_str(&self) -> &str {
        match self {
            WorkoutKind::EasyRun => "Easy Run",
            WorkoutKind::LongRun => "Long Run",
            WorkoutKind::TempoRun => "Tempo Run",
            WorkoutKind::QualityRun => "Quality Run",
            WorkoutKind::Other(name) => name,
        }
    }
}

impl From<&str> for WorkoutKind {
    fn from(s: &str) -> Self {
        match s {
            "Easy Run" => WorkoutKind::EasyRun,
            "Long Run" => WorkoutKind::LongRun,
            "Tempo Run" => WorkoutKind::TempoRun,
            "Quality Run" => WorkoutKind::QualityRun,
            other => WorkoutKind::Other(other.to_string()),
        }
    }
}

impl From<String> for WorkoutKind {
    fn from(s: String) -> Self {
        WorkoutKind::from(s.as_str())
    }
}

impl From<WorkoutKind> for String {
    fn from(kind: WorkoutKind) -> Self {
        match kind {
            WorkoutKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for WorkoutKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(WorkoutKind::from(s))
    }
}

impl fmt::Display for WorkoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completed training session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    /// Unique identifier for the workout
    pub id: String,

    /// Calendar date of the workout (daily aggregation key)
    pub date: NaiveDate,

    /// Distance covered in kilometres
    pub distance_km: Option<Decimal>,

    /// Elapsed time as logged, "H:MM:SS" or "MM:SS"
    pub actual_time: Option<String>,

    /// Rate of perceived exertion, 1-10
    pub perceived_effort: Option<u8>,

    /// Kind of session, drives the distance-based intensity factor
    pub workout_kind: WorkoutKind,

    /// Average heart rate in beats per minute
    pub avg_heart_rate: Option<u16>,

    /// Highest heart rate observed during the session
    pub max_heart_rate: Option<u16>,
}

impl WorkoutRecord {
    /// Create a bare workout for the given date and kind
    pub fn new(id: impl Into<String>, date: NaiveDate, workout_kind: WorkoutKind) -> Self {
        Self {
            id: id.into(),
            date,
            distance_km: None,
            actual_time: None,
            perceived_effort: None,
            workout_kind,
            avg_heart_rate: None,
            max_heart_rate: None,
        }
    }

    /// Duration in seconds; unparseable or missing times count as zero
    pub fn duration_seconds(&self) -> u32 {
        self.actual_time
            .as_deref()
            .and_then(crate::tss::parse_duration)
            .unwrap_or(0)
    }
}

/// A personal best achieved by the athlete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalBest {
    /// Race distance label, e.g. "5K" or "Half Marathon"
    pub distance: String,

    /// Finishing time as logged
    pub time: String,

    /// Date the record was set
    pub achieved_date: NaiveDate,
}

/// Athlete profile fields the training-load core reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    /// Unique athlete identifier
    pub id: String,

    /// Athlete's display name
    pub name: String,

    /// Maximum heart rate, used by the heart-rate TSS estimate
    pub max_heart_rate: Option<u16>,
}

/// An athlete's exported training history, as read by `runcoach import`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingLog {
    pub athlete: AthleteProfile,

    #[serde(default)]
    pub workouts: Vec<WorkoutRecord>,

    #[serde(default)]
    pub personal_bests: Vec<PersonalBest>,
}

/// Inclusive range of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `days` days ending at `end`, inclusive of `end`
    ///
    /// `trailing(d, 14)` spans d-14 through d, mirroring a "last two weeks" lookup.
    pub fn trailing(end: NaiveDate, days: u64) -> Self {
        let start = end.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
