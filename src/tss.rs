use crate::models::{WorkoutKind, WorkoutRecord};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// Intensity factor applied to distance when no kind-specific value exists
pub const DEFAULT_INTENSITY_FACTOR: f64 = 0.7;

/// Methods that can contribute to a workout's TSS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TssMethod {
    /// duration_hours × RPE × 10
    Rpe,
    /// distance_km × intensity_factor × 10
    Distance,
    /// duration_hours × (avg_hr / max_hr) × 100
    HeartRate,
}

/// Per-method TSS estimates and their average
///
/// A method that could not run is `None`. Methods that ran but produced zero
/// (e.g. an unparseable duration) are `Some(0.0)` and still count towards the average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TssBreakdown {
    pub rpe: Option<f64>,
    pub distance: Option<f64>,
    pub heart_rate: Option<f64>,
    pub tss: f64,
}

impl TssBreakdown {
    /// Methods that contributed to the average
    pub fn methods(&self) -> Vec<TssMethod> {
        [
            (TssMethod::Rpe, self.rpe),
            (TssMethod::Distance, self.distance),
            (TssMethod::HeartRate, self.heart_rate),
        ]
        .into_iter()
        .filter_map(|(method, value)| value.map(|_| method))
        .collect()
    }
}

/// Parse a logged duration into seconds
///
/// Three parts are read as H:MM:SS, two as MM:SS. Anything else is `None`.
pub fn parse_duration(time: &str) -> Option<u32> {
    let parts = time
        .split(':')
        .map(|part| part.trim().parse::<u32>().ok())
        .collect::<Option<Vec<u32>>>()?;

    match parts.as_slice() {
        [hours, minutes, seconds] => hours
            .checked_mul(3600)?
            .checked_add(minutes.checked_mul(60)?)?
            .checked_add(*seconds),
        [minutes, seconds] => minutes.checked_mul(60)?.checked_add(*seconds),
        _ => None,
    }
}

/// Core TSS calculation engine
pub struct TssCalculator;

impl TssCalculator {
    /// Training Stress Score for a workout: the mean of every method that can run
    pub fn calculate_tss(workout: &WorkoutRecord, user_max_hr: Option<u16>) -> f64 {
        Self::breakdown(workout, user_max_hr).tss
    }

    /// Run every applicable method and average the results
    pub fn breakdown(workout: &WorkoutRecord, user_max_hr: Option<u16>) -> TssBreakdown {
        let rpe = Self::rpe_tss(workout);
        let distance = Self::distance_tss(workout);
        let heart_rate = Self::heart_rate_tss(workout, user_max_hr);

        let estimates: Vec<f64> = [rpe, distance, heart_rate].into_iter().flatten().collect();
        let tss = if estimates.is_empty() {
            0.0
        } else {
            estimates.iter().sum::<f64>() / estimates.len() as f64
        };

        TssBreakdown {
            rpe,
            distance,
            heart_rate,
            tss,
        }
    }

    /// RPE-based TSS = duration_hours × RPE × 10
    pub fn rpe_tss(workout: &WorkoutRecord) -> Option<f64> {
        let rpe = workout.perceived_effort.filter(|&rpe| rpe > 0)?;
        let hours = Self::logged_hours(workout)?;
        Some(hours * f64::from(rpe) * 10.0)
    }

    /// Distance-based TSS = distance_km × intensity_factor × 10
    pub fn distance_tss(workout: &WorkoutRecord) -> Option<f64> {
        let distance = workout
            .distance_km
            .filter(|d| !d.is_zero())
            .and_then(|d| d.to_f64())?;
        Some(distance * Self::intensity_factor(&workout.workout_kind) * 10.0)
    }

    /// Heart-rate TSS = duration_hours × (avg_hr / max_hr) × 100
    pub fn heart_rate_tss(workout: &WorkoutRecord, user_max_hr: Option<u16>) -> Option<f64> {
        let avg_hr = workout.avg_heart_rate.filter(|&hr| hr > 0)?;
        let max_hr = user_max_hr.filter(|&hr| hr > 0)?;
        let hours = Self::logged_hours(workout)?;
        Some(hours * (f64::from(avg_hr) / f64::from(max_hr)) * 100.0)
    }

    /// Fixed intensity factor per workout kind
    pub fn intensity_factor(kind: &WorkoutKind) -> f64 {
        match kind {
            WorkoutKind::EasyRun => 0.6,
            WorkoutKind::LongRun => 0.7,
            WorkoutKind::TempoRun => 0.85,
            WorkoutKind::QualityRun => 0.95,
            WorkoutKind::Other(_) => DEFAULT_INTENSITY_FACTOR,
        }
    }

    /// Hours from the logged time, `None` only when no time was logged at all.
    /// A time that fails to parse still yields `Some(0.0)`.
    fn logged_hours(workout: &WorkoutRecord) -> Option<f64> {
        let time = workout.actual_time.as_deref().filter(|t| !t.is_empty())?;
        let seconds = parse_duration(time).unwrap_or(0);
        Some(f64::from(seconds) / 3600.0)
    }
}
