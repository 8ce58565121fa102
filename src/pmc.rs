use crate::models::WorkoutRecord;
use crate::tss::TssCalculator;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// PMC calculation errors
#[derive(Error, Debug)]
pub enum PmcError {
    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),
}

/// Daily TSS record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTss {
    /// Date of the training day
    pub date: NaiveDate,

    /// Total TSS for the day (sum of all workouts)
    pub total_tss: f64,

    /// Number of workouts completed on this day
    pub workout_count: usize,

    /// Individual workout TSS values, in input order
    pub workout_tss_values: Vec<f64>,
}

/// Summed TSS per calendar date, one entry per distinct date
pub type DailyLoad = BTreeMap<NaiveDate, DailyTss>;

/// Total TSS recorded for `date`, zero for rest days
pub fn daily_total(daily_tss: &DailyLoad, date: NaiveDate) -> f64 {
    daily_tss.get(&date).map(|d| d.total_tss).unwrap_or(0.0)
}

/// Backward-looking window for an exponentially weighted load
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadWindow {
    /// Number of days summed, ending at the target date inclusive
    pub window_days: u16,

    /// Decay constant in days for the exp(-i / tc) weight
    pub time_constant: u16,
}

impl LoadWindow {
    pub const CHRONIC: LoadWindow = LoadWindow {
        window_days: 42,
        time_constant: 42,
    };

    pub const ACUTE: LoadWindow = LoadWindow {
        window_days: 7,
        time_constant: 7,
    };

    /// Weighted sum of daily TSS over the window, divided by the window length.
    ///
    /// Note the divisor is the day count rather than the sum of weights, so a
    /// constant daily load X yields a value strictly below X.
    pub fn weighted_load(&self, daily_tss: &DailyLoad, target_date: NaiveDate) -> f64 {
        if self.window_days == 0 {
            return 0.0;
        }

        let time_constant = f64::from(self.time_constant.max(1));
        let weighted_sum: f64 = (0..u64::from(self.window_days))
            .filter_map(|offset| {
                let date = target_date.checked_sub_days(Days::new(offset))?;
                let weight = (-(offset as f64) / time_constant).exp();
                Some(daily_total(daily_tss, date) * weight)
            })
            .sum();

        weighted_sum / f64::from(self.window_days)
    }
}

/// PMC configuration with customizable load windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PmcConfig {
    /// Chronic Training Load window (default: 42 days, tc 42)
    pub ctl: LoadWindow,

    /// Acute Training Load window (default: 7 days, tc 7)
    pub atl: LoadWindow,
}

impl Default for PmcConfig {
    fn default() -> Self {
        PmcConfig {
            ctl: LoadWindow::CHRONIC,
            atl: LoadWindow::ACUTE,
        }
    }
}

/// Qualitative form derived from Training Stress Balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormStatus {
    #[serde(rename = "Very Fresh")]
    VeryFresh,
    Fresh,
    Neutral,
    Fatigued,
    #[serde(rename = "Very Fatigued")]
    VeryFatigued,
}

impl FormStatus {
    /// Classify TSB; comparisons are strict, first match wins
    pub fn from_tsb(tsb: f64) -> Self {
        if tsb > 25.0 {
            FormStatus::VeryFresh
        } else if tsb > 10.0 {
            FormStatus::Fresh
        } else if tsb > -10.0 {
            FormStatus::Neutral
        } else if tsb > -30.0 {
            FormStatus::Fatigued
        } else {
            FormStatus::VeryFatigued
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FormStatus::VeryFresh => "Very Fresh",
            FormStatus::Fresh => "Fresh",
            FormStatus::Neutral => "Neutral",
            FormStatus::Fatigued => "Fatigued",
            FormStatus::VeryFatigued => "Very Fatigued",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FormStatus::VeryFresh => "Well rested and ready to race, but fitness may start to fade",
            FormStatus::Fresh => "Good balance of fitness and freshness for quality sessions",
            FormStatus::Neutral => "Normal training state with fitness and fatigue in balance",
            FormStatus::Fatigued => "Accumulated fatigue, favour easier sessions",
            FormStatus::VeryFatigued => "Heavy fatigue, recovery needed to avoid overtraining",
        }
    }

    /// Display color used by dashboards
    pub fn color(&self) -> &'static str {
        match self {
            FormStatus::VeryFresh => "green",
            FormStatus::Fresh => "lightgreen",
            FormStatus::Neutral => "yellow",
            FormStatus::Fatigued => "orange",
            FormStatus::VeryFatigued => "red",
        }
    }
}

/// Fitness, fatigue and form as of a reference date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessState {
    pub date: NaiveDate,
    pub ctl: f64,
    pub atl: f64,
    pub tsb: f64,
    pub form: FormStatus,
}

/// Chronic Training Load with the standard 42-day window
pub fn calculate_ctl(daily_tss: &DailyLoad, target_date: NaiveDate) -> f64 {
    LoadWindow::CHRONIC.weighted_load(daily_tss, target_date)
}

/// Acute Training Load with the standard 7-day window
pub fn calculate_atl(daily_tss: &DailyLoad, target_date: NaiveDate) -> f64 {
    LoadWindow::ACUTE.weighted_load(daily_tss, target_date)
}

/// Training Stress Balance, unclamped
pub fn calculate_tsb(ctl: f64, atl: f64) -> f64 {
    ctl - atl
}

/// Core PMC calculation engine
pub struct PmcCalculator {
    config: PmcConfig,
}

impl PmcCalculator {
    /// Create new PMC calculator with default configuration
    pub fn new() -> Self {
        PmcCalculator {
            config: PmcConfig::default(),
        }
    }

    /// Create new PMC calculator with custom configuration
    pub fn with_config(config: PmcConfig) -> Self {
        PmcCalculator { config }
    }

    pub fn config(&self) -> &PmcConfig {
        &self.config
    }

    /// Compute each workout's TSS and sum it per calendar date
    pub fn aggregate_daily_tss(
        &self,
        workouts: &[WorkoutRecord],
        user_max_hr: Option<u16>,
    ) -> DailyLoad {
        let mut daily_tss = DailyLoad::new();

        for workout in workouts {
            let tss = TssCalculator::calculate_tss(workout, user_max_hr);

            daily_tss
                .entry(workout.date)
                .and_modify(|day| {
                    day.total_tss += tss;
                    day.workout_count += 1;
                    day.workout_tss_values.push(tss);
                })
                .or_insert(DailyTss {
                    date: workout.date,
                    total_tss: tss,
                    workout_count: 1,
                    workout_tss_values: vec![tss],
                });
        }

        tracing::debug!(
            workouts = workouts.len(),
            days = daily_tss.len(),
            "Aggregated daily TSS"
        );

        daily_tss
    }

    pub fn ctl(&self, daily_tss: &DailyLoad, date: NaiveDate) -> f64 {
        self.config.ctl.weighted_load(daily_tss, date)
    }

    pub fn atl(&self, daily_tss: &DailyLoad, date: NaiveDate) -> f64 {
        self.config.atl.weighted_load(daily_tss, date)
    }

    /// CTL, ATL, TSB and form as of `date`
    pub fn fitness_state(&self, daily_tss: &DailyLoad, date: NaiveDate) -> FitnessState {
        let ctl = self.ctl(daily_tss, date);
        let atl = self.atl(daily_tss, date);
        let tsb = calculate_tsb(ctl, atl);

        FitnessState {
            date,
            ctl,
            atl,
            tsb,
            form: FormStatus::from_tsb(tsb),
        }
    }

    /// Fitness state for every day from `start_date` to `end_date` inclusive
    pub fn calculate_series(
        &self,
        daily_tss: &DailyLoad,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<FitnessState>, PmcError> {
        if start_date > end_date {
            return Err(PmcError::InvalidDateRange(format!(
                "Start date {} must not be after end date {}",
                start_date, end_date
            )));
        }

        Ok(start_date
            .iter_days()
            .take_while(|date| *date <= end_date)
            .map(|date| self.fitness_state(daily_tss, date))
            .collect())
    }
}

impl Default for PmcCalculator {
    fn default() -> Self {
        Self::new()
    }
}
