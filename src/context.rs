//! Training-load section of the coaching assistant's prompt
//!
//! Fetches recent history from a [`TrainingStore`], runs the PMC engine and the
//! insight rules over it, and renders the result as text. Any store failure is
//! logged and the section is left out rather than failing the whole prompt.

use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::AppConfig;
use crate::error::CoachError;
use crate::insights::{Insight, InsightAnalyzer, InsightConfig, InsightContext};
use crate::models::DateRange;
use crate::pmc::{FitnessState, PmcCalculator, PmcConfig};
use crate::store::TrainingStore;

/// Days of workout history fetched: the 42-day CTL window plus margin
pub const HISTORY_DAYS: u64 = 60;

/// Training-load summary handed to the prompt builder
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingContext {
    /// `None` when the store could not be read
    pub fitness: Option<FitnessState>,

    /// Sorted insights for the recent window
    pub insights: Vec<Insight>,

    /// Workouts inside the insight window
    pub recent_workout_count: usize,
}

impl TrainingContext {
    fn unavailable() -> Self {
        Self {
            fitness: None,
            insights: Vec::new(),
            recent_workout_count: 0,
        }
    }

    /// Prompt text; empty when no fitness data is available
    pub fn render(&self) -> String {
        let Some(fitness) = &self.fitness else {
            return String::new();
        };

        let mut out = String::new();
        self.write_sections(fitness, &mut out)
            .map(|_| out)
            .unwrap_or_default()
    }

    fn write_sections(&self, fitness: &FitnessState, out: &mut String) -> std::fmt::Result {
        writeln!(out, "## Training Load (as of {})", fitness.date)?;
        writeln!(out, "- Fitness (CTL): {:.1}", fitness.ctl)?;
        writeln!(out, "- Fatigue (ATL): {:.1}", fitness.atl)?;
        writeln!(out, "- Form (TSB): {:.1}", fitness.tsb)?;
        writeln!(
            out,
            "- Status: {} - {}",
            fitness.form.label(),
            fitness.form.description()
        )?;

        if self.insights.is_empty() {
            return Ok(());
        }

        writeln!(out)?;
        writeln!(out, "## Coaching Insights")?;
        for insight in &self.insights {
            writeln!(
                out,
                "- [{:?}] {}: {}",
                insight.priority, insight.title, insight.description
            )?;
            writeln!(out, "  Recommendation: {}", insight.recommendation)?;
        }
        Ok(())
    }
}

/// Builds [`TrainingContext`] values from a store
pub struct ContextBuilder<S> {
    store: S,
    pmc: PmcCalculator,
    analyzer: InsightAnalyzer,
}

impl<S: TrainingStore> ContextBuilder<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, PmcConfig::default(), InsightConfig::default())
    }

    pub fn with_config(store: S, pmc: PmcConfig, insights: InsightConfig) -> Self {
        Self {
            store,
            pmc: PmcCalculator::with_config(pmc),
            analyzer: InsightAnalyzer::with_config(insights),
        }
    }

    pub fn from_app_config(store: S, config: &AppConfig) -> Self {
        Self::with_config(store, config.pmc.clone(), config.insights.clone())
    }

    /// Build the context, degrading to an empty one if the store fails
    #[tracing::instrument(skip(self))]
    pub fn build(&self, user_id: &str, reference_date: NaiveDate) -> TrainingContext {
        match self.try_build(user_id, reference_date) {
            Ok(context) => context,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    retryable = err.is_retryable(),
                    "Training load unavailable, omitting section"
                );
                TrainingContext::unavailable()
            }
        }
    }

    /// Build the context, surfacing store errors to the caller
    pub fn try_build(
        &self,
        user_id: &str,
        reference_date: NaiveDate,
    ) -> Result<TrainingContext, CoachError> {
        let window_days = u64::from(self.analyzer.config().window_days);
        let history = DateRange::trailing(reference_date, HISTORY_DAYS);
        let recent = DateRange::trailing(reference_date, window_days);

        let workouts = self.store.fetch_workouts(user_id, history)?;
        let max_hr = self.store.fetch_user_max_heart_rate(user_id)?;
        let personal_bests = self.store.fetch_recent_personal_bests(user_id, recent)?;

        let daily_tss = self.pmc.aggregate_daily_tss(&workouts, max_hr);
        let fitness = self.pmc.fitness_state(&daily_tss, reference_date);

        let recent_workouts: Vec<_> = workouts
            .into_iter()
            .filter(|w| recent.contains(w.date))
            .collect();

        let insights = self.analyzer.analyze(&InsightContext {
            workouts: &recent_workouts,
            personal_bests: &personal_bests,
            tsb: fitness.tsb,
            ctl: fitness.ctl,
            atl: fitness.atl,
            reference_date,
        });

        tracing::debug!(
            ctl = fitness.ctl,
            atl = fitness.atl,
            tsb = fitness.tsb,
            insights = insights.len(),
            "Built training context"
        );

        Ok(TrainingContext {
            fitness: Some(fitness),
            insights,
            recent_workout_count: recent_workouts.len(),
        })
    }
}
