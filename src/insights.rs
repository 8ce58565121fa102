//! Rule-based coaching insights
//!
//! Each rule is an independent predicate over the recent workout window and
//! the current fitness metrics. Rules are evaluated in a fixed order, every
//! rule may fire, and the combined list is stable-sorted by priority.

use crate::models::{DateRange, PersonalBest, WorkoutRecord};
use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Severity of an insight as presented to the athlete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Warning,
    Success,
    Info,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Overtraining,
    Recovery,
    Performance,
    InjuryRisk,
    Consistency,
    Zones,
}

/// Ordering is High < Medium < Low so that an ascending sort puts urgent items first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightPriority {
    High,
    Medium,
    Low,
}

/// A single coaching finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub category: InsightCategory,
    pub title: String,
    pub description: String,
    pub recommendation: String,
    pub priority: InsightPriority,
}

/// Thresholds for every insight rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Days of history analysed, ending at the reference date
    pub window_days: u16,

    /// TSB below this is a high overtraining risk
    pub overtraining_danger_tsb: f64,

    /// TSB below this (but not below the danger level) is elevated fatigue
    pub overtraining_warning_tsb: f64,

    /// RPE at or above this counts as a high-intensity session
    pub high_effort_rpe: u8,

    /// Minimum back-to-back high-intensity sessions to warn about
    pub high_effort_streak: usize,

    /// Week-over-week mileage increase (percent) that must be exceeded to warn
    pub mileage_increase_percent: Decimal,

    /// Low consistency fires when training days fall below this...
    pub min_training_days: usize,

    /// ...and total workouts fall below this
    pub min_workouts: usize,

    /// Peak form TSB band, exclusive on both ends
    pub peak_form_min_tsb: f64,
    pub peak_form_max_tsb: f64,

    /// Peak form requires CTL above this
    pub peak_form_min_ctl: f64,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            window_days: 14,
            overtraining_danger_tsb: -30.0,
            overtraining_warning_tsb: -20.0,
            high_effort_rpe: 8,
            high_effort_streak: 3,
            mileage_increase_percent: dec!(20),
            min_training_days: 4,
            min_workouts: 5,
            peak_form_min_tsb: 10.0,
            peak_form_max_tsb: 25.0,
            peak_form_min_ctl: 50.0,
        }
    }
}

/// Inputs shared by every rule
#[derive(Debug, Clone)]
pub struct InsightContext<'a> {
    /// Workouts inside the analysis window, any order
    pub workouts: &'a [WorkoutRecord],

    /// Personal bests fetched for the athlete; only those inside the window count
    pub personal_bests: &'a [PersonalBest],

    pub tsb: f64,
    pub ctl: f64,
    pub atl: f64,

    /// Day the analysis is run for
    pub reference_date: NaiveDate,
}

type InsightRule = fn(&InsightContext<'_>, &InsightConfig) -> Option<Insight>;

/// Evaluation order; also the tie-break order after sorting by priority
const RULES: [(&str, InsightRule); 6] = [
    ("overtraining", overtraining_rule),
    ("high_intensity_streak", high_intensity_streak_rule),
    ("mileage_spike", mileage_spike_rule),
    ("personal_bests", personal_best_rule),
    ("consistency", consistency_rule),
    ("peak_form", peak_form_rule),
];

/// Runs the insight rules against a context
pub struct InsightAnalyzer {
    config: InsightConfig,
}

impl InsightAnalyzer {
    pub fn new() -> Self {
        Self {
            config: InsightConfig::default(),
        }
    }

    pub fn with_config(config: InsightConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InsightConfig {
        &self.config
    }

    /// Evaluate every rule and return the findings sorted by priority
    pub fn analyze(&self, context: &InsightContext<'_>) -> Vec<Insight> {
        if context.workouts.is_empty() {
            return Vec::new();
        }

        let mut insights: Vec<Insight> = RULES
            .iter()
            .filter_map(|(name, rule)| {
                let insight = rule(context, &self.config)?;
                tracing::debug!(rule = *name, title = %insight.title, "Insight rule fired");
                Some(insight)
            })
            .collect();

        sort_by_priority(&mut insights);
        insights
    }
}

impl Default for InsightAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Insights for a workout window and fitness metrics, with default thresholds
///
/// No personal bests are considered and the reference date is the latest workout.
pub fn generate_insights(workouts: &[WorkoutRecord], tsb: f64, ctl: f64, atl: f64) -> Vec<Insight> {
    let Some(reference_date) = workouts.iter().map(|w| w.date).max() else {
        return Vec::new();
    };

    InsightAnalyzer::new().analyze(&InsightContext {
        workouts,
        personal_bests: &[],
        tsb,
        ctl,
        atl,
        reference_date,
    })
}

/// Stable sort, high priority first
pub fn sort_by_priority(insights: &mut [Insight]) {
    insights.sort_by_key(|insight| insight.priority);
}

fn insight(
    insight_type: InsightType,
    category: InsightCategory,
    priority: InsightPriority,
    title: impl Into<String>,
    description: String,
    recommendation: impl Into<String>,
) -> Insight {
    Insight {
        insight_type,
        category,
        title: title.into(),
        description,
        recommendation: recommendation.into(),
        priority,
    }
}

fn overtraining_rule(ctx: &InsightContext<'_>, config: &InsightConfig) -> Option<Insight> {
    if ctx.tsb < config.overtraining_danger_tsb {
        Some(insight(
            InsightType::Danger,
            InsightCategory::Overtraining,
            InsightPriority::High,
            "High Overtraining Risk Detected",
            format!(
                "Your Training Stress Balance is {:.1} (CTL {:.1}, ATL {:.1}), indicating significant accumulated fatigue.",
                ctx.tsb, ctx.ctl, ctx.atl
            ),
            "Take 2-3 easy or rest days and reduce training volume by 30-40% until your TSB recovers.",
        ))
    } else if ctx.tsb < config.overtraining_warning_tsb {
        Some(insight(
            InsightType::Warning,
            InsightCategory::Overtraining,
            InsightPriority::Medium,
            "Elevated Fatigue Levels",
            format!(
                "Your Training Stress Balance is {:.1}, showing fatigue is building faster than fitness.",
                ctx.tsb
            ),
            "Include at least one easy run this week to absorb the recent training.",
        ))
    } else {
        None
    }
}

/// Longest run of consecutive (date-ordered) workouts at or above `threshold` RPE
fn longest_high_effort_streak(workouts: &[WorkoutRecord], threshold: u8) -> usize {
    let mut ordered: Vec<&WorkoutRecord> = workouts.iter().collect();
    ordered.sort_by_key(|w| w.date);

    let mut longest = 0;
    let mut current = 0;
    for workout in ordered {
        if workout.perceived_effort.is_some_and(|rpe| rpe >= threshold) {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn high_intensity_streak_rule(ctx: &InsightContext<'_>, config: &InsightConfig) -> Option<Insight> {
    let high_effort_count = ctx
        .workouts
        .iter()
        .filter(|w| w.perceived_effort.is_some_and(|rpe| rpe >= config.high_effort_rpe))
        .count();
    if high_effort_count < config.high_effort_streak {
        return None;
    }

    let streak = longest_high_effort_streak(ctx.workouts, config.high_effort_rpe);
    if streak < config.high_effort_streak {
        return None;
    }

    Some(insight(
        InsightType::Warning,
        InsightCategory::Recovery,
        InsightPriority::High,
        format!("{} Consecutive High-Intensity Workouts", streak),
        format!(
            "You've completed {} hard workouts in a row (RPE {}+) without an easy day in between.",
            streak, config.high_effort_rpe
        ),
        "Schedule at least 2 easy workouts (RPE 4-6) before your next hard session.",
    ))
}

/// Sunday that starts the week containing `date`
fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_sunday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// Kilometres per week, keyed by the week's Sunday
fn weekly_distance(workouts: &[WorkoutRecord]) -> BTreeMap<NaiveDate, Decimal> {
    let mut weeks = BTreeMap::new();
    for workout in workouts {
        *weeks.entry(week_start(workout.date)).or_insert(Decimal::ZERO) +=
            workout.distance_km.unwrap_or(Decimal::ZERO);
    }
    weeks
}

/// Round to `dp` places with ties away from zero
fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

fn mileage_spike_rule(ctx: &InsightContext<'_>, config: &InsightConfig) -> Option<Insight> {
    let weeks = weekly_distance(ctx.workouts);
    let mut recent = weeks.values().rev();
    let current = *recent.next()?;
    let previous = *recent.next()?;

    if previous.is_zero() {
        return None;
    }

    let increase = (current - previous) / previous * dec!(100);
    if increase <= config.mileage_increase_percent {
        return None;
    }

    Some(insight(
        InsightType::Warning,
        InsightCategory::InjuryRisk,
        InsightPriority::High,
        "Rapid Mileage Increase",
        format!(
            "Your weekly mileage jumped from {:.1}km to {:.1}km, a {:.0}% increase.",
            round_half_up(previous, 1),
            round_half_up(current, 1),
            round_half_up(increase, 0)
        ),
        "Reduce volume slightly this week and keep future increases to 10% per week or less.",
    ))
}

fn personal_best_rule(ctx: &InsightContext<'_>, config: &InsightConfig) -> Option<Insight> {
    let window = DateRange::trailing(ctx.reference_date, u64::from(config.window_days));
    let count = ctx
        .personal_bests
        .iter()
        .filter(|pb| window.contains(pb.achieved_date))
        .count();
    if count == 0 {
        return None;
    }

    Some(insight(
        InsightType::Success,
        InsightCategory::Performance,
        InsightPriority::Low,
        "Recent Personal Best",
        format!(
            "Congratulations! You've set {} personal best{} in the last {} days.",
            count,
            if count == 1 { "" } else { "s" },
            config.window_days
        ),
        "Consolidate the gains with a lighter recovery week before the next training block.",
    ))
}

fn consistency_rule(ctx: &InsightContext<'_>, config: &InsightConfig) -> Option<Insight> {
    let training_days: BTreeSet<NaiveDate> = ctx.workouts.iter().map(|w| w.date).collect();
    let workout_count = ctx.workouts.len();

    if training_days.len() >= config.min_training_days || workout_count >= config.min_workouts {
        return None;
    }

    Some(insight(
        InsightType::Info,
        InsightCategory::Consistency,
        InsightPriority::Medium,
        "Low Training Consistency",
        format!(
            "You've logged {} workout{} in the last {} days.",
            workout_count,
            if workout_count == 1 { "" } else { "s" },
            config.window_days
        ),
        "Aim for a minimum of 3-4 runs per week to keep building fitness.",
    ))
}

fn peak_form_rule(ctx: &InsightContext<'_>, config: &InsightConfig) -> Option<Insight> {
    let in_band = ctx.tsb > config.peak_form_min_tsb && ctx.tsb < config.peak_form_max_tsb;
    if !in_band || ctx.ctl <= config.peak_form_min_ctl {
        return None;
    }

    Some(insight(
        InsightType::Success,
        InsightCategory::Performance,
        InsightPriority::High,
        "Peak Form Detected",
        format!(
            "Your TSB is {:.1} with a CTL of {:.1}: you are fit and fresh.",
            ctx.tsb, ctx.ctl
        ),
        "This is an ideal window for a race or a hard workout.",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkoutKind;

    fn date(day: u32) -> NaiveDate {
        // September 2024; the 1st, 8th, 15th and 22nd are Sundays
        NaiveDate::from_ymd_opt(2024, 9, day).unwrap()
    }

    fn workout(day: u32, rpe: Option<u8>, distance_km: Decimal) -> WorkoutRecord {
        let mut workout = WorkoutRecord::new(format!("w{}", day), date(day), WorkoutKind::EasyRun);
        workout.perceived_effort = rpe;
        workout.distance_km = Some(distance_km);
        workout
    }

    fn context<'a>(
        workouts: &'a [WorkoutRecord],
        personal_bests: &'a [PersonalBest],
        tsb: f64,
        ctl: f64,
    ) -> InsightContext<'a> {
        InsightContext {
            workouts,
            personal_bests,
            tsb,
            ctl,
            atl: ctl - tsb,
            reference_date: date(14),
        }
    }

    fn analyze(ctx: &InsightContext<'_>) -> Vec<Insight> {
        InsightAnalyzer::new().analyze(ctx)
    }

    fn by_category(insights: &[Insight], category: InsightCategory) -> Vec<&Insight> {
        insights.iter().filter(|i| i.category == category).collect()
    }

    /// Six steady workouts on separate days with flat weekly mileage
    fn steady_week() -> Vec<WorkoutRecord> {
        [2, 3, 5, 9, 10, 12]
            .into_iter()
            .map(|day| workout(day, Some(5), dec!(8)))
            .collect()
    }

    #[test]
    fn test_empty_history_yields_nothing() {
        assert!(generate_insights(&[], 0.0, 0.0, 0.0).is_empty());
        assert!(generate_insights(&[], -50.0, 80.0, 130.0).is_empty());
    }

    #[test]
    fn test_steady_training_is_quiet() {
        let workouts = steady_week();
        assert!(analyze(&context(&workouts, &[], 0.0, 40.0)).is_empty());
    }

    #[test]
    fn test_overtraining_thresholds() {
        let workouts = steady_week();

        let insights = analyze(&context(&workouts, &[], -30.1, 60.0));
        let found = by_category(&insights, InsightCategory::Overtraining);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].insight_type, InsightType::Danger);
        assert_eq!(found[0].priority, InsightPriority::High);
        assert!(found[0].description.contains("-30.1"));

        let insights = analyze(&context(&workouts, &[], -29.9, 60.0));
        let found = by_category(&insights, InsightCategory::Overtraining);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].insight_type, InsightType::Warning);

        let insights = analyze(&context(&workouts, &[], -25.0, 60.0));
        let found = by_category(&insights, InsightCategory::Overtraining);
        assert_eq!(found[0].title, "Elevated Fatigue Levels");
        assert_eq!(found[0].priority, InsightPriority::Medium);
        assert!(found[0].description.contains("-25.0"));

        let insights = analyze(&context(&workouts, &[], -20.0, 60.0));
        assert!(by_category(&insights, InsightCategory::Overtraining).is_empty());
    }

    #[test]
    fn test_consecutive_high_intensity() {
        let workouts: Vec<WorkoutRecord> = [9, 9, 5, 9, 9, 9]
            .into_iter()
            .enumerate()
            .map(|(i, rpe)| workout(2 + i as u32, Some(rpe), dec!(8)))
            .collect();

        let insights = analyze(&context(&workouts, &[], 0.0, 40.0));
        let found = by_category(&insights, InsightCategory::Recovery);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].insight_type, InsightType::Warning);
        assert_eq!(found[0].priority, InsightPriority::High);
        assert!(found[0].title.starts_with("3 "));
        assert!(found[0].description.contains("3 hard workouts"));
    }

    #[test]
    fn test_alternating_intensity_does_not_trigger() {
        let workouts: Vec<WorkoutRecord> = [9, 5, 9, 5, 9]
            .into_iter()
            .enumerate()
            .map(|(i, rpe)| workout(2 + i as u32, Some(rpe), dec!(8)))
            .collect();

        let insights = analyze(&context(&workouts, &[], 0.0, 40.0));
        assert!(by_category(&insights, InsightCategory::Recovery).is_empty());
    }

    #[test]
    fn test_streak_uses_chronological_order() {
        // Supplied newest-first; chronologically the three hard days are back to back
        let workouts = vec![
            workout(6, Some(5), dec!(8)),
            workout(5, Some(8), dec!(8)),
            workout(4, Some(10), dec!(8)),
            workout(3, Some(8), dec!(8)),
            workout(2, Some(4), dec!(8)),
        ];

        assert_eq!(longest_high_effort_streak(&workouts, 8), 3);
    }

    #[test]
    fn test_mileage_spike_detection() {
        let workouts = vec![
            workout(3, None, dec!(10)),
            workout(5, None, dec!(10)),
            workout(10, None, dec!(12.5)),
            workout(12, None, dec!(12.5)),
        ];

        let insights = analyze(&context(&workouts, &[], 0.0, 40.0));
        let found = by_category(&insights, InsightCategory::InjuryRisk);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].priority, InsightPriority::High);
        assert!(found[0].description.contains("20.0km"));
        assert!(found[0].description.contains("25.0km"));
        assert!(found[0].description.contains("25%"));
    }

    #[test]
    fn test_mileage_figures_round_ties_up() {
        let workouts = vec![workout(3, None, dec!(20)), workout(10, None, dec!(24.5))];
        let insights = analyze(&context(&workouts, &[], 0.0, 40.0));
        let found = by_category(&insights, InsightCategory::InjuryRisk);
        assert!(found[0].description.contains("from 20.0km to 24.5km, a 23% increase"));

        let workouts = vec![workout(3, None, dec!(20.25)), workout(10, None, dec!(30.25))];
        let insights = analyze(&context(&workouts, &[], 0.0, 40.0));
        let found = by_category(&insights, InsightCategory::InjuryRisk);
        assert!(found[0].description.contains("from 20.3km to 30.3km"));
    }

    #[test]
    fn test_moderate_mileage_increase_ignored() {
        let workouts = vec![
            workout(3, None, dec!(10)),
            workout(5, None, dec!(10)),
            workout(10, None, dec!(11.5)),
            workout(12, None, dec!(11.5)),
        ];

        let insights = analyze(&context(&workouts, &[], 0.0, 40.0));
        assert!(by_category(&insights, InsightCategory::InjuryRisk).is_empty());
    }

    #[test]
    fn test_exactly_twenty_percent_ignored() {
        let workouts = vec![workout(3, None, dec!(20)), workout(10, None, dec!(24))];

        let insights = analyze(&context(&workouts, &[], 0.0, 40.0));
        assert!(by_category(&insights, InsightCategory::InjuryRisk).is_empty());
    }

    #[test]
    fn test_week_buckets_start_on_sunday() {
        assert_eq!(week_start(date(1)), date(1));
        assert_eq!(week_start(date(7)), date(1));
        assert_eq!(week_start(date(8)), date(8));

        // Saturday 7th and Sunday 8th land in different weeks
        let weeks = weekly_distance(&[workout(7, None, dec!(5)), workout(8, None, dec!(5))]);
        assert_eq!(weeks.len(), 2);
    }

    #[test]
    fn test_recent_personal_bests() {
        let workouts = steady_week();
        let personal_bests = vec![
            PersonalBest {
                distance: "5K".to_string(),
                time: "19:45".to_string(),
                achieved_date: date(10),
            },
            PersonalBest {
                distance: "10K".to_string(),
                time: "41:02".to_string(),
                achieved_date: date(12),
            },
        ];

        let insights = analyze(&context(&workouts, &personal_bests, 0.0, 40.0));
        let found = by_category(&insights, InsightCategory::Performance);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].insight_type, InsightType::Success);
        assert_eq!(found[0].priority, InsightPriority::Low);
        assert!(found[0].description.contains("2 personal bests"));
    }

    #[test]
    fn test_stale_personal_best_ignored() {
        let workouts = steady_week();
        let personal_bests = vec![PersonalBest {
            distance: "5K".to_string(),
            time: "19:45".to_string(),
            achieved_date: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
        }];

        let insights = analyze(&context(&workouts, &personal_bests, 0.0, 40.0));
        assert!(insights.is_empty());
    }

    #[test]
    fn test_low_consistency() {
        let workouts = vec![workout(3, Some(5), dec!(8)), workout(10, Some(5), dec!(8))];

        let insights = analyze(&context(&workouts, &[], 0.0, 40.0));
        let found = by_category(&insights, InsightCategory::Consistency);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].insight_type, InsightType::Info);
        assert_eq!(found[0].priority, InsightPriority::Medium);
        assert!(found[0].description.contains("2 workouts"));
    }

    #[test]
    fn test_doubles_count_towards_consistency() {
        // Only three distinct days, but five sessions
        let workouts = vec![
            workout(3, Some(5), dec!(5)),
            workout(3, Some(5), dec!(5)),
            workout(5, Some(5), dec!(5)),
            workout(5, Some(5), dec!(5)),
            workout(7, Some(5), dec!(5)),
        ];

        let insights = analyze(&context(&workouts, &[], 0.0, 40.0));
        assert!(by_category(&insights, InsightCategory::Consistency).is_empty());
    }

    #[test]
    fn test_peak_form() {
        let workouts = steady_week();

        let insights = analyze(&context(&workouts, &[], 15.0, 55.0));
        let found = by_category(&insights, InsightCategory::Performance);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Peak Form Detected");
        assert_eq!(found[0].priority, InsightPriority::High);
        assert!(found[0].description.contains("15.0"));
        assert!(found[0].description.contains("55.0"));

        for (tsb, ctl) in [(10.0, 55.0), (25.0, 55.0), (15.0, 50.0)] {
            let insights = analyze(&context(&workouts, &[], tsb, ctl));
            assert!(insights.is_empty(), "tsb {} ctl {}", tsb, ctl);
        }
    }

    #[test]
    fn test_priority_ordering_is_stable() {
        // Two workouts: low consistency (medium), elevated fatigue (medium),
        // plus a personal best (low) and a mileage spike (high)
        let workouts = vec![workout(3, Some(5), dec!(10)), workout(10, Some(5), dec!(20))];
        let personal_bests = vec![PersonalBest {
            distance: "10K".to_string(),
            time: "41:02".to_string(),
            achieved_date: date(10),
        }];

        let insights = analyze(&context(&workouts, &personal_bests, -25.0, 40.0));
        let categories: Vec<InsightCategory> = insights.iter().map(|i| i.category).collect();
        assert_eq!(
            categories,
            vec![
                InsightCategory::InjuryRisk,
                InsightCategory::Overtraining,
                InsightCategory::Consistency,
                InsightCategory::Performance,
            ]
        );
    }

    #[test]
    fn test_insight_serialization() {
        let workouts = vec![workout(3, None, dec!(10)), workout(10, None, dec!(30))];
        let insights = generate_insights(&workouts, 0.0, 40.0, 40.0);

        let json = serde_json::to_value(&insights[0]).unwrap();
        assert_eq!(json["type"], "warning");
        assert_eq!(json["category"], "injury_risk");
        assert_eq!(json["priority"], "high");
    }
}
