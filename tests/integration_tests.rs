use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::tempdir;

use runcoach::insights::{InsightCategory, InsightPriority, InsightType};
use runcoach::{
    calculate_atl, calculate_ctl, calculate_tsb, generate_insights, AppConfig, AthleteProfile,
    ContextBuilder, Database, DateRange, FormStatus, PersonalBest, PmcCalculator, TrainingLog,
    TrainingStore, TssCalculator, WorkoutKind, WorkoutRecord,
};

/// Integration tests that exercise the complete training-load workflow

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn run(id: &str, on: NaiveDate, kind: WorkoutKind, km: Decimal) -> WorkoutRecord {
    let mut workout = WorkoutRecord::new(id, on, kind);
    workout.distance_km = Some(km);
    workout
}

fn runner() -> AthleteProfile {
    AthleteProfile {
        id: "runner".to_string(),
        name: "Test Runner".to_string(),
        max_heart_rate: Some(190),
    }
}

/// A steady 60-day block of 10 km easy runs ending on `end`, one per day
fn steady_block(end: NaiveDate) -> Vec<WorkoutRecord> {
    (0..60u64)
        .map(|offset| {
            let on = end.checked_sub_days(Days::new(offset)).unwrap();
            run(&format!("steady-{}", offset), on, WorkoutKind::EasyRun, dec!(10))
        })
        .collect()
}

#[test]
fn test_tss_examples() {
    let tempo = run("t", date(2024, 9, 2), WorkoutKind::TempoRun, dec!(10));
    assert!((TssCalculator::calculate_tss(&tempo, None) - 85.0).abs() < 1e-9);

    let mut mixed = run("m", date(2024, 9, 2), WorkoutKind::EasyRun, dec!(10));
    mixed.perceived_effort = Some(8);
    mixed.actual_time = Some("01:00:00".to_string());
    assert!((TssCalculator::calculate_tss(&mixed, None) - 70.0).abs() < 1e-9);

    let bare = WorkoutRecord::new("b", date(2024, 9, 2), WorkoutKind::EasyRun);
    assert_eq!(TssCalculator::calculate_tss(&bare, Some(190)), 0.0);
}

#[test]
fn test_constant_load_stays_below_daily_value() {
    let end = date(2024, 9, 28);
    let pmc = PmcCalculator::new();
    let daily = pmc.aggregate_daily_tss(&steady_block(end), None);

    let ctl = calculate_ctl(&daily, end);
    let atl = calculate_atl(&daily, end);

    let weight_sum = |window: u32, tc: f64| -> f64 { (0..window).map(|i| (-(i as f64) / tc).exp()).sum() };
    assert!((ctl - 60.0 * weight_sum(42, 42.0) / 42.0).abs() < 1e-9);
    assert!((atl - 60.0 * weight_sum(7, 7.0) / 7.0).abs() < 1e-9);
    assert!(ctl < 60.0 && atl < 60.0);
    assert!(ctl != atl);

    // Pure: same inputs, same outputs
    assert_eq!(ctl, calculate_ctl(&daily, end));
    assert_eq!(atl, calculate_atl(&daily, end));
    assert_eq!(calculate_tsb(50.0, 30.0), 20.0);
    assert_eq!(calculate_tsb(30.0, 50.0), -20.0);
}

#[test]
fn test_form_boundaries() {
    assert_eq!(FormStatus::from_tsb(25.0001), FormStatus::VeryFresh);
    assert_eq!(FormStatus::from_tsb(25.0), FormStatus::Fresh);
    assert_eq!(FormStatus::from_tsb(10.0), FormStatus::Neutral);
    assert_eq!(FormStatus::from_tsb(-29.9), FormStatus::Fatigued);
    assert_eq!(FormStatus::from_tsb(-30.0), FormStatus::VeryFatigued);
}

#[test]
fn test_overtraining_boundaries() {
    let workouts = vec![run("a", date(2024, 9, 23), WorkoutKind::EasyRun, dec!(5))];
    let overtraining = |tsb: f64| {
        generate_insights(&workouts, tsb, 40.0, 40.0 - tsb)
            .into_iter()
            .find(|i| i.category == InsightCategory::Overtraining)
    };

    let danger = overtraining(-30.1).unwrap();
    assert_eq!(danger.insight_type, InsightType::Danger);
    assert_eq!(danger.priority, InsightPriority::High);

    let warning = overtraining(-25.0).unwrap();
    assert_eq!(warning.insight_type, InsightType::Warning);
    assert_eq!(warning.priority, InsightPriority::Medium);
    assert_eq!(warning.title, "Elevated Fatigue Levels");

    assert_eq!(overtraining(-29.9).unwrap().insight_type, InsightType::Warning);
    assert!(overtraining(-20.0).is_none());
}

#[test]
fn test_mileage_spike_weeks() {
    // Weeks starting Sunday 2024-09-08 and Sunday 2024-09-15
    let spike = vec![
        run("a", date(2024, 9, 9), WorkoutKind::EasyRun, dec!(10)),
        run("b", date(2024, 9, 11), WorkoutKind::EasyRun, dec!(10)),
        run("c", date(2024, 9, 16), WorkoutKind::EasyRun, dec!(12.5)),
        run("d", date(2024, 9, 18), WorkoutKind::LongRun, dec!(12.5)),
    ];
    let insights = generate_insights(&spike, 0.0, 30.0, 30.0);
    let injury = insights
        .iter()
        .find(|i| i.category == InsightCategory::InjuryRisk)
        .unwrap();
    assert_eq!(injury.priority, InsightPriority::High);
    assert!(injury.description.contains("20.0km"));
    assert!(injury.description.contains("25.0km"));
    assert!(injury.description.contains("25%"));

    let mut modest = spike.clone();
    modest[3].distance_km = Some(dec!(10.5));
    assert!(generate_insights(&modest, 0.0, 30.0, 30.0)
        .iter()
        .all(|i| i.category != InsightCategory::InjuryRisk));
}

#[test]
fn test_high_intensity_sequences() {
    let with_efforts = |efforts: &[u8]| -> Vec<WorkoutRecord> {
        efforts
            .iter()
            .enumerate()
            .map(|(i, &rpe)| {
                let mut workout = WorkoutRecord::new(
                    format!("w{}", i),
                    date(2024, 9, 16 + i as u32),
                    WorkoutKind::QualityRun,
                );
                workout.perceived_effort = Some(rpe);
                workout
            })
            .collect()
    };

    let streaky = generate_insights(&with_efforts(&[9, 9, 5, 9, 9, 9]), 0.0, 30.0, 30.0);
    assert!(streaky
        .iter()
        .any(|i| i.category == InsightCategory::Recovery && i.title.starts_with("3 ")));

    let broken = generate_insights(&with_efforts(&[9, 5, 9, 5, 9]), 0.0, 30.0, 30.0);
    assert!(broken.iter().all(|i| i.category != InsightCategory::Recovery));
}

#[test]
fn test_empty_history_has_no_insights() {
    assert!(generate_insights(&[], 0.0, 0.0, 0.0).is_empty());
}

#[test]
fn test_on_disk_workflow() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("training.db");
    let reference = date(2024, 9, 28);

    let mut workouts = steady_block(reference);
    // Taper: the last five days are short and easy
    for workout in workouts.iter_mut().take(5) {
        workout.distance_km = Some(dec!(3));
    }
    let log = TrainingLog {
        athlete: runner(),
        workouts: workouts.clone(),
        personal_bests: vec![PersonalBest {
            distance: "10K".to_string(),
            time: "39:58".to_string(),
            achieved_date: date(2024, 9, 21),
        }],
    };

    {
        let db = Database::new(&db_path).unwrap();
        assert_eq!(db.import_log(&log).unwrap(), 60);
    }

    let db = Database::new(&db_path).unwrap();
    let history = DateRange::trailing(reference, 60);
    let stored = db.fetch_workouts("runner", history).unwrap();
    assert_eq!(stored.len(), 60);

    let pmc = PmcCalculator::new();
    let expected = pmc.fitness_state(&pmc.aggregate_daily_tss(&workouts, Some(190)), reference);

    let context = ContextBuilder::from_app_config(&db, &AppConfig::default()).build("runner", reference);
    assert_eq!(context.fitness.as_ref(), Some(&expected));
    assert!(expected.tsb > 0.0);
    assert_eq!(context.recent_workout_count, 15);

    let titles: Vec<&str> = context.insights.iter().map(|i| i.title.as_str()).collect();
    assert!(titles.contains(&"Recent Personal Best"));
    assert_eq!(context.insights.last().unwrap().priority, InsightPriority::Low);

    let rendered = context.render();
    assert!(rendered.starts_with("## Training Load (as of 2024-09-28)"));
    assert!(rendered.contains(&format!("Fitness (CTL): {:.1}", expected.ctl)));
    assert!(rendered.contains("Recent Personal Best"));
}

#[test]
fn test_unknown_athlete_has_empty_load() {
    let temp_dir = tempdir().unwrap();
    let db = Database::new(temp_dir.path().join("training.db")).unwrap();

    let context = ContextBuilder::new(&db).build("nobody", date(2024, 9, 28));
    let fitness = context.fitness.unwrap();
    assert_eq!((fitness.ctl, fitness.atl, fitness.tsb), (0.0, 0.0, 0.0));
    assert!(context.insights.is_empty());
}
