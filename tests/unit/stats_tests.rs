/// Property checks for the statistics and fallback heuristic
use habit_coach_mcp::stats::{best_streak, rolling_completion, streak};
use habit_coach_mcp::*;

use chrono::{Duration, NaiveDate, Utc};

fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(n)
}

/// Deterministic pseudo-random histories: a mix of completed, missed and
/// absent days over 60 days
fn histories() -> Vec<Vec<HabitEntry>> {
    let habit_id = HabitId::new();
    let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
    let mut out = Vec::new();

    for _ in 0..25 {
        let mut history = Vec::new();
        for n in 0..60 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            match (seed >> 33) % 4 {
                0 => {}
                1 => history.push(HabitEntry::from_existing(habit_id.clone(), day(n), false, None, None, Utc::now())),
                _ => history.push(HabitEntry::from_existing(habit_id.clone(), day(n), true, None, None, Utc::now())),
            }
        }
        out.push(history);
    }
    out
}

#[test]
fn test_streak_is_zero_without_completion_on_date() {
    for history in histories() {
        for n in 0..60 {
            let completed_today = history.iter().any(|e| e.date == day(n) && e.completed);
            if !completed_today {
                assert_eq!(streak(&history, day(n)), 0);
            }
        }
    }
}

#[test]
fn test_best_streak_bounds_every_streak() {
    for history in histories() {
        let best = best_streak(&history);
        for n in 0..60 {
            assert!(best >= streak(&history, day(n)));
        }
    }
}

#[test]
fn test_rolling_completion_in_unit_interval() {
    for history in histories() {
        for n in 0..60 {
            for window in [1, 7, 14, 30] {
                if let Some(rate) = rolling_completion(&history, day(n), window) {
                    assert!((0.0..=1.0).contains(&rate));
                }
            }
        }
    }
}

#[test]
fn test_yesterday_only_scenario() {
    let habit_id = HabitId::new();
    let today = day(10);
    let yesterday = day(9);
    let history = vec![HabitEntry::from_existing(habit_id, yesterday, true, None, None, Utc::now())];

    assert_eq!(streak(&history, today), 0);
    assert_eq!(streak(&history, yesterday), 1);
}

#[test]
fn test_seven_day_run_scenario() {
    let habit_id = HabitId::new();
    let history: Vec<HabitEntry> = (0..7)
        .map(|n| HabitEntry::from_existing(habit_id.clone(), day(n), true, None, None, Utc::now()))
        .collect();

    assert_eq!(rolling_completion(&history, day(6), 7), Some(1.0));
    assert_eq!(rolling_completion(&history, day(6), 30), Some(1.0));
}

#[test]
fn test_fallback_is_deterministic_and_bounded() {
    let habit = Habit::new(
        OwnerId::local(),
        "Floss".to_string(),
        None,
        HabitKind::Binary,
        None,
        Frequency::Daily,
        Difficulty::Easy,
    )
    .unwrap();

    for history in histories() {
        let features = FeatureBuilder::from_parts(&habit, &history, None, day(59));
        let first = FallbackHeuristic::score(&features);
        let second = FallbackHeuristic::score(&FeatureBuilder::from_parts(&habit, &history, None, day(59)));

        assert_eq!(first, second);
        assert!((0.0..=1.0).contains(&first.prob_maintain));
    }
}
