use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};

use crate::models::ChildStats;

/// Consecutive days with a session log, ending today or yesterday.
pub fn logging_streak(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = dates.iter().copied().filter(|date| *date <= today).collect();

    let mut cursor = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

pub fn child_stats(
    total_stars: i64,
    goals_completed: i64,
    session_dates: &[NaiveDate],
    today: NaiveDate,
) -> ChildStats {
    ChildStats {
        total_stars: clamp_count(total_stars),
        goals_completed: clamp_count(goals_completed),
        streak_days: logging_streak(session_dates, today),
    }
}

fn clamp_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap() + Duration::days(offset)
    }

    #[test]
    fn no_logs_means_no_streak() {
        assert_eq!(logging_streak(&[], day(0)), 0);
    }

    #[test]
    fn counts_back_from_today() {
        let dates = vec![day(0), day(-1), day(-2), day(-4)];
        assert_eq!(logging_streak(&dates, day(0)), 3);
    }

    #[test]
    fn streak_survives_until_a_full_day_is_missed() {
        let dates = vec![day(-1), day(-2)];
        assert_eq!(logging_streak(&dates, day(0)), 2);

        let dates = vec![day(-2), day(-3)];
        assert_eq!(logging_streak(&dates, day(0)), 0);
    }

    #[test]
    fn duplicates_and_future_dates_are_ignored() {
        let dates = vec![day(0), day(0), day(-1), day(3)];
        assert_eq!(logging_streak(&dates, day(0)), 2);
    }

    #[test]
    fn stats_clamp_negative_counts() {
        let stats = child_stats(-5, 3, &[day(0)], day(0));
        assert_eq!(stats.total_stars, 0);
        assert_eq!(stats.goals_completed, 3);
        assert_eq!(stats.streak_days, 1);
    }
}
