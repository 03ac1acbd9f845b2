use std::collections::HashSet;
use std::fmt::Write;

use chrono::{Datelike, NaiveDate};

use crate::badges;
use crate::questions::QUESTION_COUNT;
use crate::models::{ChildBadge, ChildRecord, ChildStats, GoalRecord, ScreeningRecord, SessionLog};

pub struct ProgressSnapshot<'a> {
    pub child: &'a ChildRecord,
    pub stats: ChildStats,
    pub screenings: &'a [ScreeningRecord],
    pub badges: &'a [ChildBadge],
    pub goals: &'a [GoalRecord],
    pub sessions: &'a [SessionLog],
}

pub fn age_in_months(birth_date: NaiveDate, today: NaiveDate) -> i64 {
    if today < birth_date {
        return 0;
    }

    let mut months = i64::from(today.year() - birth_date.year()) * 12 + i64::from(today.month())
        - i64::from(birth_date.month());
    if today.day() < birth_date.day() {
        months -= 1;
    }
    months.max(0)
}

pub fn build_report(snapshot: &ProgressSnapshot<'_>, today: NaiveDate) -> String {
    let child = snapshot.child;
    let stats = snapshot.stats;
    let earned: HashSet<String> = snapshot
        .badges
        .iter()
        .map(|badge| badge.badge_id.clone())
        .collect();

    let mut output = String::new();

    let _ = writeln!(output, "# Progress Report: {}", child.full_name);
    let _ = writeln!(
        output,
        "Child {} ({} months), parent contact {}. Generated {}.",
        child.id,
        age_in_months(child.birth_date, today),
        child.parent_email,
        today
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Stars: {}", stats.total_stars);
    let _ = writeln!(output, "- Goals completed: {}", stats.goals_completed);
    let _ = writeln!(output, "- Current streak: {} days", stats.streak_days);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Screenings");

    if snapshot.screenings.is_empty() {
        let _ = writeln!(output, "No M-CHAT-R screenings recorded.");
    } else {
        for screening in snapshot.screenings.iter() {
            let follow_up = if screening.requires_follow_up {
                "follow-up required"
            } else {
                "no follow-up"
            };
            let _ = writeln!(
                output,
                "- {}: score {}/{}, {} risk, {} critical items, {}",
                screening.created_at.date_naive(),
                screening.total_score,
                QUESTION_COUNT,
                screening.risk_level,
                screening.critical_count,
                follow_up
            );
        }
        if let Some(latest) = snapshot.screenings.first() {
            let _ = writeln!(output);
            let _ = writeln!(output, "Latest guidance ({}): {}", latest.id, latest.message);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Badges");

    if snapshot.badges.is_empty() {
        let _ = writeln!(output, "No badges earned yet.");
    } else {
        for earned_badge in snapshot.badges.iter() {
            match badges::find(&earned_badge.badge_id) {
                Some(badge) => {
                    let _ = writeln!(
                        output,
                        "- {} ({}) earned {}",
                        badge.name,
                        badge.description,
                        earned_badge.earned_at.date_naive()
                    );
                }
                None => {
                    let _ = writeln!(
                        output,
                        "- {} earned {}",
                        earned_badge.badge_id,
                        earned_badge.earned_at.date_naive()
                    );
                }
            }
        }
    }

    let milestones = badges::next_milestones(&stats, &earned);
    if !milestones.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Next Milestones");
        for milestone in milestones.iter() {
            let _ = writeln!(
                output,
                "- {}: {} more {}",
                milestone.badge_name,
                milestone.remaining,
                milestone.requirement.label()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Goals");

    if snapshot.goals.is_empty() {
        let _ = writeln!(output, "No goals set.");
    } else {
        for goal in snapshot.goals.iter() {
            match goal.completed_on {
                Some(date) => {
                    let _ = writeln!(output, "- [x] {} (completed {})", goal.title, date);
                }
                None => {
                    let _ = writeln!(output, "- [ ] {} ({}, id {})", goal.title, goal.status, goal.id);
                }
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Sessions");

    if snapshot.sessions.is_empty() {
        let _ = writeln!(output, "No sessions logged.");
    } else {
        for session in snapshot.sessions.iter() {
            let _ = writeln!(
                output,
                "- {}: {} stars. {}",
                session.logged_on, session.stars_earned, session.note
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn sample_child() -> ChildRecord {
        ChildRecord {
            id: Uuid::new_v4(),
            full_name: "Sam Rivera".to_string(),
            birth_date: date(2024, 5, 14),
            parent_email: "morgan@example.com".to_string(),
            total_stars: 12,
        }
    }

    #[test]
    fn age_counts_whole_months() {
        assert_eq!(age_in_months(date(2024, 5, 14), date(2026, 5, 14)), 24);
        assert_eq!(age_in_months(date(2024, 5, 14), date(2026, 5, 13)), 23);
        assert_eq!(age_in_months(date(2026, 5, 14), date(2026, 1, 1)), 0);
    }

    #[test]
    fn empty_history_reports_placeholders() {
        let child = sample_child();
        let snapshot = ProgressSnapshot {
            child: &child,
            stats: ChildStats::default(),
            screenings: &[],
            badges: &[],
            goals: &[],
            sessions: &[],
        };
        let report = build_report(&snapshot, date(2026, 3, 1));
        assert!(report.contains("# Progress Report: Sam Rivera"));
        assert!(report.contains("No M-CHAT-R screenings recorded."));
        assert!(report.contains("No badges earned yet."));
        assert!(report.contains("First Star: 1 more stars"));
        assert!(report.contains("No sessions logged."));
    }

    #[test]
    fn lists_screenings_badges_and_goals() {
        let child = sample_child();
        let screenings = vec![ScreeningRecord {
            id: Uuid::new_v4(),
            total_score: 4,
            risk_level: "medium".to_string(),
            critical_count: 2,
            requires_follow_up: true,
            message: "Medium risk.".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 2, 20, 9, 0, 0).unwrap(),
        }];
        let earned = vec![ChildBadge {
            badge_id: "first_star".to_string(),
            earned_at: Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap(),
        }];
        let goals = vec![GoalRecord {
            id: Uuid::new_v4(),
            title: "Use three-word phrases".to_string(),
            status: "completed".to_string(),
            completed_on: Some(date(2026, 2, 10)),
        }];
        let snapshot = ProgressSnapshot {
            child: &child,
            stats: ChildStats {
                total_stars: 12,
                goals_completed: 1,
                streak_days: 2,
            },
            screenings: &screenings,
            badges: &earned,
            goals: &goals,
            sessions: &[],
        };

        let report = build_report(&snapshot, date(2026, 3, 1));
        assert!(report.contains("- 2026-02-20: score 4/20, medium risk, 2 critical items, follow-up required"));
        assert!(report.contains("- First Star (Earned your very first star) earned 2026-02-01"));
        assert!(report.contains("- [x] Use three-word phrases (completed 2026-02-10)"));
        assert!(report.contains("Superstar: 38 more stars"));
        assert!(!report.contains("Star Collector"));
        assert!(!report.contains(" 0 more "));
    }
}
