use std::collections::HashSet;

use crate::models::{BadgeDefinition, ChildStats, Milestone, RequirementKind};

const fn badge(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    requirement: RequirementKind,
    threshold: u32,
    color: &'static str,
) -> BadgeDefinition {
    BadgeDefinition {
        id,
        name,
        description,
        icon,
        requirement,
        threshold,
        color,
    }
}

/// Ordered by requirement kind, then ascending threshold.
pub static CATALOG: [BadgeDefinition; 10] = [
    badge("first_star", "First Star", "Earned your very first star", "star", RequirementKind::Stars, 1, "#FFD700"),
    badge("star_collector", "Star Collector", "Collected 10 stars", "star-half", RequirementKind::Stars, 10, "#FFA500"),
    badge("superstar", "Superstar", "Collected 50 stars", "sparkles", RequirementKind::Stars, 50, "#FF6B6B"),
    badge("star_champion", "Star Champion", "Collected 100 stars", "trophy", RequirementKind::Stars, 100, "#9B59B6"),
    badge("goal_getter", "Goal Getter", "Completed your first goal", "flag", RequirementKind::GoalsCompleted, 1, "#4ECDC4"),
    badge("goal_crusher", "Goal Crusher", "Completed 5 goals", "ribbon", RequirementKind::GoalsCompleted, 5, "#45B7D1"),
    badge("goal_master", "Goal Master", "Completed 10 goals", "medal", RequirementKind::GoalsCompleted, 10, "#2E86DE"),
    badge("streak_starter", "On a Roll", "Practiced 3 days in a row", "flame", RequirementKind::StreakDays, 3, "#FF9F43"),
    badge("week_warrior", "Week Warrior", "Practiced 7 days in a row", "calendar", RequirementKind::StreakDays, 7, "#EE5A24"),
    badge("monthly_master", "Monthly Master", "Practiced 30 days in a row", "rocket", RequirementKind::StreakDays, 30, "#10AC84"),
];

pub fn find(id: &str) -> Option<&'static BadgeDefinition> {
    CATALOG.iter().find(|badge| badge.id == id)
}

/// Badges the child now qualifies for that are not in `earned`.
pub fn evaluate(stats: &ChildStats, earned: &HashSet<String>) -> Vec<&'static BadgeDefinition> {
    CATALOG
        .iter()
        .filter(|badge| !earned.contains(badge.id))
        .filter(|badge| stats.value_for(badge.requirement) >= badge.threshold)
        .collect()
}

/// The lowest unearned badge per requirement kind that the child has not yet
/// reached.
pub fn next_milestones(stats: &ChildStats, earned: &HashSet<String>) -> Vec<Milestone> {
    let kinds = [
        RequirementKind::Stars,
        RequirementKind::GoalsCompleted,
        RequirementKind::StreakDays,
    ];

    kinds
        .iter()
        .filter_map(|kind| {
            let current = stats.value_for(*kind);
            CATALOG
                .iter()
                .filter(|badge| badge.requirement == *kind && !earned.contains(badge.id))
                .filter(|badge| badge.threshold > current)
                .min_by_key(|badge| badge.threshold)
                .map(|badge| Milestone {
                    badge_id: badge.id,
                    badge_name: badge.name,
                    requirement: badge.requirement,
                    remaining: badge.threshold - current,
                })
        })
        .collect()
}
