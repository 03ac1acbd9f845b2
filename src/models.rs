use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caregiver answers keyed by question number (1..=20).
pub type AnswerSet = BTreeMap<u8, bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreeningResult {
    pub total_score: u8,
    pub risk_level: RiskLevel,
    pub critical_count: u8,
    pub requires_follow_up: bool,
    pub message: &'static str,
}

#[derive(Debug, Clone)]
pub struct ScreeningRecord {
    pub id: Uuid,
    pub total_score: i16,
    pub risk_level: String,
    pub critical_count: i16,
    pub requires_follow_up: bool,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    Stars,
    GoalsCompleted,
    StreakDays,
}

impl RequirementKind {
    pub fn label(&self) -> &'static str {
        match self {
            RequirementKind::Stars => "stars",
            RequirementKind::GoalsCompleted => "goals completed",
            RequirementKind::StreakDays => "day streak",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BadgeDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub requirement: RequirementKind,
    pub threshold: u32,
    pub color: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChildStats {
    pub total_stars: u32,
    pub goals_completed: u32,
    pub streak_days: u32,
}

impl ChildStats {
    pub fn value_for(&self, kind: RequirementKind) -> u32 {
        match kind {
            RequirementKind::Stars => self.total_stars,
            RequirementKind::GoalsCompleted => self.goals_completed,
            RequirementKind::StreakDays => self.streak_days,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChildBadge {
    pub badge_id: String,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ChildRecord {
    pub id: Uuid,
    pub full_name: String,
    pub birth_date: NaiveDate,
    pub parent_email: String,
    pub total_stars: i32,
}

#[derive(Debug, Clone)]
pub struct SessionLog {
    pub logged_on: NaiveDate,
    pub stars_earned: i32,
    pub note: String,
}

#[derive(Debug, Clone)]
pub struct GoalRecord {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub completed_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    pub badge_id: &'static str,
    pub badge_name: &'static str,
    pub requirement: RequirementKind,
    pub remaining: u32,
}
