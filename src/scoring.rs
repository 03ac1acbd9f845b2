use crate::models::{AnswerSet, RiskLevel, ScreeningResult};
use crate::questions::{Question, QUESTIONS};

pub const LOW_RISK_MESSAGE: &str = "Low risk. No further action is needed unless surveillance \
indicates risk. If the child is younger than 24 months, screen again after their second birthday.";

pub const MEDIUM_RISK_MESSAGE: &str = "Medium risk. Complete the M-CHAT-R Follow-Up interview \
to gather more information about the at-risk responses. Refer for diagnostic evaluation if the \
follow-up score remains 2 or higher.";

pub const HIGH_RISK_MESSAGE: &str = "High risk. The follow-up interview may be bypassed; refer \
immediately for diagnostic evaluation and early intervention eligibility.";

pub fn score_answers(answers: &AnswerSet) -> ScreeningResult {
    let mut total_score = 0u8;
    let mut critical_count = 0u8;

    for question in QUESTIONS.iter() {
        let Some(&answer) = answers.get(&question.number) else {
            continue;
        };

        if question.is_at_risk(answer) {
            total_score += 1;
            if question.critical {
                critical_count += 1;
            }
        }
    }

    let risk_level = risk_level(total_score);

    ScreeningResult {
        total_score,
        risk_level,
        critical_count,
        requires_follow_up: risk_level != RiskLevel::Low,
        message: advisory_message(risk_level),
    }
}

pub fn risk_level(total_score: u8) -> RiskLevel {
    match total_score {
        0..=2 => RiskLevel::Low,
        3..=7 => RiskLevel::Medium,
        _ => RiskLevel::High,
    }
}

pub fn advisory_message(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => LOW_RISK_MESSAGE,
        RiskLevel::Medium => MEDIUM_RISK_MESSAGE,
        RiskLevel::High => HIGH_RISK_MESSAGE,
    }
}

/// Question numbers with no answer; these are skipped by `score_answers`.
pub fn unanswered(answers: &AnswerSet) -> Vec<u8> {
    QUESTIONS
        .iter()
        .map(|question| question.number)
        .filter(|number| !answers.contains_key(number))
        .collect()
}

pub fn at_risk_questions(answers: &AnswerSet) -> Vec<&'static Question> {
    QUESTIONS
        .iter()
        .filter(|question| {
            answers
                .get(&question.number)
                .is_some_and(|answer| question.is_at_risk(*answer))
        })
        .collect()
}
