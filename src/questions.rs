use std::io;

use thiserror::Error;

use crate::models::AnswerSet;

pub const QUESTION_COUNT: u8 = 20;

#[derive(Debug, Clone, Copy)]
pub struct Question {
    pub number: u8,
    pub prompt: &'static str,
    /// The answer that counts toward the risk score.
    pub at_risk_answer: bool,
    pub critical: bool,
}

impl Question {
    pub fn is_at_risk(&self, answer: bool) -> bool {
        answer == self.at_risk_answer
    }
}

const fn q(number: u8, prompt: &'static str, at_risk_answer: bool, critical: bool) -> Question {
    Question {
        number,
        prompt,
        at_risk_answer,
        critical,
    }
}

pub static QUESTIONS: [Question; QUESTION_COUNT as usize] = [
    q(1, "If you point at something across the room, does your child look at it?", false, false),
    q(2, "Have you ever wondered if your child might be deaf?", true, true),
    q(3, "Does your child play pretend or make-believe?", false, false),
    q(4, "Does your child like climbing on things?", false, false),
    q(5, "Does your child make unusual finger movements near their eyes?", true, true),
    q(6, "Does your child point with one finger to ask for something or to get help?", false, false),
    q(7, "Does your child point with one finger to show you something interesting?", false, false),
    q(8, "Is your child interested in other children?", false, false),
    q(9, "Does your child show you things by bringing them to you or holding them up for you to see, just to share?", false, false),
    q(10, "Does your child respond when you call their name?", false, false),
    q(11, "When you smile at your child, do they smile back at you?", false, false),
    q(12, "Does your child get upset by everyday noises?", true, true),
    q(13, "Does your child walk?", false, false),
    q(14, "Does your child look you in the eye when you are talking to them, playing with them, or dressing them?", false, true),
    q(15, "Does your child try to copy what you do?", false, false),
    q(16, "If you turn your head to look at something, does your child look around to see what you are looking at?", false, false),
    q(17, "Does your child try to get you to watch them?", false, true),
    q(18, "Does your child understand when you tell them to do something?", false, true),
    q(19, "If something new happens, does your child look at your face to see how you feel about it?", false, false),
    q(20, "Does your child like movement activities?", false, true),
];

pub fn question(number: u8) -> Option<&'static Question> {
    QUESTIONS.iter().find(|question| question.number == number)
}

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("question {0} is outside 1..=20")]
    UnknownQuestion(i64),

    #[error("question {question}: cannot read {value:?} as yes or no")]
    InvalidAnswer { question: u8, value: String },

    #[error("malformed answers file: {0}")]
    Csv(#[from] csv::Error),
}

pub fn parse_answer(question: u8, value: &str) -> Result<bool, AnswerError> {
    match value.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Ok(true),
        "no" | "n" | "false" | "0" => Ok(false),
        _ => Err(AnswerError::InvalidAnswer {
            question,
            value: value.to_string(),
        }),
    }
}

/// Reads `question,answer` rows. A blank answer leaves the question
/// unanswered; a repeated question keeps its last answer.
pub fn read_answers<R: io::Read>(reader: R) -> Result<AnswerSet, AnswerError> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        question: i64,
        answer: String,
    }

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut answers = AnswerSet::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let number = u8::try_from(row.question)
            .ok()
            .and_then(question)
            .map(|question| question.number)
            .ok_or(AnswerError::UnknownQuestion(row.question))?;
        if row.answer.is_empty() {
            continue;
        }
        answers.insert(number, parse_answer(number, &row.answer)?);
    }

    Ok(answers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_is_numbered_in_order() {
        for (index, question) in QUESTIONS.iter().enumerate() {
            assert_eq!(question.number as usize, index + 1);
        }
    }

    #[test]
    fn only_three_questions_treat_yes_as_at_risk() {
        let yes_at_risk: Vec<u8> = QUESTIONS
            .iter()
            .filter(|question| question.at_risk_answer)
            .map(|question| question.number)
            .collect();
        assert_eq!(yes_at_risk, vec![2, 5, 12]);
    }

    #[test]
    fn critical_items_match_guidance() {
        let critical: Vec<u8> = QUESTIONS
            .iter()
            .filter(|question| question.critical)
            .map(|question| question.number)
            .collect();
        assert_eq!(critical, vec![2, 5, 12, 14, 17, 18, 20]);
    }

    #[test]
    fn lookup_rejects_out_of_range() {
        assert!(question(0).is_none());
        assert!(question(21).is_none());
        assert_eq!(question(14).map(|q| q.number), Some(14));
    }

    #[test]
    fn reads_answers_from_csv() {
        let data = "question,answer\n1,yes\n2, No \n3,y\n2,yes\n";
        let answers = read_answers(data.as_bytes()).unwrap();
        assert_eq!(answers.len(), 3);
        assert_eq!(answers.get(&1), Some(&true));
        assert_eq!(answers.get(&2), Some(&true));
        assert_eq!(answers.get(&3), Some(&true));
    }

    #[test]
    fn blank_answers_are_left_unanswered() {
        let data = "question,answer\n4,\n5,  \n6,no\n";
        let answers = read_answers(data.as_bytes()).unwrap();
        assert_eq!(answers.len(), 1);
        assert!(!answers.contains_key(&4));
        assert!(!answers.contains_key(&5));
        assert_eq!(answers.get(&6), Some(&false));
    }

    #[test]
    fn rejects_unknown_question_numbers() {
        let data = "question,answer\n21,yes\n";
        let err = read_answers(data.as_bytes()).unwrap_err();
        assert!(matches!(err, AnswerError::UnknownQuestion(21)));

        let data = "question,answer\n-1,no\n";
        let err = read_answers(data.as_bytes()).unwrap_err();
        assert!(matches!(err, AnswerError::UnknownQuestion(-1)));
    }

    #[test]
    fn rejects_unreadable_answers() {
        let data = "question,answer\n4,maybe\n";
        let err = read_answers(data.as_bytes()).unwrap_err();
        assert!(matches!(err, AnswerError::InvalidAnswer { question: 4, .. }));
    }
}
