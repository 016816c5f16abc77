use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::store::operations::quizzes::Quiz;

/// Grading outcome for one question.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutcome {
    pub correct: bool,
    pub points_awarded: u32,
}

/// Full grading result for one submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredQuiz {
    pub score_percentage: f64,
    pub passed: bool,
    pub earned_points: u32,
    pub total_points: u32,
    /// Per-question detail, including unanswered questions
    /// (correct=false, 0 points).
    pub details: BTreeMap<String, QuestionOutcome>,
}

/// Grade a submitted answer set against a quiz definition.
///
/// Pure and deterministic: identical (quiz, answers) inputs always produce
/// identical results. An unanswered question is scored incorrect, never an
/// error; an answer naming an unknown option is likewise just wrong. A quiz
/// with zero total points scores 0 (no divide-by-zero), and the passing
/// threshold is inclusive.
pub fn score_quiz(quiz: &Quiz, answers: &HashMap<String, String>) -> ScoredQuiz {
    let mut total_points = 0u32;
    let mut earned_points = 0u32;
    let mut details = BTreeMap::new();

    for question in &quiz.questions {
        total_points += question.points;

        let selected = answers.get(&question.id);
        let correct = selected.is_some_and(|option_id| {
            question
                .options
                .iter()
                .any(|option| option.id == *option_id && option.is_correct)
        });

        let points_awarded = if correct { question.points } else { 0 };
        earned_points += points_awarded;
        details.insert(
            question.id.clone(),
            QuestionOutcome {
                correct,
                points_awarded,
            },
        );
    }

    let score_percentage = if total_points > 0 {
        f64::from(earned_points) / f64::from(total_points) * 100.0
    } else {
        0.0
    };
    let passed = score_percentage >= f64::from(quiz.passing_score);

    ScoredQuiz {
        score_percentage,
        passed,
        earned_points,
        total_points,
        details,
    }
}
