// src/services/scoring.rs

use std::collections::{BTreeMap, HashMap};

use crate::{
    config::MAX_SCORE,
    models::{exam_attempt::AnswerPayload, mock_exam::ExamSkill},
    services::grading::{AnswerKey, GradeTally},
};

/// Everything the scorer needs to know about an exam.
#[derive(Debug, Clone)]
pub struct ExamSheet {
    pub skill: ExamSkill,
    /// All question ids, in display order.
    pub questions: Vec<i64>,
    /// Only the questions that expose choices.
    pub key: AnswerKey,
}

/// A submission to hand over to manual review.
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeItem {
    Speaking {
        question_id: i64,
        audio: String,
        score: Option<f64>,
    },
    Writing {
        question_id: i64,
        text: String,
    },
}

/// Outcome of scoring an exam before anything is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringPlan {
    pub auto: GradeTally,
    pub speaking_scores: Vec<f64>,
    pub intake: Vec<IntakeItem>,
    pub final_score: f64,
}

/// Parses the raw answer map, skipping entries with a non-numeric key or a malformed value.
pub fn parse_answers(raw: HashMap<String, serde_json::Value>) -> BTreeMap<i64, AnswerPayload> {
    let mut parsed = BTreeMap::new();
    for (key, value) in raw {
        let Ok(question_id) = key.trim().parse::<i64>() else {
            tracing::warn!("Skipping answer with non-numeric question key '{}'", key);
            continue;
        };
        match serde_json::from_value::<AnswerPayload>(value) {
            Ok(payload) => {
                parsed.insert(question_id, payload);
            }
            Err(e) => {
                tracing::warn!("Skipping malformed answer for question {}: {}", question_id, e);
            }
        }
    }
    parsed
}

/// Client-side speech scores must be finite and within 0..=100.
fn accept_client_score(question_id: i64, score: Option<f64>) -> Option<f64> {
    let value = score?;
    if value.is_finite() && (0.0..=MAX_SCORE).contains(&value) {
        Some(value)
    } else {
        tracing::warn!(
            "Ignoring out-of-range speaking score {} for question {}",
            value,
            question_id
        );
        None
    }
}

/// Scores one submission. Each question is handled independently, in exam order.
pub fn plan_attempt(sheet: &ExamSheet, answers: &BTreeMap<i64, AnswerPayload>) -> ScoringPlan {
    let mut auto = GradeTally::default();
    let mut speaking_scores = Vec::new();
    let mut intake = Vec::new();

    for &question_id in &sheet.questions {
        let answer = answers.get(&question_id);

        if sheet.key.contains(question_id) {
            let correct = matches!(
                answer,
                Some(AnswerPayload::Choice(choice_id)) if sheet.key.is_correct(question_id, *choice_id)
            );
            auto.record(correct);
        }

        match answer {
            Some(AnswerPayload::Speaking { audio, score }) => {
                let score = accept_client_score(question_id, *score);
                if let Some(value) = score {
                    speaking_scores.push(value);
                }
                if let Some(audio) = audio.as_ref().filter(|a| !a.trim().is_empty()) {
                    intake.push(IntakeItem::Speaking {
                        question_id,
                        audio: audio.clone(),
                        score,
                    });
                }
            }
            Some(AnswerPayload::Writing(text)) if !text.trim().is_empty() => {
                intake.push(IntakeItem::Writing {
                    question_id,
                    text: text.clone(),
                });
            }
            _ => {}
        }
    }

    for question_id in answers.keys() {
        if !sheet.questions.contains(question_id) {
            tracing::debug!("Ignoring answer for question {} outside the exam", question_id);
        }
    }

    let speaking_avg = if speaking_scores.is_empty() {
        None
    } else {
        Some(speaking_scores.iter().sum::<f64>() / speaking_scores.len() as f64)
    };
    let final_score = final_score(sheet.skill, auto.percent(), speaking_avg);

    ScoringPlan {
        auto,
        speaking_scores,
        intake,
        final_score,
    }
}

/// Picks the attempt score. First matching rule wins:
/// speaking exam with a speaking average, both parts averaged flat,
/// whichever part exists, otherwise 0.
pub fn final_score(
    skill: ExamSkill,
    auto_percent: Option<f64>,
    speaking_avg: Option<f64>,
) -> f64 {
    let raw = match (auto_percent, speaking_avg) {
        (_, Some(speaking)) if skill == ExamSkill::Speaking => speaking,
        (Some(auto), Some(speaking)) => (auto + speaking) / 2.0,
        (Some(auto), None) => auto,
        (None, Some(speaking)) => speaking,
        (None, None) => 0.0,
    };
    round1(raw)
}

/// Rounds to one decimal place, halves to even (72.25 -> 72.2, 72.75 -> 72.8).
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}
