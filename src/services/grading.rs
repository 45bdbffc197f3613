// src/services/grading.rs

//! Multiple-choice grading shared by lesson quizzes and mock exams.
//!
//! Every question registered in an [`AnswerKey`] counts toward the total.
//! A missing answer, or a choice id that does not belong to the question,
//! counts as incorrect and is never dropped from the denominator.

use std::collections::HashMap;

/// Correct choices per question, plus which choice ids are valid for it.
#[derive(Debug, Default, Clone)]
pub struct AnswerKey {
    questions: Vec<i64>,
    choices: HashMap<i64, HashMap<i64, bool>>,
}

impl AnswerKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a question as gradable even if it has no choices yet.
    pub fn add_question(&mut self, question_id: i64) {
        if !self.choices.contains_key(&question_id) {
            self.questions.push(question_id);
            self.choices.insert(question_id, HashMap::new());
        }
    }

    pub fn add_choice(&mut self, question_id: i64, choice_id: i64, is_correct: bool) {
        self.add_question(question_id);
        if let Some(options) = self.choices.get_mut(&question_id) {
            options.insert(choice_id, is_correct);
        }
    }

    /// Builds a key from `(question_id, choice_id, is_correct)` rows.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (i64, i64, bool)>,
    {
        let mut key = Self::new();
        for (question_id, choice_id, is_correct) in rows {
            key.add_choice(question_id, choice_id, is_correct);
        }
        key
    }

    pub fn contains(&self, question_id: i64) -> bool {
        self.choices.contains_key(&question_id)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// True only when `choice_id` belongs to `question_id` and is flagged correct.
    pub fn is_correct(&self, question_id: i64, choice_id: i64) -> bool {
        self.choices
            .get(&question_id)
            .and_then(|options| options.get(&choice_id))
            .copied()
            .unwrap_or(false)
    }

    /// Questions in registration order.
    pub fn question_ids(&self) -> &[i64] {
        &self.questions
    }
}

/// Running count of correct answers over gradable questions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GradeTally {
    pub correct: usize,
    pub total: usize,
}

impl GradeTally {
    pub fn record(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
    }

    /// Percentage as a float, `None` when nothing was gradable.
    pub fn percent(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.correct as f64 * 100.0 / self.total as f64)
    }

    /// Integer percentage (truncated) used for lesson progress. 0 when empty.
    pub fn whole_percent(&self) -> i32 {
        if self.total == 0 {
            return 0;
        }
        (self.correct * 100 / self.total) as i32
    }
}

/// Parses a raw `{"<question id>": <choice id>}` map.
/// Entries with a non-numeric key or a non-integer value are skipped one by one,
/// so the question they belong to is graded as unanswered.
pub fn parse_choice_answers(raw: HashMap<String, serde_json::Value>) -> HashMap<i64, i64> {
    let mut parsed = HashMap::new();
    for (key, value) in raw {
        let Ok(question_id) = key.trim().parse::<i64>() else {
            tracing::warn!("Skipping answer with non-numeric question key '{}'", key);
            continue;
        };
        match value.as_i64() {
            Some(choice_id) => {
                parsed.insert(question_id, choice_id);
            }
            None => {
                tracing::warn!("Skipping malformed answer for question {}: {}", question_id, value);
            }
        }
    }
    parsed
}

/// Grades submitted `question -> choice` pairs against the key.
pub fn grade_choices(key: &AnswerKey, submitted: &HashMap<i64, i64>) -> GradeTally {
    let mut tally = GradeTally::default();
    for question_id in key.question_ids() {
        let correct = submitted
            .get(question_id)
            .is_some_and(|choice_id| key.is_correct(*question_id, *choice_id));
        tally.record(correct);
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Five questions; choice `q * 10 + 1` is correct, `q * 10 + 2` is wrong.
    fn five_question_key() -> AnswerKey {
        let mut rows = Vec::new();
        for q in 1..=5 {
            rows.push((q, q * 10 + 1, true));
            rows.push((q, q * 10 + 2, false));
        }
        AnswerKey::from_rows(rows)
    }

    #[test]
    fn all_correct_scores_hundred() {
        let key = five_question_key();
        let answers: HashMap<i64, i64> = (1..=5).map(|q| (q, q * 10 + 1)).collect();

        let tally = grade_choices(&key, &answers);
        assert_eq!(tally, GradeTally { correct: 5, total: 5 });
        assert_eq!(tally.whole_percent(), 100);
    }

    #[test]
    fn all_wrong_scores_zero() {
        let key = five_question_key();
        let answers: HashMap<i64, i64> = (1..=5).map(|q| (q, q * 10 + 2)).collect();

        let tally = grade_choices(&key, &answers);
        assert_eq!(tally.correct, 0);
        assert_eq!(tally.whole_percent(), 0);
        assert_eq!(tally.percent(), Some(0.0));
    }

    #[test]
    fn unanswered_questions_stay_in_denominator() {
        let key = five_question_key();
        let answers: HashMap<i64, i64> = (1..=3).map(|q| (q, q * 10 + 1)).collect();

        let tally = grade_choices(&key, &answers);
        assert_eq!(tally, GradeTally { correct: 3, total: 5 });
        assert_eq!(tally.whole_percent(), 60);
    }

    #[test]
    fn choice_from_another_question_is_incorrect() {
        let key = five_question_key();
        let mut answers = HashMap::new();
        // Correct choice of question 2 submitted for question 1.
        answers.insert(1, 21);
        answers.insert(2, 9999);

        let tally = grade_choices(&key, &answers);
        assert_eq!(tally, GradeTally { correct: 0, total: 5 });
    }

    #[test]
    fn answers_for_unknown_questions_are_ignored() {
        let key = five_question_key();
        let mut answers: HashMap<i64, i64> = (1..=5).map(|q| (q, q * 10 + 1)).collect();
        answers.insert(42, 421);

        assert_eq!(grade_choices(&key, &answers).total, 5);
    }

    #[test]
    fn empty_key_yields_zero_not_error() {
        let tally = grade_choices(&AnswerKey::new(), &HashMap::new());
        assert_eq!(tally.total, 0);
        assert_eq!(tally.percent(), None);
        assert_eq!(tally.whole_percent(), 0);
    }

    #[test]
    fn question_without_choices_counts_as_wrong() {
        let mut key = five_question_key();
        key.add_question(6);
        let answers: HashMap<i64, i64> = (1..=5).map(|q| (q, q * 10 + 1)).collect();

        let tally = grade_choices(&key, &answers);
        assert_eq!(tally, GradeTally { correct: 5, total: 6 });
        assert_eq!(tally.whole_percent(), 83);
    }

    #[test]
    fn malformed_lesson_answers_are_skipped_individually() {
        let raw: HashMap<String, serde_json::Value> = serde_json::from_value(serde_json::json!({
            "1": 11,
            "2": 21,
            "3": "oops",
            "four": 41,
            "5": null,
        }))
        .unwrap();

        let answers = parse_choice_answers(raw);
        assert_eq!(answers.len(), 2);

        let tally = grade_choices(&five_question_key(), &answers);
        assert_eq!(tally, GradeTally { correct: 2, total: 5 });
        assert_eq!(tally.whole_percent(), 40);
    }
}
