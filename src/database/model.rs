use chrono::{DateTime, Utc};

/// A question drawn from the `quiz_data` bank.
///
/// `options` is stored as a JSON array of strings; anything that fails to
/// decode leaves the question with no options, which makes it unservable.
#[derive(Debug, Clone)]
pub struct Question {
    question_id: i64,
    question: String,
    options: Vec<String>,
    correct_option: usize,
}

impl Question {
    pub fn new(
        question_id: i64,
        question: String,
        options: Vec<String>,
        correct_option: usize,
    ) -> Self {
        Self {
            question_id,
            question,
            options,
            correct_option,
        }
    }

    pub fn from_stored(
        question_id: i64,
        question: String,
        options_json: &str,
        correct_option: i64,
    ) -> Self {
        Self {
            question_id,
            question,
            options: decode_options(options_json),
            correct_option: usize::try_from(correct_option).unwrap_or(usize::MAX),
        }
    }

    pub fn question_id(&self) -> i64 {
        self.question_id
    }

    pub fn text(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_option(&self) -> usize {
        self.correct_option
    }

    pub fn correct_answer(&self) -> Option<&String> {
        self.options.get(self.correct_option)
    }

    /// A question can be presented only with non-empty text, at least one
    /// option and a correct option that actually exists.
    pub fn is_servable(&self) -> bool {
        !self.question.is_empty()
            && !self.options.is_empty()
            && self.correct_option < self.options.len()
    }
}

fn decode_options(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

/// Aggregate statistics row for a single player.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserStats {
    pub last_score: i32,
    pub total_played: i32,
    pub last_played: Option<DateTime<Utc>>,
    pub all_score: i64,
}

/// One leaderboard row, ordered by lifetime score.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeaderboardEntry {
    pub username: String,
    pub last_score: i32,
    pub total_played: i32,
    pub last_played: Option<DateTime<Utc>>,
    pub all_score: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_options_list() {
        let q = Question::from_stored(1, "2+2?".into(), r#"["3", "4", "5"]"#, 1);
        assert_eq!(q.options(), ["3", "4", "5"]);
        assert_eq!(q.correct_answer(), Some(&"4".to_string()));
        assert!(q.is_servable());
    }

    #[test]
    fn malformed_options_degrade_to_empty() {
        let q = Question::from_stored(1, "2+2?".into(), "not json", 0);
        assert!(q.options().is_empty());
        assert!(!q.is_servable());
    }

    #[test]
    fn non_list_options_degrade_to_empty() {
        let q = Question::from_stored(1, "2+2?".into(), r#"{"a": 1}"#, 0);
        assert!(q.options().is_empty());
    }

    #[test]
    fn empty_text_is_not_servable() {
        let q = Question::new(1, String::new(), vec!["a".into()], 0);
        assert!(!q.is_servable());
    }

    #[test]
    fn out_of_range_correct_option_is_not_servable() {
        let q = Question::new(1, "q".into(), vec!["a".into(), "b".into()], 2);
        assert!(!q.is_servable());
        assert_eq!(q.correct_answer(), None);

        let negative = Question::from_stored(1, "q".into(), r#"["a"]"#, -1);
        assert!(!negative.is_servable());
    }
}
