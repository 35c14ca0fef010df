use crate::database::model::Question;

/// Per-chat dialogue state. `Active` is the live quiz session: the question
/// set drawn at start plus the running score. The durable question index
/// lives in `quiz_state`, not here.
#[derive(Debug, Clone, Default)]
pub enum QuizState {
    #[default]
    Idle,
    Active {
        questions: Vec<Question>,
        score: u32,
    },
}
