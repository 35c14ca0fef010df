use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

/// Payload carried by every answer button: which question was on screen,
/// which option was pressed and whether that option was the correct one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerCallback {
    pub question_index: usize,
    pub option_index: usize,
    pub is_correct: bool,
}

impl AnswerCallback {
    pub fn encode(&self) -> String {
        format!(
            "answer_{}_{}_{}",
            self.question_index, self.option_index, self.is_correct as u8
        )
    }

    pub fn parse(data: &str) -> Option<Self> {
        let parts: Vec<&str> = data.split('_').collect();

        if parts.len() != 4 || parts[0] != "answer" {
            return None;
        }

        Some(Self {
            question_index: parts[1].parse().ok()?,
            option_index: parts[2].parse().ok()?,
            is_correct: parts[3].parse::<u8>().ok()? != 0,
        })
    }
}

pub fn options_keyboard(
    question_index: usize,
    options: &[String],
    correct_option: usize,
) -> InlineKeyboardMarkup {
    let keyboard: Vec<Vec<InlineKeyboardButton>> = options
        .iter()
        .enumerate()
        .map(|(option_index, option)| {
            let payload = AnswerCallback {
                question_index,
                option_index,
                is_correct: option_index == correct_option,
            };

            vec![InlineKeyboardButton::callback(option.clone(), payload.encode())]
        })
        .collect();

    InlineKeyboardMarkup::new(keyboard)
}

pub fn main_keyboard() -> KeyboardMarkup {
    let keyboard: Vec<Vec<KeyboardButton>> = vec![vec![
        KeyboardButton::new("Start game"),
        KeyboardButton::new("Stats"),
        KeyboardButton::new("Leaderboard"),
    ]];

    KeyboardMarkup::new(keyboard)
}
