use std::sync::Arc;

use teloxide::{
    dispatching::dialogue::GetChatId,
    payloads::SendMessageSetters,
    prelude::Requester,
    types::{CallbackQuery, ChatId, InputFile, Message},
    Bot,
};
use tracing::instrument;
use url::Url;

use crate::{
    database::{
        connection::{LoadQuestions, PlayerStats, QuizProgress},
        model::Question,
    },
    keyboard::{main_keyboard, options_keyboard, AnswerCallback},
    state::QuizState,
    HandlerResult, UserDialogue,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Verdict {
    Correct,
    Wrong { correct_answer: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Evaluation {
    selected: String,
    verdict: Verdict,
    next_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnswerFault {
    UnknownQuestion,
    UnknownOption,
    TamperedFlag,
}

/// Scores one answer against the session's question set. The correctness
/// flag travels over the wire with the button, so it is re-derived from the
/// bank and a disagreement is rejected instead of trusted.
fn evaluate(questions: &[Question], answer: &AnswerCallback) -> Result<Evaluation, AnswerFault> {
    let question = questions
        .get(answer.question_index)
        .ok_or(AnswerFault::UnknownQuestion)?;

    let selected = question
        .options()
        .get(answer.option_index)
        .ok_or(AnswerFault::UnknownOption)?
        .clone();

    if answer.is_correct != (answer.option_index == question.correct_option()) {
        return Err(AnswerFault::TamperedFlag);
    }

    let verdict = if answer.is_correct {
        Verdict::Correct
    } else {
        Verdict::Wrong {
            correct_answer: question.correct_answer().cloned(),
        }
    };

    Ok(Evaluation {
        selected,
        verdict,
        next_index: answer.question_index as u32 + 1,
    })
}

#[instrument(level = "info", skip(bot, dialogue, connection))]
pub(crate) async fn start_quiz<Store: LoadQuestions + QuizProgress>(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    connection: Arc<Store>,
) -> HandlerResult {
    let chat_id = msg.chat.id;

    // A new start always discards whatever session was in flight.
    dialogue.update(QuizState::Idle).await?;

    if let Some(photo_url) = std::env::var("QUIZ_PHOTO_URL")
        .ok()
        .and_then(|raw| raw.parse::<Url>().ok())
    {
        bot.send_photo(chat_id, InputFile::url(photo_url)).await?;
    }

    bot.send_message(chat_id, "Starting the quiz! Loading fresh questions.")
        .await?;

    let questions = match connection.load_questions().await {
        Ok(questions) if !questions.is_empty() => questions,
        Ok(_) => {
            log::warn!("Question bank is empty, cannot start a quiz in chat {}", chat_id);
            bot.send_message(chat_id, "Could not load quiz questions. Try again later.")
                .await?;
            return Ok(());
        }
        Err(e) => {
            log::error!("Failed to load questions for chat {}: {:?}", chat_id, e);
            bot.send_message(chat_id, "Could not load quiz questions. Try again later.")
                .await?;
            return Ok(());
        }
    };

    connection.set_question_index(chat_id.0, 0).await?;
    dialogue
        .update(QuizState::Active {
            questions: questions.clone(),
            score: 0,
        })
        .await?;

    send_question(&bot, chat_id, &questions, connection.as_ref()).await
}

pub(crate) async fn send_question<Store: QuizProgress>(
    bot: &Bot,
    chat_id: ChatId,
    questions: &[Question],
    connection: &Store,
) -> HandlerResult {
    let index = connection.question_index(chat_id.0).await? as usize;

    if index >= questions.len() {
        bot.send_message(chat_id, "The quiz is already finished!")
            .await?;
        return Ok(());
    }

    let question = &questions[index];

    if !question.is_servable() {
        log::error!("Question {} has malformed data", question.question_id());
        bot.send_message(chat_id, "Error: the question data is malformed.")
            .await?;
        return Ok(());
    }

    log::info!(
        "Asking question {}/{} in chat {}",
        index + 1,
        questions.len(),
        chat_id
    );

    bot.send_message(
        chat_id,
        format!(
            "Question {}/{}:\n\n{}",
            index + 1,
            questions.len(),
            question.text()
        ),
    )
    .reply_markup(options_keyboard(
        index,
        question.options(),
        question.correct_option(),
    ))
    .await?;

    Ok(())
}

#[instrument(level = "info", skip_all)]
pub(crate) async fn take_answer<Store: QuizProgress + PlayerStats>(
    bot: Bot,
    dialogue: UserDialogue,
    q: CallbackQuery,
    (questions, score): (Vec<Question>, u32),
    connection: Arc<Store>,
) -> HandlerResult {
    bot.answer_callback_query(&q.id).await?;

    let Some(chat_id) = q.chat_id() else {
        return Ok(());
    };

    let Some(payload) = q.data.as_deref().and_then(AnswerCallback::parse) else {
        bot.send_message(chat_id, "Error in answer data.").await?;
        return Ok(());
    };

    let evaluation = match evaluate(&questions, &payload) {
        Ok(evaluation) => evaluation,
        Err(AnswerFault::UnknownQuestion) => {
            bot.send_message(chat_id, "Error: question data not found.")
                .await?;
            return Ok(());
        }
        Err(AnswerFault::UnknownOption) => {
            bot.send_message(chat_id, "Error: answer option not found.")
                .await?;
            return Ok(());
        }
        Err(AnswerFault::TamperedFlag) => {
            log::warn!("Correctness flag mismatch in callback from chat {}", chat_id);
            bot.send_message(chat_id, "Error: the answer data is inconsistent.")
                .await?;
            return Ok(());
        }
    };

    // Already-removed keyboards are fine, the press still counts.
    if let Some(message) = &q.message {
        if let Err(e) = bot.edit_message_reply_markup(chat_id, message.id()).await {
            log::debug!("Could not remove the answer keyboard: {:?}", e);
        }
    }

    bot.send_message(chat_id, format!("Your answer: {}", evaluation.selected))
        .await?;

    let score = match &evaluation.verdict {
        Verdict::Correct => {
            bot.send_message(chat_id, "Correct! +1 point").await?;
            score + 1
        }
        Verdict::Wrong { correct_answer } => {
            if let Some(correct) = correct_answer {
                bot.send_message(chat_id, format!("Wrong. The correct answer: {}", correct))
                    .await?;
            }
            score
        }
    };

    connection
        .set_question_index(chat_id.0, evaluation.next_index)
        .await?;

    if (evaluation.next_index as usize) < questions.len() {
        dialogue
            .update(QuizState::Active {
                questions: questions.clone(),
                score,
            })
            .await?;
        send_question(&bot, chat_id, &questions, connection.as_ref()).await
    } else {
        finish_quiz(bot, dialogue, &q, chat_id, questions.len(), score, connection).await
    }
}

async fn finish_quiz<Store: PlayerStats>(
    bot: Bot,
    dialogue: UserDialogue,
    q: &CallbackQuery,
    chat_id: ChatId,
    total: usize,
    score: u32,
    connection: Arc<Store>,
) -> HandlerResult {
    let username = q.from.username.clone().unwrap_or_else(|| {
        if q.from.first_name.is_empty() {
            "Anonymous".to_owned()
        } else {
            q.from.first_name.clone()
        }
    });

    log::info!("{} completed a quiz with score {}/{}", username, score, total);

    connection.save_result(chat_id.0, &username, score).await?;

    // Totals are reported from the store; fall back to this game's numbers
    // if the freshly written row is not visible yet.
    let stats = connection.player_stats(chat_id.0).await?;
    let (all_score, total_played) = match &stats {
        Some(stats) => (stats.all_score, stats.total_played),
        None => (i64::from(score), 1),
    };

    dialogue.exit().await?;

    bot.send_message(
        chat_id,
        format!(
            "Quiz complete!\n\
             This game: {score} of {total} points\n\
             Total score (all games): {all_score} points\n\
             Games played: {total_played}\n\n\
             Press \"Stats\" to see your full statistics",
        ),
    )
    .reply_markup(main_keyboard())
    .await?;

    Ok(())
}

#[instrument(level = "info", skip(bot))]
pub(crate) async fn stale_callback(bot: Bot, q: CallbackQuery) -> HandlerResult {
    bot.answer_callback_query(&q.id).await?;

    if let Some(chat_id) = q.chat_id() {
        bot.send_message(chat_id, "Quiz data not found. Start a new game.")
            .reply_markup(main_keyboard())
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Vec<Question> {
        vec![
            Question::new(
                1,
                "2+2?".into(),
                vec!["3".into(), "4".into()],
                1,
            ),
            Question::new(
                2,
                "Capital of France?".into(),
                vec!["Paris".into(), "Lyon".into(), "Nice".into()],
                0,
            ),
        ]
    }

    #[test]
    fn correct_answer_advances_and_scores() {
        let evaluation = evaluate(
            &session(),
            &AnswerCallback {
                question_index: 0,
                option_index: 1,
                is_correct: true,
            },
        )
        .unwrap();

        assert_eq!(evaluation.selected, "4");
        assert_eq!(evaluation.verdict, Verdict::Correct);
        assert_eq!(evaluation.next_index, 1);
    }

    #[test]
    fn wrong_answer_reports_the_correct_option() {
        let evaluation = evaluate(
            &session(),
            &AnswerCallback {
                question_index: 1,
                option_index: 2,
                is_correct: false,
            },
        )
        .unwrap();

        assert_eq!(evaluation.selected, "Nice");
        assert_eq!(
            evaluation.verdict,
            Verdict::Wrong {
                correct_answer: Some("Paris".into())
            }
        );
        assert_eq!(evaluation.next_index, 2);
    }

    #[test]
    fn question_index_out_of_range_is_rejected() {
        let fault = evaluate(
            &session(),
            &AnswerCallback {
                question_index: 2,
                option_index: 0,
                is_correct: false,
            },
        )
        .unwrap_err();

        assert_eq!(fault, AnswerFault::UnknownQuestion);
    }

    #[test]
    fn option_index_out_of_range_is_rejected() {
        let fault = evaluate(
            &session(),
            &AnswerCallback {
                question_index: 0,
                option_index: 5,
                is_correct: false,
            },
        )
        .unwrap_err();

        assert_eq!(fault, AnswerFault::UnknownOption);
    }

    #[test]
    fn forged_correctness_flag_is_rejected() {
        let forged_true = evaluate(
            &session(),
            &AnswerCallback {
                question_index: 0,
                option_index: 0,
                is_correct: true,
            },
        )
        .unwrap_err();
        assert_eq!(forged_true, AnswerFault::TamperedFlag);

        let forged_false = evaluate(
            &session(),
            &AnswerCallback {
                question_index: 0,
                option_index: 1,
                is_correct: false,
            },
        )
        .unwrap_err();
        assert_eq!(forged_false, AnswerFault::TamperedFlag);
    }

    #[test]
    fn missing_correct_option_yields_no_correction_text() {
        let questions = vec![Question::new(
            7,
            "odd one".into(),
            vec!["a".into(), "b".into()],
            9,
        )];

        let evaluation = evaluate(
            &questions,
            &AnswerCallback {
                question_index: 0,
                option_index: 0,
                is_correct: false,
            },
        )
        .unwrap();

        assert_eq!(
            evaluation.verdict,
            Verdict::Wrong {
                correct_answer: None
            }
        );
    }
}
