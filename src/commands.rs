use std::sync::Arc;

use teloxide::{
    payloads::SendMessageSetters, prelude::Requester, types::Message,
    utils::command::BotCommands, Bot,
};
use tracing::instrument;

use crate::{
    database::connection::{LoadQuestions, PlayerStats, QuizProgress},
    keyboard::main_keyboard,
    runner, stats, HandlerResult, UserDialogue,
};

#[derive(Debug, Clone, BotCommands)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "display help.")]
    Help,
    #[command(description = "show the main menu.")]
    Start,
    #[command(description = "start a new quiz.")]
    Quiz,
    #[command(description = "show your statistics.")]
    Stats,
    #[command(description = "show the top players.")]
    Leaderboard,
}

pub(crate) async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

pub(crate) async fn start(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, "Welcome to the quiz! Choose what to do:")
        .reply_markup(main_keyboard())
        .await?;
    Ok(())
}

/// Routes the persistent reply-keyboard buttons; anything else falls through
/// to the invalid-input reply.
#[instrument(level = "info", skip(bot, dialogue, connection))]
pub(crate) async fn menu<Store: LoadQuestions + QuizProgress + PlayerStats>(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    connection: Arc<Store>,
) -> HandlerResult {
    let text = msg.text().map(ToOwned::to_owned);

    match text.as_deref() {
        Some("Start game") => runner::start_quiz(bot, dialogue, msg, connection).await,
        Some("Stats") => stats::my_stats(bot, msg, connection).await,
        Some("Leaderboard") => stats::leaderboard(bot, msg, connection).await,
        other => {
            log::info!("Unhandled message {:?} in chat {}", other, msg.chat.id);
            bot.send_message(
                msg.chat.id,
                "Unable to handle the message. Enter /help to see usages.",
            )
            .reply_markup(main_keyboard())
            .await?;
            Ok(())
        }
    }
}
