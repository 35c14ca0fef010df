use teloxide::dispatching::dialogue::{self, InMemStorage};
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

pub mod commands;
pub mod database;
pub mod keyboard;
pub mod runner;
pub mod state;
pub mod stats;

use commands::Command;
use database::connection::Connection;
use state::QuizState;

pub type UserDialogue = Dialogue<QuizState, InMemStorage<QuizState>>;
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;

pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Help].endpoint(commands::help))
        .branch(case![Command::Start].endpoint(commands::start))
        .branch(case![Command::Quiz].endpoint(runner::start_quiz::<Connection>))
        .branch(case![Command::Stats].endpoint(stats::my_stats::<Connection>))
        .branch(case![Command::Leaderboard].endpoint(stats::leaderboard::<Connection>));

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .endpoint(commands::menu::<Connection>);

    let callback_handler = Update::filter_callback_query()
        .branch(
            case![QuizState::Active { questions, score }]
                .endpoint(runner::take_answer::<Connection>),
        )
        .endpoint(runner::stale_callback);

    dialogue::enter::<Update, InMemStorage<QuizState>, QuizState, _>()
        .branch(message_handler)
        .branch(callback_handler)
}
