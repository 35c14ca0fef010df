use std::sync::Arc;

use chrono::{DateTime, Utc};
use teloxide::{prelude::Requester, types::Message, Bot};
use tracing::instrument;

use crate::{
    database::{
        connection::PlayerStats,
        model::{LeaderboardEntry, UserStats},
    },
    HandlerResult,
};

#[instrument(level = "info", skip(bot, connection))]
pub(crate) async fn my_stats<Store: PlayerStats>(
    bot: Bot,
    msg: Message,
    connection: Arc<Store>,
) -> HandlerResult {
    match connection.player_stats(msg.chat.id.0).await? {
        Some(stats) => {
            bot.send_message(msg.chat.id, format_stats(&stats)).await?;
        }
        None => {
            bot.send_message(
                msg.chat.id,
                "You haven't played the quiz yet! Press 'Start game' to begin.",
            )
            .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, connection))]
pub(crate) async fn leaderboard<Store: PlayerStats>(
    bot: Bot,
    msg: Message,
    connection: Arc<Store>,
) -> HandlerResult {
    let entries = connection.top_players().await?;

    if entries.is_empty() {
        bot.send_message(msg.chat.id, "No player statistics yet.")
            .await?;
    } else {
        bot.send_message(msg.chat.id, format_leaderboard(&entries))
            .await?;
    }

    Ok(())
}

fn format_stats(stats: &UserStats) -> String {
    format!(
        "Your statistics:\n\
         Last result: {} points\n\
         Games played: {}\n\
         Total score: {} points\n\
         Last game: {}",
        stats.last_score,
        stats.total_played,
        stats.all_score,
        last_played_label(stats.last_played)
    )
}

fn format_leaderboard(entries: &[LeaderboardEntry]) -> String {
    let mut text = String::from("Leaderboard (by total score):\n\n");

    for (place, entry) in entries.iter().enumerate() {
        let name = if entry.username.is_empty() {
            "No name"
        } else {
            entry.username.as_str()
        };

        text.push_str(&format!(
            "{}. {}: {} points (games: {})\n",
            place + 1,
            name,
            entry.all_score,
            entry.total_played
        ));
    }

    text
}

fn last_played_label(last_played: Option<DateTime<Utc>>) -> String {
    match last_played {
        Some(when) => when.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "unknown".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn stats_message_lists_all_numbers() {
        let stats = UserStats {
            last_score: 7,
            total_played: 3,
            last_played: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()),
            all_score: 19,
        };

        let text = format_stats(&stats);

        assert!(text.contains("Last result: 7 points"));
        assert!(text.contains("Games played: 3"));
        assert!(text.contains("Total score: 19 points"));
        assert!(text.contains("Last game: 2024-05-01 12:30:00"));
    }

    #[test]
    fn missing_timestamp_renders_unknown() {
        let stats = UserStats {
            last_score: 1,
            total_played: 1,
            last_played: None,
            all_score: 1,
        };

        assert!(format_stats(&stats).contains("Last game: unknown"));
    }

    #[test]
    fn leaderboard_keeps_the_given_order_and_numbers_places() {
        let entry = |username: &str, all_score: i64| LeaderboardEntry {
            username: username.to_owned(),
            last_score: 0,
            total_played: 2,
            last_played: None,
            all_score,
        };

        let text = format_leaderboard(&[entry("alice", 30), entry("", 20), entry("bob", 10)]);

        assert!(text.starts_with("Leaderboard (by total score):"));
        assert!(text.contains("1. alice: 30 points (games: 2)"));
        assert!(text.contains("2. No name: 20 points (games: 2)"));
        assert!(text.contains("3. bob: 10 points (games: 2)"));
    }
}
