use banter_core::config::{AppConfig, LoadOptions};
use banter_db::connect_with_settings;
use banter_db::repositories::{ChatSummary, InteractionRepository, SqliteInteractionRepository};

use super::{runtime, CommandResult};

pub fn run(chat_id: &str, limit: i64) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("stats", "config", error.to_string(), 2),
    };

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::failure("stats", "runtime", error.to_string(), 2),
    };

    let summary = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            1,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| error.to_string())?;

        let repository = SqliteInteractionRepository::new(pool.clone());
        let summary = repository
            .chat_summary(chat_id, limit)
            .await
            .map_err(|error| error.to_string());
        pool.close().await;
        summary
    });

    match summary {
        Ok(summary) => CommandResult::plain(render(chat_id, &summary)),
        Err(error) => CommandResult::failure("stats", "database", error, 1),
    }
}

fn render(chat_id: &str, summary: &ChatSummary) -> String {
    if summary.total_interactions == 0 {
        return format!("chat {chat_id}: no recorded interactions yet");
    }

    let mut lines = vec![
        format!(
            "chat {chat_id}: {} interactions, {} responses ({:.0}% response rate)",
            summary.total_interactions,
            summary.responses_generated,
            summary.response_rate() * 100.0
        ),
        format!(
            "sentiment: {} positive / {} neutral / {} negative",
            summary.positive, summary.neutral, summary.negative
        ),
    ];

    if summary.top_topics.is_empty() {
        lines.push("top topics: none recorded".to_string());
    } else {
        let topics = summary
            .top_topics
            .iter()
            .map(|(topic, count)| format!("{topic} ({count})"))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("top topics: {topics}"));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use banter_db::repositories::ChatSummary;

    use super::render;

    #[test]
    fn empty_history_renders_a_hint() {
        let rendered = render("chat-1", &ChatSummary::default());
        assert!(rendered.contains("no recorded interactions"));
    }

    #[test]
    fn populated_summary_renders_counts_and_topics() {
        let summary = ChatSummary {
            total_interactions: 4,
            responses_generated: 2,
            positive: 2,
            neutral: 1,
            negative: 1,
            top_topics: vec![("приветствие".to_string(), 2)],
        };

        let rendered = render("chat-1", &summary);
        assert!(rendered.contains("4 interactions, 2 responses (50% response rate)"));
        assert!(rendered.contains("приветствие (2)"));
    }
}
