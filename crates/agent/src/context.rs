use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use banter_core::domain::{Author, Message};

/// Bounded FIFO buffer of the most recent messages in one chat. Insertion is
/// the only mutation; the oldest entry is dropped when capacity is reached.
pub struct ContextWindow {
    messages: VecDeque<Message>,
    capacity: usize,
    total_human: u64,
    total_bot: u64,
}

impl ContextWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
            total_human: 0,
            total_bot: 0,
        }
    }

    pub fn append(&mut self, message: Message) {
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        match message.author {
            Author::Human => self.total_human += 1,
            Author::Bot => self.total_bot += 1,
        }
        self.messages.push_back(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Human messages ever appended, including those already evicted.
    pub fn total_human(&self) -> u64 {
        self.total_human
    }

    pub fn total_bot(&self) -> u64 {
        self.total_bot
    }

    /// The most recent `limit` human-authored texts, oldest first. Pure;
    /// returns fewer than `limit` when there is not enough history.
    pub fn recent_human_texts(&self, limit: usize) -> Vec<String> {
        let mut texts = self
            .messages
            .iter()
            .rev()
            .filter(|message| message.is_human())
            .take(limit)
            .map(|message| message.text.clone())
            .collect::<Vec<_>>();
        texts.reverse();
        texts
    }

    /// Buffered messages by `author` within the trailing `window` ending at
    /// `now`.
    pub fn count_since(&self, author: Author, window: Duration, now: DateTime<Utc>) -> u64 {
        self.messages
            .iter()
            .filter(|message| message.author == author && now - message.timestamp < window)
            .count() as u64
    }

    /// Rough distinct-participant estimate consumed by the history sink.
    pub fn participants_estimate(&self) -> i64 {
        self.messages.len().min(10) as i64
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use banter_core::domain::{Author, Message};

    use super::ContextWindow;

    fn base_time() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn holds_at_most_capacity_and_keeps_the_most_recent() {
        let mut window = ContextWindow::new(3);
        let start = base_time();

        for index in 0..5 {
            window.append(Message::human(
                format!("message-{index}"),
                start + Duration::seconds(index),
            ));
        }

        assert_eq!(window.len(), 3);
        assert_eq!(
            window.recent_human_texts(10),
            vec!["message-2".to_string(), "message-3".to_string(), "message-4".to_string()]
        );
        assert_eq!(window.total_human(), 5);
    }

    #[test]
    fn recent_human_texts_excludes_bot_messages_and_is_oldest_first() {
        let mut window = ContextWindow::new(10);
        let start = base_time();

        window.append(Message::human("first", start));
        window.append(Message::bot("interjection", start + Duration::seconds(1)));
        window.append(Message::human("second", start + Duration::seconds(2)));
        window.append(Message::human("third", start + Duration::seconds(3)));

        assert_eq!(
            window.recent_human_texts(2),
            vec!["second".to_string(), "third".to_string()]
        );
    }

    #[test]
    fn recent_human_texts_is_idempotent_without_appends() {
        let mut window = ContextWindow::new(5);
        let start = base_time();
        window.append(Message::human("a", start));
        window.append(Message::human("b", start + Duration::seconds(1)));

        let first = window.recent_human_texts(5);
        let second = window.recent_human_texts(5);
        assert_eq!(first, second);
    }

    #[test]
    fn count_since_only_counts_the_trailing_window() {
        let mut window = ContextWindow::new(10);
        let start = base_time();
        let now = start + Duration::minutes(15);

        window.append(Message::human("old", start));
        window.append(Message::human("recent", now - Duration::minutes(5)));
        window.append(Message::bot("reply", now - Duration::minutes(4)));

        assert_eq!(window.count_since(Author::Human, Duration::minutes(10), now), 1);
        assert_eq!(window.count_since(Author::Bot, Duration::minutes(10), now), 1);
        assert_eq!(window.count_since(Author::Human, Duration::minutes(20), now), 2);
    }

    #[test]
    fn participants_estimate_is_capped() {
        let mut window = ContextWindow::new(20);
        let start = base_time();
        for index in 0..15 {
            window.append(Message::human(
                format!("m-{index}"),
                start + Duration::seconds(index),
            ));
        }
        assert_eq!(window.participants_estimate(), 10);
    }
}
