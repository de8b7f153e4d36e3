use chrono::{DateTime, Duration, Utc};

use banter_core::config::EngagementConfig;
use banter_core::domain::Author;

use crate::context::ContextWindow;

/// Per-chat engagement counters, mutated only after a bot message is
/// actually recorded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngagementState {
    pub bot_message_count: u64,
    pub last_bot_message_at: Option<DateTime<Utc>>,
}

impl EngagementState {
    pub fn note_bot_message(&mut self, at: DateTime<Utc>) {
        self.bot_message_count += 1;
        self.last_bot_message_at = Some(at);
    }
}

/// Decides *when* a response is allowed, independent of content.
#[derive(Clone, Debug)]
pub struct EngagementPolicy {
    response_frequency: u32,
    cooldown: Duration,
    lookback: Duration,
}

impl EngagementPolicy {
    pub fn new(config: &EngagementConfig) -> Self {
        Self {
            response_frequency: config.response_frequency.max(1),
            cooldown: Duration::seconds(config.cooldown_secs as i64),
            lookback: Duration::minutes(config.lookback_minutes as i64),
        }
    }

    pub fn permits(
        &self,
        window: &ContextWindow,
        state: &EngagementState,
        now: DateTime<Utc>,
    ) -> bool {
        if window.total_human() == 0 {
            return false;
        }

        if let Some(last) = state.last_bot_message_at {
            if now - last < self.cooldown {
                return false;
            }
        }

        let humans = window.count_since(Author::Human, self.lookback, now);
        let bots = window.count_since(Author::Bot, self.lookback, now);
        if humans == 0 {
            return false;
        }

        let frequency = u64::from(self.response_frequency);
        if bots == 0 && humans >= frequency {
            return true;
        }

        // B/H < 1/f, kept in integers
        bots * frequency < humans
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use banter_core::config::EngagementConfig;
    use banter_core::domain::Message;

    use super::{EngagementPolicy, EngagementState};
    use crate::context::ContextWindow;

    fn policy() -> EngagementPolicy {
        EngagementPolicy::new(&EngagementConfig::default())
    }

    fn base_time() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn denies_before_any_human_message() {
        let window = ContextWindow::new(20);
        assert!(!policy().permits(&window, &EngagementState::default(), base_time()));
    }

    #[test]
    fn denies_inside_cooldown_regardless_of_activity() {
        let now = base_time();
        let mut window = ContextWindow::new(20);
        for index in 0..5 {
            window.append(Message::human(format!("m-{index}"), now - Duration::seconds(60)));
        }

        let mut state = EngagementState::default();
        state.note_bot_message(now - Duration::seconds(10));

        assert!(!policy().permits(&window, &state, now));
    }

    #[test]
    fn allows_first_reply_after_enough_recent_messages() {
        let now = base_time();
        let mut window = ContextWindow::new(20);
        window.append(Message::human("hello", now - Duration::seconds(90)));
        window.append(Message::human("anyone here?", now - Duration::seconds(30)));

        assert!(policy().permits(&window, &EngagementState::default(), now));
    }

    #[test]
    fn denies_when_participation_ratio_reaches_the_cap() {
        // frequency 2 caps the bot at strictly less than one reply per two
        // human messages inside the lookback window
        let now = base_time();
        let mut window = ContextWindow::new(20);
        window.append(Message::human("a", now - Duration::minutes(5)));
        window.append(Message::human("b", now - Duration::minutes(4)));
        window.append(Message::bot("reply", now - Duration::minutes(3)));

        let mut state = EngagementState::default();
        state.note_bot_message(now - Duration::minutes(3));

        // B=1, H=2: 1/2 is not < 1/2
        assert!(!policy().permits(&window, &state, now));

        window.append(Message::human("c", now - Duration::minutes(1)));
        // B=1, H=3: 1/3 < 1/2
        assert!(policy().permits(&window, &state, now));
    }

    #[test]
    fn old_bot_replies_age_out_of_the_lookback_window() {
        let now = base_time();
        let mut window = ContextWindow::new(20);
        window.append(Message::bot("ancient", now - Duration::minutes(30)));
        window.append(Message::human("a", now - Duration::minutes(2)));
        window.append(Message::human("b", now - Duration::minutes(1)));

        let mut state = EngagementState::default();
        state.note_bot_message(now - Duration::minutes(30));

        assert!(policy().permits(&window, &state, now));
    }

    #[test]
    fn bot_is_never_permitted_at_or_above_the_participation_cap() {
        // replay a stream, only letting the bot speak when the policy
        // permits; at every permitted turn the lookback ratio must still be
        // strictly below 1/frequency (or the bot must not have spoken yet)
        let config = EngagementConfig { cooldown_secs: 0, ..EngagementConfig::default() };
        let policy = EngagementPolicy::new(&config);
        let frequency = u64::from(config.response_frequency);
        let lookback = Duration::minutes(config.lookback_minutes as i64);

        let mut window = ContextWindow::new(config.buffer_capacity);
        let mut state = EngagementState::default();
        let start = base_time();
        let mut permitted_turns = 0;

        for index in 0..60 {
            let now = start + Duration::seconds(index * 20);
            window.append(Message::human(format!("m-{index}"), now));

            let humans =
                window.count_since(banter_core::domain::Author::Human, lookback, now);
            let bots = window.count_since(banter_core::domain::Author::Bot, lookback, now);
            let allowed = policy.permits(&window, &state, now);

            if bots > 0 && bots * frequency >= humans {
                assert!(!allowed, "cap breach permitted at step {index}: {bots}/{humans}");
            }

            if allowed {
                assert!(
                    bots == 0 || bots * frequency < humans,
                    "permitted at or above the cap at step {index}: {bots}/{humans}"
                );
                window.append(Message::bot("reply", now));
                state.note_bot_message(now);
                permitted_turns += 1;
            }
        }

        assert!(permitted_turns > 0, "the stream should have produced some permitted turns");
    }
}
