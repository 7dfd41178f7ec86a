//! The staged greeting state machine.
//!
//! Pure decision logic: the engine receives one inbound text plus the user's
//! stored record and returns what to say and what to persist. It performs no
//! I/O; persistence and sending belong to the handlers, which keeps every
//! transition unit-testable with plain values.

use crate::config::GREETING_WINDOW_MS;
use crate::greeting::record::{GreetingRecord, Stage};
use crate::greeting::replies::ReplySet;
use lazy_regex::regex;

/// The exact phrase (case-insensitive, after stripping a leading mention)
/// that asks the bot for its day story.
const DAY_STORY_PHRASE: &str = "tell me about your day";

/// Fixed prefix prepended to every day story narrative.
const DAY_STORY_PREFIX: &str = "You want to hear about my day? ";

/// Outcome of handling one message.
///
/// `reply` is the raw pool text; fresh-pool entries may carry the `{user}`
/// token that the handlers substitute before sending. `update` of `None`
/// means the stored record must not be touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Text to send back, if any.
    pub reply: Option<String>,
    /// Record to persist, if the stored state should change.
    pub update: Option<GreetingRecord>,
}

impl Decision {
    /// No reply, no state change.
    const fn silent() -> Self {
        Self {
            reply: None,
            update: None,
        }
    }
}

/// Decides how to answer greetings and day-story requests.
pub struct GreetingEngine {
    replies: ReplySet,
}

impl GreetingEngine {
    /// Creates an engine backed by the given reply pools.
    #[must_use]
    pub const fn new(replies: ReplySet) -> Self {
        Self { replies }
    }

    /// Handles one inbound text message for `user_id`.
    ///
    /// `record` is the stored state, absent for users the bot has never
    /// greeted. `now_ms` is injected by the caller so the decision is a pure
    /// function of its inputs.
    pub fn handle(
        &self,
        user_id: i64,
        text: &str,
        mentions_bot: bool,
        now_ms: i64,
        record: Option<&GreetingRecord>,
    ) -> Decision {
        if is_greeting(text) {
            return self.advance(user_id, mentions_bot, now_ms, record);
        }
        if mentions_bot && is_day_story_request(text) {
            return Decision {
                reply: Some(self.tell_day_story()),
                update: None,
            };
        }
        Decision::silent()
    }

    /// Runs the stage machine for a greeting-classified message.
    fn advance(
        &self,
        user_id: i64,
        mentions_bot: bool,
        now_ms: i64,
        record: Option<&GreetingRecord>,
    ) -> Decision {
        // An elapsed window resets to Fresh from any stage; the guard runs
        // before the stage switch so no stage can shadow it.
        let open = record.filter(|r| now_ms - r.last_greeted_at < GREETING_WINDOW_MS);
        let Some(current) = open else {
            return Decision {
                reply: Some(self.replies.fresh.next().to_owned()),
                update: Some(GreetingRecord {
                    user_id,
                    last_greeted_at: now_ms,
                    stage: Stage::Fresh,
                }),
            };
        };

        match current.stage {
            Stage::Fresh if mentions_bot => Decision {
                reply: Some(self.replies.affirmation.random().to_owned()),
                update: Some(current.with_stage(Stage::Affirmed)),
            },
            // Without a direct mention the user may retry later.
            Stage::Fresh => Decision::silent(),
            Stage::Affirmed => Decision {
                reply: Some(self.replies.repeat.next().to_owned()),
                update: Some(current.with_stage(Stage::Exhausted)),
            },
            Stage::Exhausted => Decision::silent(),
        }
    }

    /// Composes the two-sentence day narrative. Stateless per call.
    fn tell_day_story(&self) -> String {
        format!(
            "{DAY_STORY_PREFIX}{} {}",
            self.replies.day_opener.random(),
            self.replies.day_closer.random()
        )
    }
}

/// A message is a greeting when it starts with "gm" (case-insensitive,
/// leading whitespace ignored). Prefix match, so "gm everyone" and even
/// "gmorning" qualify.
fn is_greeting(text: &str) -> bool {
    text.trim_start().to_lowercase().starts_with("gm")
}

/// True when the text, minus a leading `@mention` token, is exactly the day
/// story phrase.
fn is_day_story_request(text: &str) -> bool {
    let stripped = regex!(r"^@\S+").replace(text.trim(), "");
    stripped.trim().eq_ignore_ascii_case(DAY_STORY_PHRASE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::greeting::pool::ResponsePool;

    fn pool(name: &'static str, entries: &[&str]) -> ResponsePool {
        ResponsePool::new(name, entries.iter().map(|s| (*s).to_string()).collect())
            .expect("valid test pool")
    }

    fn engine() -> GreetingEngine {
        GreetingEngine::new(ReplySet::new(
            pool("fresh", &["GM {user}!"]),
            pool("repeat", &["Back again?"]),
            pool("affirmation", &["Always a pleasure!"]),
            pool("day_opener", &["Sold three crates."]),
            pool("day_closer", &["Quiet otherwise."]),
        ))
    }

    const HOUR_MS: i64 = 3_600_000;

    #[test]
    fn test_first_greeting_opens_a_window() {
        let decision = engine().handle(7, "gm", false, 1000, None);
        assert_eq!(decision.reply.as_deref(), Some("GM {user}!"));
        assert_eq!(
            decision.update,
            Some(GreetingRecord {
                user_id: 7,
                last_greeted_at: 1000,
                stage: Stage::Fresh,
            })
        );
    }

    #[test]
    fn test_greeting_is_a_case_insensitive_prefix() {
        let engine = engine();
        assert!(engine.handle(7, "  GM everyone", false, 0, None).reply.is_some());
        assert!(engine.handle(7, "Gmorning folks", false, 0, None).reply.is_some());
        assert!(engine.handle(7, "good morning", false, 0, None).reply.is_none());
        assert!(engine.handle(7, "hello gm", false, 0, None).reply.is_none());
    }

    #[test]
    fn test_repeat_without_mention_is_silent() {
        let record = GreetingRecord {
            user_id: 7,
            last_greeted_at: 1000,
            stage: Stage::Fresh,
        };
        let decision = engine().handle(7, "gm", false, 1000 + HOUR_MS, Some(&record));
        assert_eq!(decision, Decision::silent());
    }

    #[test]
    fn test_mention_affirms_a_fresh_greeting() {
        let record = GreetingRecord {
            user_id: 7,
            last_greeted_at: 1000,
            stage: Stage::Fresh,
        };
        let decision = engine().handle(7, "gm @fruitbot", true, 1000 + HOUR_MS, Some(&record));
        assert_eq!(decision.reply.as_deref(), Some("Always a pleasure!"));
        let update = decision.update.expect("affirmation advances the stage");
        assert_eq!(update.stage, Stage::Affirmed);
        // The window stays anchored to the greeting that opened it.
        assert_eq!(update.last_greeted_at, 1000);
    }

    #[test]
    fn test_affirmed_greeting_draws_a_repeat_reply() {
        let record = GreetingRecord {
            user_id: 7,
            last_greeted_at: 1000,
            stage: Stage::Affirmed,
        };
        let decision = engine().handle(7, "gm", false, 1000 + 2 * HOUR_MS, Some(&record));
        assert_eq!(decision.reply.as_deref(), Some("Back again?"));
        assert_eq!(
            decision.update.map(|u| u.stage),
            Some(Stage::Exhausted)
        );
    }

    #[test]
    fn test_exhausted_stage_is_terminal_within_the_window() {
        let record = GreetingRecord {
            user_id: 7,
            last_greeted_at: 1000,
            stage: Stage::Exhausted,
        };
        let engine = engine();
        for mentions in [false, true] {
            let decision = engine.handle(7, "gm", mentions, 1000 + 3 * HOUR_MS, Some(&record));
            assert_eq!(decision, Decision::silent());
        }
    }

    #[test]
    fn test_exactly_24h_counts_as_a_new_window() {
        let engine = engine();
        for stage in [Stage::Fresh, Stage::Affirmed, Stage::Exhausted] {
            let record = GreetingRecord {
                user_id: 7,
                last_greeted_at: 1000,
                stage,
            };
            let now = 1000 + GREETING_WINDOW_MS;
            let decision = engine.handle(7, "gm", false, now, Some(&record));
            assert_eq!(decision.reply.as_deref(), Some("GM {user}!"));
            assert_eq!(
                decision.update,
                Some(GreetingRecord {
                    user_id: 7,
                    last_greeted_at: now,
                    stage: Stage::Fresh,
                })
            );
        }
    }

    #[test]
    fn test_fresh_pool_cycles_round_robin() {
        let engine = GreetingEngine::new(ReplySet::new(
            pool("fresh", &["first", "second"]),
            pool("repeat", &["r"]),
            pool("affirmation", &["a"]),
            pool("day_opener", &["o"]),
            pool("day_closer", &["c"]),
        ));
        // Three different users with no history share the cursor.
        let picks: Vec<_> = [1, 2, 3]
            .iter()
            .filter_map(|id| engine.handle(*id, "gm", false, 0, None).reply)
            .collect();
        assert_eq!(picks, ["first", "second", "first"]);
    }

    #[test]
    fn test_replaying_an_applied_decision_never_regresses() {
        let engine = engine();
        let now = 1000 + HOUR_MS;
        let record = GreetingRecord {
            user_id: 7,
            last_greeted_at: 1000,
            stage: Stage::Fresh,
        };

        let first = engine.handle(7, "gm @fruitbot", true, now, Some(&record));
        let applied = first.update.expect("stage advanced");
        let replay = engine.handle(7, "gm @fruitbot", true, now, Some(&applied));
        if let Some(update) = replay.update {
            assert!(update.stage >= applied.stage);
        }
    }

    #[test]
    fn test_day_story_requires_a_mention() {
        let engine = engine();
        let story = engine.handle(7, "@fruitbot tell me about your day", true, 0, None);
        assert_eq!(
            story.reply.as_deref(),
            Some("You want to hear about my day? Sold three crates. Quiet otherwise.")
        );
        assert_eq!(story.update, None);

        let unaddressed = engine.handle(7, "tell me about your day", false, 0, None);
        assert_eq!(unaddressed, Decision::silent());
    }

    #[test]
    fn test_day_story_phrase_must_match_exactly() {
        let engine = engine();
        assert!(engine
            .handle(7, "@fruitbot Tell Me About Your Day", true, 0, None)
            .reply
            .is_some());
        assert!(engine
            .handle(7, "@fruitbot tell me about your day please", true, 0, None)
            .reply
            .is_none());
        // A mention elsewhere still counts as long as the phrase is exact.
        assert!(engine
            .handle(7, "tell me about your day", true, 0, None)
            .reply
            .is_some());
    }

    #[test]
    fn test_greeting_takes_priority_over_day_story() {
        let engine = engine();
        let decision = engine.handle(7, "gm tell me about your day", true, 1000, None);
        assert_eq!(decision.reply.as_deref(), Some("GM {user}!"));
        assert!(decision.update.is_some());
    }

    #[test]
    fn test_bystander_chatter_is_ignored() {
        let engine = engine();
        assert_eq!(engine.handle(7, "anyone up?", false, 0, None), Decision::silent());
        assert_eq!(engine.handle(7, "", false, 0, None), Decision::silent());
        // A mention with neither intent stays silent too.
        assert_eq!(
            engine.handle(7, "@fruitbot how much are the plums", true, 0, None),
            Decision::silent()
        );
    }
}
