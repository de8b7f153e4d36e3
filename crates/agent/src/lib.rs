//! Engagement gate - the decision core of banter
//!
//! This crate decides, per incoming group-chat message, whether the bot
//! should speak and what it should say:
//! 1. **Context buffering** (`context`) - bounded per-chat window of recent
//!    human and bot messages
//! 2. **Rate limiting** (`policy`) - cooldown and participation-ratio rules
//!    that keep the bot from dominating a conversation
//! 3. **Classification** (`classifier`, `remote`, `fallback`) - remote
//!    LLM-backed topic/sentiment/response decision with an offline
//!    rule-based fallback that fails closed
//! 4. **Orchestration** (`gate`) - the turn state machine that combines the
//!    above and records every turn into the history sink
//!
//! # Failure Principle
//!
//! Nothing in this crate surfaces an error into the chat. Remote
//! classification failures collapse into the fallback, sink failures are
//! logged and dropped, and every turn leaves per-chat state usable for the
//! next message. The end user only ever sees a reply or silence.

pub mod classifier;
pub mod context;
pub mod fallback;
pub mod gate;
pub mod policy;
pub mod remote;
pub mod sink;
