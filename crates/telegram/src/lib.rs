//! Transport boundary for group-chat updates.
//!
//! The gate core never talks to a messaging platform directly. This crate
//! defines the update shape delivered by a transport, the `UpdateTransport`
//! trait a concrete platform client implements, and the polling runner that
//! pumps updates into a `GroupMessageService` and sends replies back out.

pub mod runner;
pub mod update;

pub use runner::{
    NoopUpdateTransport, PollingRunner, ReconnectPolicy, TransportError, UpdateTransport,
};
pub use update::{GroupMessageService, IncomingUpdate, NoopGroupMessageService};
