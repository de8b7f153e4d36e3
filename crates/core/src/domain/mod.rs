pub mod interaction;
pub mod message;

pub use interaction::{ChatInteraction, SentimentLabel};
pub use message::{Author, Message};
