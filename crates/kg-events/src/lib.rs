//! kg-events — C7 Event Stream: append-only log with cursor-based tailing
//! and long-poll, grounded on §4.7.

mod row;
mod stream;

pub use stream::GraphEventStream;
