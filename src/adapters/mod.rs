//! Adapter implementations for port traits.
//!
//! - `live/` - Real API implementations
//! - `recording/` - Record interactions to cassettes
//! - `replaying/` - Replay interactions from cassettes

#[cfg(test)]
pub mod fake;
pub mod live;
pub mod recording;
pub mod replaying;
