//! Record/replay of provider interactions for deterministic tests.

pub mod format;
pub mod recorder;
pub mod replayer;
