//! Live adapters that call real provider APIs.

pub mod openai;
