//! Activity logging: append-only JSONL record of every action outcome.

pub mod jsonl;
