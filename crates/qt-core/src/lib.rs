//! Persistent memory for the four-agent project tracker.
//!
//! A single JSON document holds projects, tasks, reviews, summaries,
//! conversations, system insights and per-role counters. [`store::Memory`]
//! owns that document and rewrites it through a [`store::MemoryBackend`]
//! after every mutation. The operations are split by concern:
//!
//! - [`tasks`]: the task store (`pending -> completed -> reviewed`)
//! - [`projects`]: the project ledger plus summaries, insights and conversations
//! - [`stats`]: read-only aggregate statistics

pub mod config;
pub mod lockfile;
pub mod projects;
pub mod stats;
pub mod store;
pub mod tasks;
pub mod types;

pub use projects::{ProjectData, ProjectHandle};
pub use stats::SystemStats;
pub use store::{InMemoryBackend, JsonFileBackend, Memory, MemoryBackend, StoreError};
