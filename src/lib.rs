//! Semantic memory for a personal AI assistant — recall previously captured
//! text by meaning, persist it across restarts, and enforce per-owner
//! visibility.
//!
//! Mnemo owns two stores and keeps them consistent through disciplined
//! operation ordering rather than a shared transaction:
//!
//! - a **metadata record store** (SQLite) holding durable memory records —
//!   owner, content, tags, privacy level, timestamps, and a redundant copy of
//!   each embedding for crash recovery
//! - a **vector index** held in memory, searched brute-force, and persisted
//!   as a paired snapshot (index file + position-map file) after every
//!   mutation
//!
//! The [`memory::manager::MemoryManager`] orchestrates both: `add` embeds
//! outside the index lock, creates the record, inserts the vector, and
//! snapshots; `search` over-fetches candidates and filters them by
//! similarity, owner, privacy level, and group before returning at most `k`
//! hits. If the snapshot pair is missing or unreadable at startup, the index
//! is rebuilt from the embeddings stored in SQLite — no embedding provider
//! required.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite database initialization, schema, and pragmas
//! - [`embedding`] — The [`embedding::EmbeddingProvider`] trait and the built-in
//!   feature-hashing provider
//! - [`index`] — Slot-stable vector index, position map, and snapshot pair
//! - [`memory`] — Record types, metadata store, statistics, and the manager

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod index;
pub mod memory;
