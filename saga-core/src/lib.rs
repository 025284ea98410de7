//! # SAGA Core Library
//!
//! Storage-facing foundation of the SAGA layered narrative memory.
//!
//! A serialized novel is written one chapter at a time. After every chapter
//! each memory layer records a snapshot of what the story now knows:
//!
//! - **Character**: "Who is in the story" ([`memory::CharacterState`])
//! - **Timeline**: "When things happened" ([`memory::Timeline`])
//! - **World**: "What the world is like" ([`memory::World`])
//! - **Plot**: "What is still unresolved" ([`memory::PlotMemory`])
//!
//! This crate holds those types together with the stores they live in
//! ([`persistence::RelationalStore`], [`vector::VectorStore`]), the embedding
//! abstraction and chunker, configuration, and tracing setup. It performs no
//! network I/O; completion and HTTP embedding clients live in `saga-llm`.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod novel;
pub mod persistence;
pub mod retry;
pub mod telemetry;
pub mod types;
pub mod vector;

pub use config::SagaConfig;
pub use error::{Result, SagaError};
pub use novel::NovelConfig;
pub use types::*;
