//! # saga-memory: Memory Layers for SAGA
//!
//! The seven layers a chapter writer reads from and commits into, built on
//! the stores in `saga-core` and the racing engine in `saga-llm`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    MemoryContext                     │
//! │  ┌──────────┐ ┌───────────┐ ┌──────────┐ ┌────────┐  │
//! │  │ Episodic │ │ Character │ │ Timeline │ │ World  │  │
//! │  └────┬─────┘ └─────┬─────┘ └────┬─────┘ └───┬────┘  │
//! │       │   ┌──────┐  │ ┌───────┐  │ ┌────────┐│       │
//! │       │   │ Plot │  │ │ Theme │  │ │Semantic││       │
//! │       │   └──┬───┘  │ └───────┘  │ └───┬────┘│       │
//! │       ▼      ▼      ▼            ▼     ▼     ▼       │
//! │   RelationalStore  RacingEngine   VectorStore        │
//! │                         ▲              ▲             │
//! │                    EntityResolver ── Embedder        │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `layer`: the [`MemoryLayer`] trait and chapter-keyed snapshot streams
//! - `layers`: the seven layer implementations
//! - `reconcile`: merging a generated character state into the previous one
//! - `resolution`: mapping name mentions to canonical characters
//! - `context`: wiring everything over shared handles

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod context;
pub mod error;
pub mod layer;
pub mod layers;
pub mod reconcile;
pub mod resolution;

#[cfg(test)]
mod testing;

pub use context::{ContextParts, MemoryContext};
pub use error::{MemoryError, Result};
pub use layer::{MemoryLayer, SnapshotStream};
pub use reconcile::reconcile;
pub use resolution::EntityResolver;
