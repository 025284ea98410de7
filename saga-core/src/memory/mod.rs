//! Narrative memory value types.
//!
//! One module per snapshot-bearing layer. The shapes here are exactly what
//! gets persisted per `(layer, chapter)` and what the update agents are asked
//! to produce.

pub mod character;
pub mod plot;
pub mod timeline;
pub mod world;

pub use character::{Character, CharacterGroup, CharacterState};
pub use plot::PlotMemory;
pub use timeline::Timeline;
pub use world::World;
