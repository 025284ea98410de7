//! The seven memory layers.
//!
//! | Layer       | Fetch                                   | Update                          |
//! |-------------|-----------------------------------------|---------------------------------|
//! | Episodic    | window of preceding chapter texts       | no-op                           |
//! | Character   | snapshot, LLM genesis at chapter 0      | race + reconcile                |
//! | Timeline    | snapshot, LLM genesis at chapter 0      | race, story clock never rewinds |
//! | World state | snapshot, LLM genesis at chapter 0      | race, stored verbatim           |
//! | Plot        | snapshot, empty genesis at chapter 0    | race, stored verbatim           |
//! | Theme       | projection of the novel configuration   | no-op                           |
//! | Semantic    | fused top-k vector search               | chunk, embed, upsert            |

pub mod character;
pub mod episodic;
pub mod plot;
pub mod semantic;
pub mod theme;
pub mod timeline;
pub mod world;

pub use character::{CharacterLayer, CharacterUpdate};
pub use episodic::{EpisodicLayer, EpisodicQuery};
pub use plot::PlotLayer;
pub use semantic::{SemanticDocument, SemanticHit, SemanticKind, SemanticLayer, SemanticQuery};
pub use theme::{ThemeLayer, ThemeMemory};
pub use timeline::TimelineLayer;
pub use world::WorldStateLayer;
