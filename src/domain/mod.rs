//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no
//! config loading). Trees, classification, selection, and compilation
//! are all pure over in-memory state.

pub mod arena;
pub mod classify;
pub mod combo;
pub mod compiler;
pub mod error;
pub mod selection;

pub use arena::{CategoryData, CategoryTree, TreeNode};
pub use classify::{classify, Classification, OTHER_BRANCH};
pub use combo::{
    Combo, ComboDraft, ComboItem, ComboType, CustomEntry, ImageRef, ItemKey, Sizing, Variant,
    VariantOverride,
};
pub use compiler::{ComboCompiler, CompiledCombo};
pub use error::{DomainError, DomainResult};
pub use selection::{NodeState, SelectionStore};
