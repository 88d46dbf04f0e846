//! Application services

pub mod catalog;
pub mod persistence;
pub mod session;

pub use catalog::{BuiltTree, CatalogService};
pub use persistence::{
    parse_variant_key, rehydrate, variant_key, AttachmentPart, EditState, PersistenceService,
    SubmitPayload,
};
pub use session::ComposeSession;
