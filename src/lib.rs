//! rscombo: combo composition engine for merchant category trees.
//!
//! Reconstructs a category tree from a flat remote source, classifies
//! its nodes into leaves, last-level parents, and orphan leaves,
//! maintains tri-state selection over the tree, and compiles selection
//! plus custom lines into a normalized combo document with per-size
//! variants.
//!
//! Layers: `domain` (pure logic) <- `application` (services over I/O
//! traits) <- `infrastructure` (file-backed boundaries, DI) <- `cli`.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
