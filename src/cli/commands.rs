//! Command dispatch

use std::fs;
use std::io;
use std::sync::Arc;

use clap::CommandFactory;
use clap_complete::generate;
use generational_arena::Index;
use tracing::instrument;

use crate::application::services::{ComposeSession, PersistenceService};
use crate::cli::args::{Cli, Commands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::cli::session_file::SessionFile;
use crate::config::Settings;
use crate::domain::CategoryTree;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::FileComboStore;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: Cli) -> CliResult<()> {
    let mut settings = Settings::load()?;
    if let Some(catalog) = &cli.catalog {
        settings.catalog_path = catalog.clone();
    }
    if let Some(store) = &cli.store {
        settings.store_dir = store.clone();
    }

    match cli.command {
        Some(Commands::Tree { root }) => tree(settings, &root),
        Some(Commands::Classify { root }) => classify(settings, &root),
        Some(Commands::Compile { session, dry_run }) => compile(settings, &session, dry_run),
        Some(Commands::Show { id }) => show(settings, &id),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Ok(()),
    }
}

#[instrument(skip(settings))]
fn tree(settings: Settings, root: &str) -> CliResult<()> {
    let container = ServiceContainer::new(settings)?;
    let built = container.catalog.build_tree(root)?;
    if let Some(root_idx) = built.tree.root() {
        output::info(&render_tree(&built.tree, root_idx));
    }
    Ok(())
}

#[instrument(skip(settings))]
fn classify(settings: Settings, root: &str) -> CliResult<()> {
    let container = ServiceContainer::new(settings)?;
    let built = container.catalog.build_tree(root)?;
    let c = &built.classification;

    output::header("Leaves");
    for id in &c.leaves {
        output::detail(&format!("{} — {}", id, built.tree.name_of(id).unwrap_or(id)));
    }
    output::header("Last-level parents");
    for id in &c.last_level_parents {
        output::detail(&format!("{} — {}", id, built.tree.name_of(id).unwrap_or(id)));
    }
    output::header("Orphan leaves by branch");
    for (branch, ids) in &c.orphans_by_branch {
        output::detail(&format!("{}: {}", branch, ids.join(", ")));
    }
    Ok(())
}

#[instrument(skip(settings))]
fn compile(settings: Settings, session_path: &std::path::Path, dry_run: bool) -> CliResult<()> {
    let content = fs::read_to_string(session_path)
        .map_err(|e| InfraError::io(format!("read {}", session_path.display()), e))?;
    let parsed = SessionFile::parse(session_path, &content)?;
    let (root, selected, draft) = parsed.into_draft()?;

    let container = ServiceContainer::new(settings)?;
    let built = container.catalog.build_tree(&root)?;

    let mut session = ComposeSession::new();
    session.install_tree(built);
    for id in &selected {
        let is_leaf = session
            .tree()
            .and_then(|t| t.find(id).and_then(|idx| t.get_node(idx)))
            .map(|n| n.is_leaf())
            .unwrap_or(false);
        if is_leaf {
            session.toggle_leaf(id);
        } else {
            output::warning(&format!("not a leaf of the current tree, ignoring: {id}"));
        }
    }
    *session.draft_mut() = draft;

    if dry_run {
        let compiled = session.compile()?;
        let json = serde_json::to_string_pretty(&compiled.combo)
            .map_err(|e| CliError::Session(e.to_string()))?;
        output::info(&json);
        return Ok(());
    }

    let id = session.compile_and_submit(&container.persistence)?;
    output::success(&format!("combo stored: {id}"));
    Ok(())
}

#[instrument(skip(settings))]
fn show(settings: Settings, id: &str) -> CliResult<()> {
    let persistence = PersistenceService::new(Arc::new(FileComboStore::new(settings.store_dir)));
    let combo = persistence.load(id)?;
    let json =
        serde_json::to_string_pretty(&combo).map_err(|e| CliError::Session(e.to_string()))?;
    output::info(&json);
    Ok(())
}

/// Render a subtree for terminal display.
fn render_tree(tree: &CategoryTree, idx: Index) -> termtree::Tree<String> {
    let label = tree
        .get_node(idx)
        .map(|n| n.data.to_string())
        .unwrap_or_default();
    let mut rendered = termtree::Tree::new(label);
    if let Some(node) = tree.get_node(idx) {
        for &child in &node.children {
            rendered.push(render_tree(tree, child));
        }
    }
    rendered
}
