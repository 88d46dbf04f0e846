//! Composition session: the single logical writer over selection state.
//!
//! Owns the latest installed tree, the selection set, and the combo
//! draft. Tree installs follow last-request-wins: a build result whose
//! generation is older than the installed one is discarded, so the
//! selection is never validated against a superseded tree. Rehydration
//! from a persisted combo requires an installed tree first, because
//! category items expand against the current tree.

use tracing::{debug, instrument};

use crate::application::services::catalog::BuiltTree;
use crate::application::services::persistence::{rehydrate, EditState, PersistenceService};
use crate::application::ApplicationResult;
use crate::domain::{
    CategoryTree, Classification, Combo, ComboCompiler, ComboDraft, CompiledCombo, DomainError,
    NodeState, SelectionStore,
};

#[derive(Default)]
pub struct ComposeSession {
    installed: Option<BuiltTree>,
    selection: SelectionStore,
    draft: ComboDraft,
    compiler: ComboCompiler,
}

impl ComposeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a built tree, unless a newer build was already installed.
    ///
    /// Returns whether the tree was accepted. Stale selection ids are
    /// pruned on every accepted install.
    #[instrument(level = "debug", skip(self, built), fields(generation = built.generation))]
    pub fn install_tree(&mut self, built: BuiltTree) -> bool {
        if let Some(current) = &self.installed {
            if built.generation < current.generation {
                debug!(
                    installed = current.generation,
                    "discarding stale tree build"
                );
                return false;
            }
        }
        self.selection.prune(&built.tree);
        self.installed = Some(built);
        true
    }

    pub fn tree(&self) -> Option<&CategoryTree> {
        self.installed.as_ref().map(|b| &b.tree)
    }

    pub fn classification(&self) -> Option<&Classification> {
        self.installed.as_ref().map(|b| &b.classification)
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    pub fn draft(&self) -> &ComboDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut ComboDraft {
        &mut self.draft
    }

    pub fn toggle_leaf(&mut self, leaf_id: &str) {
        self.selection.toggle_leaf(leaf_id);
    }

    pub fn set_node(&mut self, node_id: &str, checked: bool) -> ApplicationResult<()> {
        let built = self
            .installed
            .as_ref()
            .ok_or(DomainError::NoTree)?;
        self.selection.set_node(&built.tree, node_id, checked);
        Ok(())
    }

    pub fn state_of(&self, node_id: &str) -> ApplicationResult<NodeState> {
        Ok(self.selection.state_of(self.require_tree()?, node_id))
    }

    /// Compile the current selection + draft into a submittable combo.
    pub fn compile(&self) -> ApplicationResult<CompiledCombo> {
        let built = self.require_built()?;
        let compiled = self.compiler.compile(
            &built.tree,
            &built.classification,
            &self.selection,
            &self.draft,
        )?;
        Ok(compiled)
    }

    /// Compile and submit in one step, returning the stored combo id.
    /// Local state is untouched either way, so a failed submission can
    /// simply be retried.
    pub fn compile_and_submit(
        &self,
        persistence: &PersistenceService,
    ) -> ApplicationResult<String> {
        let compiled = self.compile()?;
        persistence.submit(&compiled, self.draft.id.as_deref())
    }

    /// Replace session state with the edit state of a persisted combo.
    /// The current tree must already be installed.
    #[instrument(level = "debug", skip(self, combo))]
    pub fn load_for_edit(&mut self, id: &str, combo: &Combo) -> ApplicationResult<()> {
        let built = self.require_built()?;
        let EditState { selection, draft } = rehydrate(id, combo, &built.tree);
        self.selection = selection;
        self.draft = draft;
        Ok(())
    }

    fn require_built(&self) -> ApplicationResult<&BuiltTree> {
        self.installed
            .as_ref()
            .ok_or_else(|| DomainError::NoTree.into())
    }

    fn require_tree(&self) -> ApplicationResult<&CategoryTree> {
        Ok(&self.require_built()?.tree)
    }
}
