//! The `HistoryEngine` facade: owns the graph, the live `CanonicalState`,
//! the active transaction frame, and everything needed to turn a stream of
//! commands into a navigable commit DAG.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use core_command::commands::Composite;
use core_command::{BoxedCommand, Command, CommandMeta, Scope};
use core_model::CanonicalState;
use core_persist::{HistorySettings, RetentionSettings, StorageAdapter};

use crate::error::HistoryError;
use crate::graph::{Commit, Head, HistoryGraph, MAIN_BRANCH};
use crate::retention::{collect_garbage, RetentionPolicy};
use crate::transaction::TransactionStack;

pub type ThumbnailProvider = Box<dyn Fn() -> Option<Vec<u8>> + Send + Sync>;
pub type ErrorSink = Box<dyn Fn(&HistoryError) + Send + Sync>;

/// Monotonically increasing source of commit ids and a clock the engine
/// reads timestamps from. A thin seam so tests can supply a deterministic
/// clock; production wires it to wall time + a UUID generator.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
    fn new_id(&self) -> String;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn new_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Diagnostics counters surfaced for observability, incremented as commands
/// execute.
#[derive(Default)]
pub struct Telemetry {
    pub commits_created: AtomicU64,
    pub undos: AtomicU64,
    pub redos: AtomicU64,
    pub async_ops_started: AtomicU64,
    pub async_ops_completed: AtomicU64,
    pub gc_runs: AtomicU64,
    pub autosave_failures: AtomicU64,
}

pub struct HistoryEngine {
    pub(crate) state: CanonicalState,
    pub(crate) baseline_state: CanonicalState,
    pub(crate) graph: HistoryGraph,
    pub(crate) transactions: TransactionStack,
    pub(crate) settings: HistorySettings,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) thumbnail_provider: Option<ThumbnailProvider>,
    pub(crate) on_error: Option<ErrorSink>,
    pub(crate) storage: Arc<dyn StorageAdapter>,
    /// Serializes the long-running async operations so export/import/save/
    /// load never race each other over the same storage key.
    pub(crate) io_queue: tokio::sync::Mutex<()>,
    pub telemetry: Telemetry,
}

impl HistoryEngine {
    pub fn new(initial_state: CanonicalState, storage: Arc<dyn StorageAdapter>) -> Self {
        Self::with_clock(initial_state, storage, Box::new(SystemClock))
    }

    pub fn with_clock(
        initial_state: CanonicalState,
        storage: Arc<dyn StorageAdapter>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let root_id = clock.new_id();
        let now = clock.now_ms();
        Self {
            baseline_state: initial_state.clone(),
            state: initial_state,
            graph: HistoryGraph::new_with_root(root_id, now),
            transactions: TransactionStack::new(),
            settings: HistorySettings::default(),
            clock,
            thumbnail_provider: None,
            on_error: None,
            storage,
            io_queue: tokio::sync::Mutex::new(()),
            telemetry: Telemetry::default(),
        }
    }

    pub fn state(&self) -> &CanonicalState {
        &self.state
    }

    pub fn head(&self) -> &Head {
        &self.graph.head
    }

    pub fn get_graph(&self) -> &HistoryGraph {
        &self.graph
    }

    pub fn list_branches(&self) -> Vec<(&str, &str)> {
        self.graph
            .branches
            .iter()
            .map(|(name, id)| (name.as_str(), id.as_str()))
            .collect()
    }

    pub fn set_thumbnail_provider(&mut self, provider: Option<ThumbnailProvider>) {
        self.thumbnail_provider = provider;
    }

    pub fn set_on_error(&mut self, sink: Option<ErrorSink>) {
        self.on_error = sink;
    }

    pub fn set_retention(&mut self, retention: RetentionSettings) {
        self.settings.retention = retention;
    }

    pub fn set_auto_create_branch_on_detached(&mut self, enabled: bool) {
        self.settings.auto_create_branch_on_detached = enabled;
    }

    fn report(&self, error: HistoryError) -> HistoryError {
        if let Some(sink) = &self.on_error {
            sink(&error);
        }
        error
    }

    /// Applies `cmd` immediately when no transaction is open, otherwise
    /// delegates to the transaction stack (which may itself execute
    /// immediately if the stack is empty — kept symmetric with `push` for
    /// callers that always go through one entry point).
    pub fn execute(&mut self, cmd: BoxedCommand) -> Result<(), HistoryError> {
        if self.transactions.is_open() {
            self.push(cmd);
            return Ok(());
        }
        self.commit_single(cmd)
    }

    fn commit_single(&mut self, cmd: BoxedCommand) -> Result<(), HistoryError> {
        if cmd.meta().non_undoable {
            self.state = cmd.apply(&self.state).map_err(HistoryError::from)?;
            return Ok(());
        }
        let prev = self.state.clone();
        let next = cmd.apply(&prev).map_err(|e| self.report(e.into()))?;
        self.state = next;
        self.record_commit(vec![cmd], prev.clone())?;
        Ok(())
    }

    pub fn begin_transaction(&mut self, name: impl Into<String>) {
        self.transactions.begin(name);
    }

    /// Accumulates within the top frame, or executes immediately if no
    /// transaction is open.
    pub fn push(&mut self, cmd: BoxedCommand) {
        if !self.transactions.is_open() {
            let _ = self.commit_single(cmd).map_err(|e| self.report(e));
            return;
        }
        let now = self.clock.now_ms();
        self.transactions.push(cmd, now, self.settings.coalesce_window_ms);
    }

    /// Closes the current transaction frame. Returns the new commit id when
    /// the outermost frame closed and recorded one.
    pub fn end_transaction(&mut self, commit: bool) -> Result<Option<String>, HistoryError> {
        let Some(commands) = self.transactions.end(commit) else {
            return Ok(None);
        };
        let prev = self.state.clone();
        let mut current = prev.clone();
        for cmd in &commands {
            current = cmd.apply(&current).map_err(|e| self.report(e.into()))?;
        }
        self.state = current;
        let id = self.record_commit(commands, prev)?;
        if self.settings.autosave_on_transaction_end {
            self.best_effort_autosave();
        }
        Ok(Some(id))
    }

    pub fn cancel_transaction(&mut self) {
        self.transactions.cancel();
    }

    fn best_effort_autosave(&self) {
        let envelope = self.export_document();
        if let Err(e) = core_persist::save_document(self.storage.as_ref(), &self.settings.storage_key, &envelope) {
            self.telemetry.autosave_failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(target: "persist", error = %e, "autosave failed");
        }
    }

    /// Inserts a commit wrapping `commands` parented to the current HEAD,
    /// advances branch/head, handles the detached-head auto-branch rule.
    fn record_commit(&mut self, commands: Vec<BoxedCommand>, _prev: CanonicalState) -> Result<String, HistoryError> {
        let parent = self.graph.head.at().to_string();
        let label = commands
            .first()
            .map(|c| c.meta().label.clone())
            .unwrap_or_else(|| "Edit".to_string());
        let byte_size = commands.iter().map(|c| c.estimate_size()).sum();
        let thumbnail = self.thumbnail_provider.as_ref().and_then(|p| p());
        let id = self.clock.new_id();
        let commit = Commit {
            id: id.clone(),
            parent_ids: vec![parent],
            label,
            timestamp_ms: self.clock.now_ms(),
            thumbnail,
            commands,
            byte_size,
        };
        self.graph.insert_commit(commit);
        self.advance_head_to(id.clone())?;
        self.telemetry.commits_created.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }

    pub(crate) fn advance_head_to(&mut self, new_id: String) -> Result<(), HistoryError> {
        match &self.graph.head {
            Head::Branch { name, .. } => {
                let name = name.clone();
                self.graph.branches.insert(name.clone(), new_id.clone());
                self.graph.head = Head::Branch { name, at: new_id };
                Ok(())
            }
            Head::Detached { .. } => {
                if self.settings.auto_create_branch_on_detached {
                    let name = self.unique_auto_branch_name();
                    self.graph.branches.insert(name.clone(), new_id.clone());
                    self.graph.head = Head::Branch { name, at: new_id };
                    Ok(())
                } else {
                    Err(self.report(HistoryError::DetachedHeadNoBranch))
                }
            }
        }
    }

    fn unique_auto_branch_name(&self) -> String {
        let base = format!("detached-{}", self.clock.now_ms());
        if !self.graph.branches.contains_key(&base) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}-{n}");
            if !self.graph.branches.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Undoes one step along the current branch.
    pub fn undo(&mut self) -> Result<(), HistoryError> {
        let at = self.graph.head.at().to_string();
        let commit = self
            .graph
            .commits
            .get(&at)
            .ok_or_else(|| HistoryError::UnknownCommit(at.clone()))?;
        let Some(parent) = commit.parent_ids.first().cloned() else {
            return Err(self.report(HistoryError::NothingToUndo));
        };
        let prev = self.state_at(&parent)?;
        let composite = Composite {
            meta: CommandMeta::new("Undo", Scope::Global, self.clock.now_ms()),
            children: commit.commands.iter().map(|c| c.clone_box()).collect(),
        };
        let current = composite.apply(&prev).map_err(|e| self.report(e.into()))?;
        let inverse = composite.invert(&prev, &current);
        self.state = inverse.apply(&current).map_err(|e| self.report(e.into()))?;
        self.move_head_to(parent);
        self.telemetry.undos.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Redoes one step along the current branch; refused with
    /// `AmbiguousRedo` at a branch point.
    pub fn redo(&mut self) -> Result<(), HistoryError> {
        let at = self.graph.head.at().to_string();
        let children = self.graph.children_of(&at).to_vec();
        match children.len() {
            0 => Err(self.report(HistoryError::NothingToRedo)),
            1 => {
                let child_id = children[0].clone();
                let commit = self
                    .graph
                    .commits
                    .get(&child_id)
                    .ok_or_else(|| HistoryError::UnknownCommit(child_id.clone()))?
                    .clone();
                let mut current = self.state.clone();
                for cmd in &commit.commands {
                    current = cmd.apply(&current).map_err(|e| self.report(e.into()))?;
                }
                self.state = current;
                self.move_head_to(child_id);
                self.telemetry.redos.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            n => Err(self.report(HistoryError::AmbiguousRedo(n))),
        }
    }

    fn move_head_to(&mut self, id: String) {
        self.graph.head = match &self.graph.head {
            Head::Branch { name, .. } => Head::Branch { name: name.clone(), at: id },
            Head::Detached { .. } => Head::Detached { at: id },
        };
        if let Head::Branch { name, at } = &self.graph.head {
            self.graph.branches.insert(name.clone(), at.clone());
        }
    }

    /// Replays from the graph root to `id` to reconstruct the state at that
    /// commit. Used by undo (to recompute `prev`) and checkout.
    pub(crate) fn state_at(&self, id: &str) -> Result<CanonicalState, HistoryError> {
        let mut chain = Vec::new();
        let mut cursor = id.to_string();
        while let Some(commit) = self.graph.commits.get(&cursor) {
            chain.push(cursor.clone());
            match commit.parent_ids.first() {
                Some(p) => cursor = p.clone(),
                None => break,
            }
        }
        chain.reverse();
        let mut state = self.baseline_state.clone();
        for commit_id in chain {
            let commit = self
                .graph
                .commits
                .get(&commit_id)
                .ok_or_else(|| HistoryError::UnknownCommit(commit_id.clone()))?;
            for cmd in &commit.commands {
                state = cmd.apply(&state).map_err(HistoryError::from)?;
            }
        }
        Ok(state)
    }

    /// Checks out `target`: applies the `{undo, redo}` delta between HEAD
    /// and the target.
    pub fn checkout_commit(&mut self, target: &str) -> Result<(), HistoryError> {
        let from = self.graph.head.at().to_string();
        let delta = self
            .graph
            .delta(&from, target)
            .ok_or_else(|| HistoryError::UnknownCommit(target.to_string()))?;
        let mut current = self.state.clone();
        for commit_id in &delta.undo {
            let prev_id = self
                .graph
                .commits
                .get(commit_id)
                .and_then(|c| c.parent_ids.first())
                .cloned()
                .ok_or_else(|| HistoryError::UnknownCommit(commit_id.clone()))?;
            let prev = self.state_at(&prev_id)?;
            let commit = self.graph.commits.get(commit_id).unwrap().clone();
            let composite = Composite {
                meta: CommandMeta::new("Checkout Undo", Scope::Global, self.clock.now_ms()),
                children: commit.commands.iter().map(|c| c.clone_box()).collect(),
            };
            let forward = composite.apply(&prev).map_err(|e| self.report(e.into()))?;
            let inverse = composite.invert(&prev, &forward);
            current = inverse.apply(&current).map_err(|e| self.report(e.into()))?;
        }
        for commit_id in &delta.redo {
            let commit = self.graph.commits.get(commit_id).unwrap().clone();
            for cmd in &commit.commands {
                current = cmd.apply(&current).map_err(|e| self.report(e.into()))?;
            }
        }
        self.state = current;
        self.graph.head = Head::Detached { at: target.to_string() };
        if let Some((name, _)) = self
            .graph
            .branches
            .iter()
            .find(|(_, tip)| tip.as_str() == target)
        {
            self.graph.head = Head::Branch { name: name.clone(), at: target.to_string() };
        }
        Ok(())
    }

    pub fn checkout_branch(&mut self, name: &str) -> Result<(), HistoryError> {
        let tip = self
            .graph
            .branches
            .get(name)
            .ok_or_else(|| HistoryError::UnknownBranch(name.to_string()))?
            .clone();
        self.checkout_commit(&tip)
    }

    pub fn create_branch(&mut self, name: &str, at: Option<&str>) -> Result<(), HistoryError> {
        if self.graph.branches.contains_key(name) {
            return Err(HistoryError::DuplicateBranch(name.to_string()));
        }
        let target = at.map(str::to_string).unwrap_or_else(|| self.graph.head.at().to_string());
        if !self.graph.commits.contains_key(&target) {
            return Err(HistoryError::UnknownCommit(target));
        }
        self.graph.branches.insert(name.to_string(), target);
        Ok(())
    }

    pub fn rename_branch(&mut self, old: &str, new: &str) -> Result<(), HistoryError> {
        self.guard_branch_mutation(old)?;
        let tip = self
            .graph
            .branches
            .remove(old)
            .ok_or_else(|| HistoryError::UnknownBranch(old.to_string()))?;
        self.graph.branches.insert(new.to_string(), tip.clone());
        if self.graph.head.branch_name() == Some(old) {
            self.graph.head = Head::Branch { name: new.to_string(), at: tip };
        }
        Ok(())
    }

    pub fn delete_branch(&mut self, name: &str) -> Result<(), HistoryError> {
        self.guard_branch_mutation(name)?;
        self.graph.branches.remove(name);
        Ok(())
    }

    fn guard_branch_mutation(&self, name: &str) -> Result<(), HistoryError> {
        if !self.graph.branches.contains_key(name) {
            return Err(HistoryError::UnknownBranch(name.to_string()));
        }
        if self.graph.protected.branches.contains(name) || name == MAIN_BRANCH {
            return Err(HistoryError::ProtectedBranch(name.to_string()));
        }
        if self.graph.head.branch_name() == Some(name) {
            return Err(HistoryError::CurrentBranch(name.to_string()));
        }
        Ok(())
    }

    /// Marks HEAD as a named, GC-protected commit. The name is recorded as
    /// the commit's label; protection itself lives entirely in
    /// `graph.protected.commits`.
    pub fn add_checkpoint(&mut self, name: &str) -> String {
        let at = self.graph.head.at().to_string();
        self.graph.protected.commits.insert(at.clone());
        if let Some(commit) = self.graph.commits.get_mut(&at) {
            commit.label = name.to_string();
        }
        at
    }

    pub fn jump_to_checkpoint(&mut self, id: &str) -> Result<(), HistoryError> {
        self.checkout_commit(id)
    }

    pub fn label(&mut self, id: &str, text: &str) -> Result<(), HistoryError> {
        let commit = self
            .graph
            .commits
            .get_mut(id)
            .ok_or_else(|| HistoryError::UnknownCommit(id.to_string()))?;
        commit.label = text.to_string();
        Ok(())
    }

    /// Runs retention/garbage collection per the configured policy.
    pub fn gc(&mut self) {
        let policy = RetentionPolicy {
            max_bytes: self.settings.max_bytes,
            keep_unreachable_count: self.settings.retention.keep_unreachable_count,
            keep_unreachable_days: self.settings.retention.keep_unreachable_days,
        };
        let now = self.clock.now_ms();
        collect_garbage(&mut self.graph, &policy, now, &mut self.baseline_state, |state, commit| {
            let mut current = state.clone();
            for cmd in &commit.commands {
                if let Ok(next) = cmd.apply(&current) {
                    current = next;
                }
            }
            current
        });
        self.telemetry.gc_runs.fetch_add(1, Ordering::Relaxed);
    }
}
