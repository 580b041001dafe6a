//! Cherry-pick / revert / merge / squash: everything that replays or
//! recombines commits rather than simply walking the graph.

use std::collections::BTreeMap;
use std::sync::atomic::Ordering;

use core_command::commands::Composite;
use core_command::{BoxedCommand, Command, CommandMeta, Scope};
use core_model::LayerId;
use core_resolver::ResolveOutcome;

use crate::engine::HistoryEngine;
use crate::error::HistoryError;
use crate::graph::{Commit, Head};

impl HistoryEngine {
    fn layer_index_at(&self, commit_id: &str) -> Result<BTreeMap<LayerId, (&'static str, String)>, HistoryError> {
        let state = self.state_at(commit_id)?;
        Ok(state
            .layers
            .order
            .iter()
            .filter_map(|id| state.layers.get(id).map(|l| (id.clone(), (layer_kind(l), l.base().name.clone()))))
            .collect())
    }

    /// Replays `commit_id`'s commands, resolved against the current HEAD's
    /// layer ids, as a brand-new commit on top of HEAD.
    pub fn cherry_pick(&mut self, commit_id: &str) -> Result<String, HistoryError> {
        let commit = self
            .graph
            .commits
            .get(commit_id)
            .ok_or_else(|| HistoryError::UnknownCommit(commit_id.to_string()))?
            .clone();
        let parent = commit
            .parent_ids
            .first()
            .cloned()
            .unwrap_or_else(|| commit_id.to_string());
        let source_layers = self.layer_index_at(&parent)?;
        let serialized = commit.commands.iter().map(|c| c.serialize()).collect();
        let resolved = match core_resolver::resolve(&self.state, &source_layers, serialized) {
            ResolveOutcome::Resolved(cmds) => cmds,
            ResolveOutcome::Conflicts(conflicts) => return Err(HistoryError::Conflicts(conflicts)),
        };
        self.apply_and_commit(resolved, vec![self.graph.head.at().to_string()], format!("Cherry-pick: {}", commit.label))
    }

    /// Applies the inverse of `commit_id`'s net effect on top of HEAD.
    /// Unlike undo, this does not move HEAD backward: it creates a new
    /// forward commit, so it composes with further edits.
    pub fn revert(&mut self, commit_id: &str) -> Result<String, HistoryError> {
        let commit = self
            .graph
            .commits
            .get(commit_id)
            .ok_or_else(|| HistoryError::UnknownCommit(commit_id.to_string()))?
            .clone();
        let parent = commit
            .parent_ids
            .first()
            .cloned()
            .ok_or(HistoryError::NothingToUndo)?;
        let prev = self.state_at(&parent)?;
        let composite = Composite {
            meta: CommandMeta::new("Revert", Scope::Global, self.clock.now_ms()),
            children: commit.commands.iter().map(|c| c.clone_box()).collect(),
        };
        let forward = composite.apply(&prev).map_err(HistoryError::from)?;
        let inverse = composite.invert(&prev, &forward);
        self.apply_and_commit(vec![inverse], vec![self.graph.head.at().to_string()], format!("Revert: {}", commit.label))
    }

    /// Replays every commit between the merge base and `theirs_branch`'s tip
    /// on top of `ours_branch`'s tip, each resolved independently against the
    /// evolving destination state, landing as a single two-parent merge
    /// commit.
    pub fn merge(&mut self, ours_branch: &str, theirs_branch: &str, label: &str) -> Result<String, HistoryError> {
        let ours_tip = self
            .graph
            .branches
            .get(ours_branch)
            .ok_or_else(|| HistoryError::UnknownBranch(ours_branch.to_string()))?
            .clone();
        let theirs_tip = self
            .graph
            .branches
            .get(theirs_branch)
            .ok_or_else(|| HistoryError::UnknownBranch(theirs_branch.to_string()))?
            .clone();
        let delta = self
            .graph
            .delta(&ours_tip, &theirs_tip)
            .ok_or_else(|| HistoryError::UnknownCommit(theirs_tip.clone()))?;

        let mut working = self.state_at(&ours_tip)?;
        let mut all_resolved = Vec::new();
        for commit_id in &delta.redo {
            let commit = self.graph.commits.get(commit_id).unwrap().clone();
            let parent = commit.parent_ids.first().cloned().unwrap_or_else(|| commit_id.clone());
            let source_layers = self.layer_index_at(&parent)?;
            let serialized = commit.commands.iter().map(|c| c.serialize()).collect();
            let resolved = match core_resolver::resolve(&working, &source_layers, serialized) {
                ResolveOutcome::Resolved(cmds) => cmds,
                ResolveOutcome::Conflicts(conflicts) => return Err(HistoryError::Conflicts(conflicts)),
            };
            for cmd in &resolved {
                working = cmd.apply(&working).map_err(HistoryError::from)?;
            }
            all_resolved.extend(resolved);
        }
        if all_resolved.is_empty() {
            return Err(HistoryError::NothingToRedo);
        }
        self.apply_and_commit(all_resolved, vec![ours_tip, theirs_tip], label.to_string())
    }

    /// Collapses the contiguous first-parent range `[from, to]` into one
    /// commit carrying the concatenation of their commands. Refuses a range
    /// that is not a straight first-parent chain.
    pub fn squash(&mut self, from: &str, to: &str, label: &str) -> Result<String, HistoryError> {
        let mut chain = Vec::new();
        let mut cursor = to.to_string();
        loop {
            let commit = self
                .graph
                .commits
                .get(&cursor)
                .ok_or_else(|| HistoryError::UnknownCommit(cursor.clone()))?
                .clone();
            chain.push(commit);
            if cursor == from {
                break;
            }
            cursor = self
                .graph
                .commits
                .get(&cursor)
                .and_then(|c| c.parent_ids.first())
                .cloned()
                .ok_or(HistoryError::NonLinearRange)?;
        }
        chain.reverse();
        let parent = chain
            .first()
            .and_then(|c| c.parent_ids.first())
            .cloned()
            .ok_or(HistoryError::NonLinearRange)?;

        let combined: Vec<BoxedCommand> = chain.iter().flat_map(|c| c.commands.iter().map(|cmd| cmd.clone_box())).collect();
        let byte_size = combined.iter().map(|c| c.estimate_size()).sum();
        let id = self.clock.new_id();
        let new_commit = Commit {
            id: id.clone(),
            parent_ids: vec![parent],
            label: label.to_string(),
            timestamp_ms: self.clock.now_ms(),
            thumbnail: None,
            commands: combined,
            byte_size,
        };
        for c in &chain {
            self.graph.commits.remove(&c.id);
            self.graph.children.remove(&c.id);
        }
        self.graph.insert_commit(new_commit);
        for (_name, tip) in self.graph.branches.iter_mut() {
            if tip == to {
                *tip = id.clone();
            }
        }
        match &mut self.graph.head {
            Head::Branch { at, .. } if at == to => *at = id.clone(),
            Head::Detached { at } if at == to => *at = id.clone(),
            _ => {}
        }
        self.telemetry.commits_created.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }

    fn apply_and_commit(&mut self, commands: Vec<BoxedCommand>, parent_ids: Vec<String>, label: String) -> Result<String, HistoryError> {
        let mut current = self.state.clone();
        for cmd in &commands {
            current = cmd.apply(&current).map_err(HistoryError::from)?;
        }
        self.state = current;
        let byte_size = commands.iter().map(|c| c.estimate_size()).sum();
        let thumbnail = self.thumbnail_provider.as_ref().and_then(|p| p());
        let id = self.clock.new_id();
        let commit = Commit {
            id: id.clone(),
            parent_ids,
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
}

fn layer_kind(layer: &core_model::Layer) -> &'static str {
    use core_model::Layer;
    match layer {
        Layer::Image(_) => "image",
        Layer::Adjustment(_) => "adjustment",
        Layer::Solid(_) => "solid",
        Layer::Document(_) => "document",
        Layer::Mask(_) => "mask",
        Layer::Group(_) => "group",
    }
}
