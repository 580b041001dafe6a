//! DAG history graph and the graph-delta (lowest-common-ancestor undo/redo
//! path) algorithm.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use core_command::BoxedCommand;

/// Immutable unit of change. `commands` replays as a single [`crate::commands::Composite`]-style
/// sequence; parents are 0 (root), 1 (linear), or 2 (merge).
#[derive(Debug, Clone)]
pub struct Commit {
    pub id: String,
    pub parent_ids: Vec<String>,
    pub label: String,
    pub timestamp_ms: u64,
    pub thumbnail: Option<Vec<u8>>,
    pub commands: Vec<BoxedCommand>,
    pub byte_size: usize,
}

impl Commit {
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }
}

/// Where HEAD currently points: attached to a branch tip, or detached at a
/// specific commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    Branch { name: String, at: String },
    Detached { at: String },
}

impl Head {
    pub fn at(&self) -> &str {
        match self {
            Head::Branch { at, .. } => at,
            Head::Detached { at } => at,
        }
    }

    pub fn branch_name(&self) -> Option<&str> {
        match self {
            Head::Branch { name, .. } => Some(name),
            Head::Detached { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Protected {
    pub commits: BTreeSet<String>,
    pub branches: BTreeSet<String>,
}

pub const MAIN_BRANCH: &str = "main";

/// The full DAG: commits, branch tips, HEAD, and protected ids. `children` is
/// kept as the inverse index over `parentIds`, rebuilt whenever a commit is
/// inserted or removed rather than derived lazily, so every lookup is O(1).
#[derive(Debug, Clone)]
pub struct HistoryGraph {
    pub commits: BTreeMap<String, Commit>,
    pub branches: BTreeMap<String, String>,
    pub children: BTreeMap<String, Vec<String>>,
    pub head: Head,
    pub protected: Protected,
}

impl HistoryGraph {
    /// A fresh graph with a single root commit carrying no commands, on
    /// branch `main` (protected from deletion/rename).
    pub fn new_with_root(root_id: impl Into<String>, timestamp_ms: u64) -> Self {
        let root_id = root_id.into();
        let root = Commit {
            id: root_id.clone(),
            parent_ids: Vec::new(),
            label: "Initial state".to_string(),
            timestamp_ms,
            thumbnail: None,
            commands: Vec::new(),
            byte_size: 0,
        };
        let mut commits = BTreeMap::new();
        commits.insert(root_id.clone(), root);
        let mut branches = BTreeMap::new();
        branches.insert(MAIN_BRANCH.to_string(), root_id.clone());
        let mut protected = Protected::default();
        protected.commits.insert(root_id.clone());
        protected.branches.insert(MAIN_BRANCH.to_string());
        Self {
            commits,
            branches,
            children: BTreeMap::new(),
            head: Head::Branch {
                name: MAIN_BRANCH.to_string(),
                at: root_id,
            },
            protected,
        }
    }

    pub fn root_id(&self) -> &str {
        // The root is the only commit with no parents; a freshly-compacted
        // graph always has exactly one.
        self.commits
            .values()
            .find(|c| c.parent_ids.is_empty())
            .map(|c| c.id.as_str())
            .unwrap_or("")
    }

    pub fn insert_commit(&mut self, commit: Commit) {
        for parent in &commit.parent_ids {
            self.children.entry(parent.clone()).or_default().push(commit.id.clone());
        }
        self.commits.insert(commit.id.clone(), commit);
    }

    pub fn children_of(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ancestor path from `id` back to the root, following `parentIds[0]`
    /// only — merge commits are walked via their first parent.
    fn first_parent_chain<'a>(&'a self, id: &'a str) -> Vec<&'a str> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(commit) = self.commits.get(current) {
            match commit.parent_ids.first() {
                Some(parent) => {
                    chain.push(parent.as_str());
                    current = parent.as_str();
                }
                None => break,
            }
        }
        chain
    }

    /// Lowest common ancestor of `a` and `b` via a two-pointer walk over the
    /// first-parent chains.
    pub fn lowest_common_ancestor(&self, a: &str, b: &str) -> Option<String> {
        let chain_a: HashSet<&str> = self.first_parent_chain(a).into_iter().collect();
        for candidate in self.first_parent_chain(b) {
            if chain_a.contains(candidate) {
                return Some(candidate.to_string());
            }
        }
        None
    }

    /// Graph delta between `from` and `to`: the path `from → LCA` (exclusive
    /// of LCA) reversed defines `undo`; `LCA → to` defines `redo`. Both
    /// lists are ordered oldest-effect-first for the direction they are
    /// meant to replay in: `undo` leaf-first, `redo` root-first.
    pub fn delta(&self, from: &str, to: &str) -> Option<GraphDelta> {
        let lca = self.lowest_common_ancestor(from, to)?;
        let mut undo = Vec::new();
        let mut cursor = from;
        while cursor != lca {
            undo.push(cursor.to_string());
            cursor = self.commits.get(cursor)?.parent_ids.first()?.as_str();
        }
        let mut redo_rev = Vec::new();
        let mut cursor = to;
        while cursor != lca {
            redo_rev.push(cursor.to_string());
            cursor = self.commits.get(cursor)?.parent_ids.first()?.as_str();
        }
        redo_rev.reverse();
        Some(GraphDelta {
            lca,
            undo,
            redo: redo_rev,
        })
    }

    /// Ids reachable (ancestors) of any branch tip or HEAD: a commit is
    /// reachable iff it is an ancestor of any branch tip or HEAD.
    pub fn reachable_ids(&self) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<String> = self.branches.values().cloned().collect();
        stack.push(self.head.at().to_string());
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(commit) = self.commits.get(&id) {
                stack.extend(commit.parent_ids.iter().cloned());
            }
        }
        seen
    }
}

/// Result of [`HistoryGraph::delta`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphDelta {
    pub lca: String,
    /// Commit ids to invert, leaf-first (i.e. in this order).
    pub undo: Vec<String>,
    /// Commit ids to replay forward, root-first (i.e. in this order).
    pub redo: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(id: &str, parents: &[&str]) -> Commit {
        Commit {
            id: id.to_string(),
            parent_ids: parents.iter().map(|s| s.to_string()).collect(),
            label: id.to_string(),
            timestamp_ms: 0,
            thumbnail: None,
            commands: Vec::new(),
            byte_size: 10,
        }
    }

    fn linear_graph() -> HistoryGraph {
        let mut g = HistoryGraph::new_with_root("root", 0);
        g.insert_commit(commit("c1", &["root"]));
        g.insert_commit(commit("c2", &["c1"]));
        g.branches.insert(MAIN_BRANCH.to_string(), "c2".to_string());
        g.head = Head::Branch {
            name: MAIN_BRANCH.to_string(),
            at: "c2".to_string(),
        };
        g
    }

    #[test]
    fn lca_of_ancestor_and_descendant_is_ancestor() {
        let g = linear_graph();
        assert_eq!(g.lowest_common_ancestor("c1", "c2"), Some("c1".to_string()));
    }

    #[test]
    fn delta_undo_and_redo_are_correctly_ordered() {
        let g = linear_graph();
        let delta = g.delta("c2", "root").unwrap();
        assert_eq!(delta.undo, vec!["c2".to_string(), "c1".to_string()]);
        assert!(delta.redo.is_empty());

        let delta_back = g.delta("root", "c2").unwrap();
        assert!(delta_back.undo.is_empty());
        assert_eq!(delta_back.redo, vec!["c1".to_string(), "c2".to_string()]);
    }

    #[test]
    fn branching_lca() {
        let mut g = HistoryGraph::new_with_root("root", 0);
        g.insert_commit(commit("a", &["root"]));
        g.insert_commit(commit("b1", &["a"]));
        g.insert_commit(commit("b2", &["a"]));
        assert_eq!(g.lowest_common_ancestor("b1", "b2"), Some("a".to_string()));
    }

    #[test]
    fn reachable_ids_excludes_orphaned_branch_point() {
        let mut g = linear_graph();
        g.insert_commit(commit("side", &["c1"]));
        let reachable = g.reachable_ids();
        assert!(reachable.contains("side"));
        assert!(reachable.contains("c2"));
        assert!(reachable.contains("root"));
    }
}
