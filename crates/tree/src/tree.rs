use lmrisk_protocol::messages::{RiskUpdate, TreemapCell, TreemapRow, TreemapTable};
use lmrisk_protocol::RiskLevel;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub const ROOT_KEY: &str = "root";

/// Index of a node inside a [`RiskTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Per-line scores attached to a file by the scoring service.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FileRisk {
    /// Not scored yet, or the request failed. Aggregates as an empty array.
    #[default]
    Pending,
    Lines(Vec<f64>),
    /// The service refused the content type.
    Unsupported,
}

impl FileRisk {
    #[must_use]
    pub fn lines(&self) -> &[f64] {
        match self {
            Self::Lines(lines) => lines,
            Self::Pending | Self::Unsupported => &[],
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Directory {
        children: Vec<NodeId>,
    },
    File {
        lines: usize,
        content: String,
        modified: Option<SystemTime>,
        risk: FileRisk,
    },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub path: PathBuf,
    pub relative_path: String,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    pub risk_level: RiskLevel,
}

impl Node {
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Directory { children } => children,
            NodeKind::File { .. } => &[],
        }
    }

    #[must_use]
    pub const fn lines(&self) -> usize {
        match &self.kind {
            NodeKind::File { lines, .. } => *lines,
            NodeKind::Directory { .. } => 0,
        }
    }

    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { content, .. } => Some(content),
            NodeKind::Directory { .. } => None,
        }
    }

    #[must_use]
    pub const fn modified(&self) -> Option<SystemTime> {
        match &self.kind {
            NodeKind::File { modified, .. } => *modified,
            NodeKind::Directory { .. } => None,
        }
    }

    #[must_use]
    pub const fn file_risk(&self) -> Option<&FileRisk> {
        match &self.kind {
            NodeKind::File { risk, .. } => Some(risk),
            NodeKind::Directory { .. } => None,
        }
    }

    /// File extension without the leading dot, as the services expect it.
    #[must_use]
    pub fn language_id(&self) -> String {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_string()
    }
}

/// Workspace tree stored as an arena. The root is always [`RiskTree::root`]
/// and parents are always allocated before their children.
#[derive(Debug, Clone)]
pub struct RiskTree {
    nodes: Vec<Node>,
    generation: u64,
}

impl RiskTree {
    pub(crate) fn with_root(path: impl Into<PathBuf>, generation: u64) -> Self {
        let root = Node {
            name: ROOT_KEY.to_string(),
            path: path.into(),
            relative_path: ROOT_KEY.to_string(),
            parent: None,
            kind: NodeKind::Directory {
                children: Vec::new(),
            },
            risk_level: RiskLevel::NotCalculated,
        };
        Self {
            nodes: vec![root],
            generation,
        }
    }

    pub(crate) fn push_directory(&mut self, parent: NodeId, name: String, path: PathBuf) -> NodeId {
        self.push(
            parent,
            name,
            path,
            NodeKind::Directory {
                children: Vec::new(),
            },
        )
    }

    pub(crate) fn push_file(
        &mut self,
        parent: NodeId,
        name: String,
        path: PathBuf,
        content: String,
        modified: Option<SystemTime>,
    ) -> NodeId {
        let lines = crate::scanner::count_lines(&content);
        self.push(
            parent,
            name,
            path,
            NodeKind::File {
                lines,
                content,
                modified,
                risk: FileRisk::Pending,
            },
        )
    }

    fn push(&mut self, parent: NodeId, name: String, path: PathBuf, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        let relative_path = format!("{}/{}", self.nodes[parent.0].relative_path, name);
        self.nodes.push(Node {
            name,
            path,
            relative_path,
            parent: Some(parent),
            kind,
            risk_level: RiskLevel::NotCalculated,
        });
        if let NodeKind::Directory { children } = &mut self.nodes[parent.0].kind {
            children.push(id);
        }
        id
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// The root is never removed, so a tree is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(idx, node)| (NodeId(idx), node))
    }

    /// File nodes in scan order.
    pub fn files(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter()
            .filter(|(_, node)| node.is_file())
            .map(|(id, _)| id)
    }

    #[must_use]
    pub fn find(&self, relative_path: &str) -> Option<NodeId> {
        self.iter()
            .find(|(_, node)| node.relative_path == relative_path)
            .map(|(id, _)| id)
    }

    #[must_use]
    pub fn find_by_path(&self, path: &Path) -> Option<NodeId> {
        self.iter()
            .find(|(_, node)| node.path == path)
            .map(|(id, _)| id)
    }

    /// Store scores for a file. Scores produced for another generation of the
    /// tree, or for a node that is not a file, are dropped and `false` is returned.
    pub fn apply_scores(&mut self, generation: u64, id: NodeId, scores: FileRisk) -> bool {
        if generation != self.generation {
            log::debug!(
                "Dropping scores for stale generation {generation} (current {})",
                self.generation
            );
            return false;
        }
        let Some(node) = self.nodes.get_mut(id.0) else {
            return false;
        };
        match &mut node.kind {
            NodeKind::File { risk, .. } => {
                if matches!(scores, FileRisk::Unsupported) {
                    node.risk_level = RiskLevel::NotSupported;
                }
                *risk = scores;
                true
            }
            NodeKind::Directory { .. } => false,
        }
    }

    /// Rebuild the arena without directories that have no file below them.
    /// The root is always kept. Returns the number of pruned directories.
    pub(crate) fn prune_empty_directories(&mut self) -> usize {
        let mut keep = vec![false; self.nodes.len()];
        self.mark_non_empty(self.root(), &mut keep);
        keep[0] = true;

        let mut remap: Vec<Option<NodeId>> = vec![None; self.nodes.len()];
        let mut next = 0;
        for (idx, kept) in keep.iter().enumerate() {
            if *kept {
                remap[idx] = Some(NodeId(next));
                next += 1;
            }
        }

        let pruned = self.nodes.len() - next;
        if pruned == 0 {
            return 0;
        }

        let old = std::mem::take(&mut self.nodes);
        for (idx, mut node) in old.into_iter().enumerate() {
            if !keep[idx] {
                continue;
            }
            node.parent = node.parent.and_then(|parent| remap[parent.0]);
            if let NodeKind::Directory { children } = &mut node.kind {
                *children = children.iter().filter_map(|child| remap[child.0]).collect();
            }
            self.nodes.push(node);
        }
        pruned
    }

    fn mark_non_empty(&self, id: NodeId, keep: &mut [bool]) -> bool {
        let node = &self.nodes[id.0];
        let non_empty = match &node.kind {
            NodeKind::File { .. } => true,
            NodeKind::Directory { children } => {
                let mut any = false;
                for child in children {
                    any |= self.mark_non_empty(*child, keep);
                }
                any
            }
        };
        keep[id.0] = non_empty;
        non_empty
    }

    /// Rows for the treemap panel, numbered from 1 in arena order.
    #[must_use]
    pub fn treemap_table(&self) -> TreemapTable {
        let rows = self
            .iter()
            .map(|(id, node)| {
                TreemapRow(
                    TreemapCell {
                        v: node.relative_path.clone(),
                        f: id.0 + 1,
                        is_file: node.is_file(),
                        path: node.path.to_string_lossy().into_owned(),
                    },
                    node.parent.map(|parent| self.nodes[parent.0].relative_path.clone()),
                    node.lines(),
                    node.risk_level,
                )
            })
            .collect();
        TreemapTable { rows }
    }

    #[must_use]
    pub fn risk_updates(&self) -> Vec<RiskUpdate> {
        self.iter()
            .map(|(id, node)| RiskUpdate {
                index: id.0 + 1,
                risk_level: node.risk_level,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_tree() -> RiskTree {
        let mut tree = RiskTree::with_root("/ws", 7);
        let root = tree.root();
        let src = tree.push_directory(root, "src".to_string(), PathBuf::from("/ws/src"));
        let empty = tree.push_directory(root, "empty".to_string(), PathBuf::from("/ws/empty"));
        tree.push_directory(empty, "deeper".to_string(), PathBuf::from("/ws/empty/deeper"));
        tree.push_file(
            src,
            "a.java".to_string(),
            PathBuf::from("/ws/src/a.java"),
            "class A {\n}".to_string(),
            None,
        );
        tree
    }

    #[test]
    fn relative_paths_hang_off_root_key() {
        let tree = sample_tree();
        let file = tree.find("root/src/a.java").unwrap();
        let node = tree.node(file);
        assert_eq!(node.lines(), 2);
        assert_eq!(node.language_id(), "java");
        let parent = node.parent.unwrap();
        assert_eq!(tree.node(parent).relative_path, "root/src");
        assert_eq!(tree.node(parent).children(), &[file]);
    }

    #[test]
    fn pruning_removes_nested_empty_directories() {
        let mut tree = sample_tree();
        assert_eq!(tree.prune_empty_directories(), 2);
        let keys: Vec<_> = tree.iter().map(|(_, n)| n.relative_path.clone()).collect();
        assert_eq!(keys, vec!["root", "root/src", "root/src/a.java"]);
        assert_eq!(tree.node(tree.root()).children().len(), 1);
        let file = tree.find("root/src/a.java").unwrap();
        assert_eq!(tree.node(file).parent, tree.find("root/src"));
    }

    #[test]
    fn stale_generation_scores_are_dropped() {
        let mut tree = sample_tree();
        let file = tree.find("root/src/a.java").unwrap();
        assert!(!tree.apply_scores(6, file, FileRisk::Lines(vec![1.0])));
        assert_eq!(tree.node(file).file_risk(), Some(&FileRisk::Pending));
        assert!(tree.apply_scores(7, file, FileRisk::Unsupported));
        assert_eq!(tree.node(file).risk_level, RiskLevel::NotSupported);
        assert!(!tree.apply_scores(7, tree.root(), FileRisk::Lines(vec![])));
    }

    #[test]
    fn treemap_rows_reference_parent_keys() {
        let tree = sample_tree();
        let table = tree.treemap_table();
        assert_eq!(table.rows.len(), tree.len());
        assert_eq!(table.rows[0].1, None);
        assert_eq!(table.rows[1].1.as_deref(), Some("root"));
        assert_eq!(table.rows[1].0.f, 2);
    }
}
