/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 04/10/2026
Last Modified: 16/10/2026
License: MIT

Notes: A mutable R-tree over axis-aligned bounding boxes. Nodes live in an
arena and refer to their children by index, which keeps the insert, split
and condense algorithms free of pointer juggling and makes the structure
trivial to serialize. Parent links are not stored; insert and remove carry
the root-to-leaf path instead.
*/

mod persist;
mod split;

pub use self::persist::INDEX_FORMAT_VERSION;

use self::split::quadratic_split;
use crate::error::{Result, ShapeError};
use crate::structures::{Bounded, BoundingBox};
use tracing::{debug, warn};

pub const DEFAULT_MIN_ENTRIES: usize = 4;
pub const DEFAULT_MAX_ENTRIES: usize = 16;

/// The persisted child count is a u16.
pub const MAX_NODE_CAPACITY: usize = 65535;

/// A leaf entry: the bounding box of a feature and the feature's id.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RTreeEntry {
    pub bbox: BoundingBox,
    pub id: u32,
}

#[derive(Clone, Debug)]
enum NodeKind {
    Leaf(Vec<RTreeEntry>),
    Internal(Vec<usize>),
}

#[derive(Clone, Debug)]
struct Node {
    bbox: BoundingBox,
    kind: NodeKind,
}

impl Node {
    fn leaf(entries: Vec<RTreeEntry>) -> Node {
        Node {
            bbox: BoundingBox::empty(),
            kind: NodeKind::Leaf(entries),
        }
    }

    fn internal(children: Vec<usize>) -> Node {
        Node {
            bbox: BoundingBox::empty(),
            kind: NodeKind::Internal(children),
        }
    }

    fn entry_count(&self) -> usize {
        match &self.kind {
            NodeKind::Leaf(entries) => entries.len(),
            NodeKind::Internal(children) => children.len(),
        }
    }
}

/// A dynamic R-tree supporting insertion, deletion and box queries.
///
/// The tree is always rooted; a small tree is a single leaf. Internal node
/// boxes are kept equal to the union of their children's boxes.
///
/// Examples:
///
/// ```
/// use shapestore_common::structures::{BoundingBox, DynamicRTree};
///
/// let mut tree = DynamicRTree::default();
/// tree.insert(BoundingBox::new(0.0, 10.0, 0.0, 10.0), 0);
/// tree.insert(BoundingBox::new(20.0, 30.0, 20.0, 30.0), 1);
/// let hits: Vec<u32> = tree
///     .search(BoundingBox::new(5.0, 15.0, 5.0, 15.0))
///     .map(|e| e.id)
///     .collect();
/// assert_eq!(hits, vec![0]);
/// ```
#[derive(Clone, Debug)]
pub struct DynamicRTree {
    nodes: Vec<Node>,
    free: Vec<usize>,
    root: usize,
    len: usize,
    min_entries: usize,
    max_entries: usize,
}

impl Default for DynamicRTree {
    fn default() -> DynamicRTree {
        DynamicRTree {
            nodes: vec![Node::leaf(vec![])],
            free: vec![],
            root: 0,
            len: 0,
            min_entries: DEFAULT_MIN_ENTRIES,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl DynamicRTree {
    /// Creates an empty tree with the given fan-out limits.
    pub fn new(min_entries: usize, max_entries: usize) -> Result<DynamicRTree> {
        if min_entries < 1 {
            return Err(ShapeError::Config(
                "R-tree nodes must hold at least one entry".to_string(),
            ));
        }
        if 2 * min_entries > max_entries {
            return Err(ShapeError::Config(format!(
                "R-tree maximum fan-out ({}) must be at least twice the minimum ({})",
                max_entries, min_entries
            )));
        }
        if max_entries > MAX_NODE_CAPACITY {
            return Err(ShapeError::Config(format!(
                "R-tree maximum fan-out may not exceed {}",
                MAX_NODE_CAPACITY
            )));
        }
        Ok(DynamicRTree {
            min_entries,
            max_entries,
            ..Default::default()
        })
    }

    /// Builds a tree by inserting every entry in turn.
    pub fn bulk_build<I>(min_entries: usize, max_entries: usize, entries: I) -> Result<DynamicRTree>
    where
        I: IntoIterator<Item = (BoundingBox, u32)>,
    {
        let mut tree = DynamicRTree::new(min_entries, max_entries)?;
        for (bbox, id) in entries {
            tree.insert(bbox, id);
        }
        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn min_entries(&self) -> usize {
        self.min_entries
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Number of levels; a lone root leaf has height 1.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut node = self.root;
        while let NodeKind::Internal(children) = &self.nodes[node].kind {
            height += 1;
            node = children[0];
        }
        height
    }

    /// The number of live nodes in the arena.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// The root's box; empty for an empty tree.
    pub fn bounding_box(&self) -> BoundingBox {
        self.nodes[self.root].bbox
    }

    /// Resets the tree to an empty root leaf.
    pub fn clear(&mut self) {
        self.nodes = vec![Node::leaf(vec![])];
        self.free.clear();
        self.root = 0;
        self.len = 0;
    }

    pub fn insert(&mut self, bbox: BoundingBox, id: u32) {
        if bbox.is_empty() {
            warn!("Ignoring R-tree insert of an empty bounding box (id {})", id);
            return;
        }
        let path = self.choose_leaf_path(bbox);
        let leaf = path[path.len() - 1];
        if let NodeKind::Leaf(entries) = &mut self.nodes[leaf].kind {
            entries.push(RTreeEntry { bbox, id });
        }
        self.len += 1;
        self.adjust_tree(&path);
    }

    /// Removes the entry matching both `bbox` and `id`. Returns false, leaving
    /// the tree untouched, if there is no such entry.
    pub fn remove(&mut self, bbox: BoundingBox, id: u32) -> bool {
        let path = match self.find_leaf_path(self.root, bbox, id) {
            Some(mut p) => {
                p.reverse();
                p
            }
            None => return false,
        };
        let leaf = path[path.len() - 1];
        if let NodeKind::Leaf(entries) = &mut self.nodes[leaf].kind {
            if let Some(pos) = entries.iter().position(|e| e.id == id && e.bbox == bbox) {
                entries.remove(pos);
            }
        }
        self.len -= 1;
        self.condense_tree(&path);
        true
    }

    /// Lazily yields every entry whose box overlaps `query`.
    pub fn search(&self, query: BoundingBox) -> SearchIter<'_> {
        let mut stack = vec![];
        if self.nodes[self.root].bbox.overlaps(query) {
            stack.push(self.root);
        }
        SearchIter {
            tree: self,
            query,
            stack,
            leaf: None,
        }
    }

    /// Searches by the geometry's bounding box only; candidates still need
    /// an exact test against the real geometry.
    pub fn search_geometry<G: Bounded + ?Sized>(&self, geometry: &G) -> SearchIter<'_> {
        self.search(geometry.bounding_box())
    }

    /// Verifies fan-out limits, balance and bounding box tightness.
    pub fn check_integrity(&self) -> Result<()> {
        let mut leaf_depth = None;
        let count = self.check_node(self.root, 0, &mut leaf_depth)?;
        if count != self.len {
            return Err(ShapeError::IndexCorrupt(format!(
                "tree holds {} entries but records {}",
                count, self.len
            )));
        }
        Ok(())
    }

    fn check_node(&self, node: usize, depth: usize, leaf_depth: &mut Option<usize>) -> Result<usize> {
        let n = &self.nodes[node];
        let count = n.entry_count();
        if count > self.max_entries {
            return Err(ShapeError::IndexCorrupt(format!(
                "node holds {} entries, more than the maximum of {}",
                count, self.max_entries
            )));
        }
        if node != self.root && count < self.min_entries {
            return Err(ShapeError::IndexCorrupt(format!(
                "node holds {} entries, fewer than the minimum of {}",
                count, self.min_entries
            )));
        }
        let mut expected = BoundingBox::empty();
        let total = match &n.kind {
            NodeKind::Leaf(entries) => {
                match *leaf_depth {
                    Some(d) if d != depth => {
                        return Err(ShapeError::IndexCorrupt(
                            "leaves are not all at the same depth".to_string(),
                        ));
                    }
                    _ => *leaf_depth = Some(depth),
                }
                for e in entries {
                    expected.expand_to(e.bbox);
                }
                entries.len()
            }
            NodeKind::Internal(children) => {
                if children.is_empty() {
                    return Err(ShapeError::IndexCorrupt(
                        "internal node without children".to_string(),
                    ));
                }
                let mut total = 0;
                for &c in children {
                    total += self.check_node(c, depth + 1, leaf_depth)?;
                    expected.expand_to(self.nodes[c].bbox);
                }
                total
            }
        };
        if expected != n.bbox {
            return Err(ShapeError::IndexCorrupt(format!(
                "node box {} is not the union of its children {}",
                n.bbox, expected
            )));
        }
        Ok(total)
    }

    fn alloc(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn free_node(&mut self, idx: usize) {
        self.nodes[idx] = Node::leaf(vec![]);
        self.free.push(idx);
    }

    fn recompute_bbox(&mut self, node: usize) {
        let mut bbox = BoundingBox::empty();
        match &self.nodes[node].kind {
            NodeKind::Leaf(entries) => {
                for e in entries {
                    bbox.expand_to(e.bbox);
                }
            }
            NodeKind::Internal(children) => {
                for &c in children {
                    bbox.expand_to(self.nodes[c].bbox);
                }
            }
        }
        self.nodes[node].bbox = bbox;
    }

    fn choose_leaf_path(&self, bbox: BoundingBox) -> Vec<usize> {
        let mut path = vec![self.root];
        let mut node = self.root;
        while let NodeKind::Internal(children) = &self.nodes[node].kind {
            node = self.choose_subtree(children, bbox);
            path.push(node);
        }
        path
    }

    /// Least enlargement, then smallest resulting area, then fewest entries.
    fn choose_subtree(&self, children: &[usize], bbox: BoundingBox) -> usize {
        let mut best = children[0];
        let mut best_key = (f64::INFINITY, f64::INFINITY, usize::MAX);
        for &c in children {
            let child = &self.nodes[c];
            let area = child.bbox.union(bbox).area();
            let key = (area - child.bbox.area(), area, child.entry_count());
            let better = key.0 < best_key.0
                || (key.0 == best_key.0
                    && (key.1 < best_key.1 || (key.1 == best_key.1 && key.2 < best_key.2)));
            if better {
                best = c;
                best_key = key;
            }
        }
        best
    }

    /// Walks the insertion path bottom-up, splitting overflowing nodes and
    /// tightening boxes. A split root gets a new root above it.
    fn adjust_tree(&mut self, path: &[usize]) {
        let mut sibling: Option<usize> = None;
        for &node in path.iter().rev() {
            if let Some(s) = sibling.take() {
                if let NodeKind::Internal(children) = &mut self.nodes[node].kind {
                    children.push(s);
                }
            }
            if self.nodes[node].entry_count() > self.max_entries {
                sibling = Some(self.split_node(node));
            } else {
                self.recompute_bbox(node);
            }
        }
        if let Some(s) = sibling {
            let old_root = self.root;
            let new_root = self.alloc(Node::internal(vec![old_root, s]));
            self.recompute_bbox(new_root);
            self.root = new_root;
            debug!("R-tree root split; height is now {}", self.height());
        }
    }

    /// Splits `node` in two, keeping one half in place. Returns the new node.
    fn split_node(&mut self, node: usize) -> usize {
        let kind = std::mem::replace(&mut self.nodes[node].kind, NodeKind::Leaf(vec![]));
        let (kept, moved) = match kind {
            NodeKind::Leaf(entries) => {
                let items = entries.into_iter().map(|e| (e.bbox, e)).collect();
                let (g1, g2) = quadratic_split(items, self.min_entries);
                (
                    NodeKind::Leaf(g1.into_iter().map(|(_, e)| e).collect()),
                    NodeKind::Leaf(g2.into_iter().map(|(_, e)| e).collect()),
                )
            }
            NodeKind::Internal(children) => {
                let items = children
                    .into_iter()
                    .map(|c| (self.nodes[c].bbox, c))
                    .collect();
                let (g1, g2) = quadratic_split(items, self.min_entries);
                (
                    NodeKind::Internal(g1.into_iter().map(|(_, c)| c).collect()),
                    NodeKind::Internal(g2.into_iter().map(|(_, c)| c).collect()),
                )
            }
        };
        self.nodes[node].kind = kept;
        self.recompute_bbox(node);
        let sibling = self.alloc(Node {
            bbox: BoundingBox::empty(),
            kind: moved,
        });
        self.recompute_bbox(sibling);
        sibling
    }

    /// Returns the leaf-to-root path of the first leaf holding the entry,
    /// descending only into children whose boxes overlap `bbox`.
    fn find_leaf_path(&self, node: usize, bbox: BoundingBox, id: u32) -> Option<Vec<usize>> {
        match &self.nodes[node].kind {
            NodeKind::Leaf(entries) => {
                if entries.iter().any(|e| e.id == id && e.bbox == bbox) {
                    Some(vec![node])
                } else {
                    None
                }
            }
            NodeKind::Internal(children) => {
                for &c in children {
                    if self.nodes[c].bbox.overlaps(bbox) {
                        if let Some(mut path) = self.find_leaf_path(c, bbox, id) {
                            path.push(node);
                            return Some(path);
                        }
                    }
                }
                None
            }
        }
    }

    /// Detaches underfull nodes along `path`, tightens the remaining boxes,
    /// shortens the tree if the root is left with a single child, and
    /// reinserts the detached entries from the root.
    fn condense_tree(&mut self, path: &[usize]) {
        let mut orphans: Vec<RTreeEntry> = vec![];
        for depth in (1..path.len()).rev() {
            let node = path[depth];
            let parent = path[depth - 1];
            if self.nodes[node].entry_count() < self.min_entries {
                if let NodeKind::Internal(children) = &mut self.nodes[parent].kind {
                    children.retain(|&c| c != node);
                }
                self.collect_entries(node, &mut orphans);
            } else {
                self.recompute_bbox(node);
            }
        }
        self.recompute_bbox(self.root);

        loop {
            let only_child = match &self.nodes[self.root].kind {
                NodeKind::Internal(children) if children.len() == 1 => Some(children[0]),
                NodeKind::Internal(children) if children.is_empty() => None,
                _ => break,
            };
            match only_child {
                Some(child) => {
                    let old_root = self.root;
                    self.root = child;
                    self.free_node(old_root);
                }
                None => {
                    self.nodes[self.root] = Node::leaf(vec![]);
                    break;
                }
            }
        }

        if !orphans.is_empty() {
            debug!("Reinserting {} R-tree entries after underflow", orphans.len());
            self.len -= orphans.len();
            for e in orphans {
                self.insert(e.bbox, e.id);
            }
        }
    }

    /// Moves every leaf entry under `node` into `out` and frees the subtree.
    fn collect_entries(&mut self, node: usize, out: &mut Vec<RTreeEntry>) {
        let kind = std::mem::replace(&mut self.nodes[node].kind, NodeKind::Leaf(vec![]));
        match kind {
            NodeKind::Leaf(entries) => out.extend(entries),
            NodeKind::Internal(children) => {
                for c in children {
                    self.collect_entries(c, out);
                }
            }
        }
        self.free_node(node);
    }
}

/// A lazy depth-first traversal yielding entries that overlap a query box.
/// Each call to `search` starts a fresh traversal.
pub struct SearchIter<'a> {
    tree: &'a DynamicRTree,
    query: BoundingBox,
    stack: Vec<usize>,
    leaf: Option<(usize, usize)>,
}

impl<'a> Iterator for SearchIter<'a> {
    type Item = RTreeEntry;

    fn next(&mut self) -> Option<RTreeEntry> {
        loop {
            if let Some((node, start)) = self.leaf.take() {
                if let NodeKind::Leaf(entries) = &self.tree.nodes[node].kind {
                    for (i, e) in entries.iter().enumerate().skip(start) {
                        if e.bbox.overlaps(self.query) {
                            self.leaf = Some((node, i + 1));
                            return Some(*e);
                        }
                    }
                }
            }
            let node = self.stack.pop()?;
            match &self.tree.nodes[node].kind {
                NodeKind::Leaf(_) => self.leaf = Some((node, 0)),
                NodeKind::Internal(children) => {
                    for &c in children.iter().rev() {
                        if self.tree.nodes[c].bbox.overlaps(self.query) {
                            self.stack.push(c);
                        }
                    }
                }
            }
        }
    }
}
