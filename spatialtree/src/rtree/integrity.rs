//! Structural verification of a persisted tree.

use crate::block_store::{BlockId, BlockStore, LEAF_LEVEL};
use crate::bounding_box::BoundingBox;

/// Result of integrity check operation
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    /// Total nodes read
    pub nodes_checked: u64,
    /// Leaf entries reached from the root
    pub leaf_entries: u64,
    /// Blocks that could not be read or decoded
    pub corrupt_blocks: Vec<BlockId>,
    /// Non-root nodes below the minimum fill; expected after deletes
    pub underfull_nodes: Vec<BlockId>,
    /// Summary of findings
    pub is_valid: bool,
    /// Detailed error messages
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn new() -> Self {
        Self {
            nodes_checked: 0,
            leaf_entries: 0,
            corrupt_blocks: Vec::new(),
            underfull_nodes: Vec::new(),
            is_valid: true,
            errors: Vec::new(),
        }
    }

    fn fail(&mut self, message: String) {
        self.is_valid = false;
        self.errors.push(message);
    }
}

impl Default for IntegrityReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Walks the tree below `root_block_id` and reports every violated invariant.
///
/// Unreadable blocks are recorded rather than aborting the walk.
pub fn check_tree(store: &BlockStore, root_block_id: BlockId, total_levels: u32) -> IntegrityReport {
    let mut report = IntegrityReport::new();
    check_node(store, root_block_id, total_levels, None, true, &mut report);
    report
}

fn check_node(
    store: &BlockStore,
    block_id: BlockId,
    expected_level: u32,
    parent_box: Option<&BoundingBox>,
    is_root: bool,
    report: &mut IntegrityReport,
) {
    let node = match store.read_node(block_id) {
        Ok(node) => node,
        Err(e) => {
            report.corrupt_blocks.push(block_id);
            report.fail(format!("block {}: {}", block_id, e));
            return;
        }
    };
    report.nodes_checked += 1;

    if node.level != expected_level {
        report.fail(format!(
            "block {} is at level {}, expected {}",
            block_id, node.level, expected_level
        ));
    }
    if node.len() > store.max_entries() {
        report.fail(format!(
            "block {} holds {} entries, maximum is {}",
            block_id,
            node.len(),
            store.max_entries()
        ));
    }
    if !is_root && node.len() < store.min_entries() {
        report.underfull_nodes.push(block_id);
    }
    if let (Some(parent_box), Some(mbr)) = (parent_box, node.mbr()) {
        if !parent_box.contains(&mbr) {
            report.fail(format!(
                "parent entry {} does not enclose block {} ({})",
                parent_box, block_id, mbr
            ));
        }
    }

    for entry in &node.entries {
        if entry.bbox.dimensions() != store.dimensions() {
            report.fail(format!(
                "block {} holds a {}-dimensional entry",
                block_id,
                entry.bbox.dimensions()
            ));
        }
        if entry.is_leaf() != (node.level == LEAF_LEVEL) {
            report.fail(format!(
                "block {} at level {} holds a wrong kind of entry",
                block_id, node.level
            ));
            continue;
        }
        match entry.child_block_id() {
            Some(child) if node.level > LEAF_LEVEL => check_node(
                store,
                child,
                node.level - 1,
                Some(&entry.bbox),
                false,
                report,
            ),
            _ => report.leaf_entries += 1,
        }
    }
}
