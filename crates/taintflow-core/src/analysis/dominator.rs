/*!
Block-level dominance inside a single function.

Immediate dominators are computed with the Cooper-Harvey-Kennedy iterative
scheme: reachable blocks are numbered in reverse postorder and every
non-entry block's dominator is refined to the meet of its already-processed
predecessors until nothing changes. The meet walks the partial idom chains
upward, so no per-block dominator sets are ever materialized.
*/

use crate::block::BlockId;
use crate::function::Function;
use std::collections::{HashMap, HashSet};

/// Marks an idom slot not reached by the refinement yet.
const UNDEFINED: usize = usize::MAX;

#[derive(Debug, Clone)]
pub struct DominatorTree {
    /// Reverse-postorder number of every reachable block.
    number: HashMap<BlockId, usize>,
    /// Blocks in reverse postorder; the index is the block's number.
    blocks: Vec<BlockId>,
    /// Immediate dominator by number; the entry points at itself.
    idom: Vec<usize>,
}

impl DominatorTree {
    pub fn build(function: &Function) -> Self {
        let blocks = reverse_postorder(function);
        let number: HashMap<BlockId, usize> = blocks
            .iter()
            .enumerate()
            .map(|(i, &block)| (block, i))
            .collect();

        let mut idom = vec![UNDEFINED; blocks.len()];
        if !blocks.is_empty() {
            idom[0] = 0;
        }

        let mut changed = true;
        while changed {
            changed = false;
            for current in 1..blocks.len() {
                let mut candidate = UNDEFINED;
                for pred in function.body.blocks[&blocks[current]].predecessors() {
                    let Some(&pred_number) = number.get(pred) else {
                        continue;
                    };
                    if idom[pred_number] == UNDEFINED {
                        continue;
                    }
                    candidate = if candidate == UNDEFINED {
                        pred_number
                    } else {
                        meet(&idom, candidate, pred_number)
                    };
                }
                if candidate != UNDEFINED && idom[current] != candidate {
                    idom[current] = candidate;
                    changed = true;
                }
            }
        }

        Self {
            number,
            blocks,
            idom,
        }
    }

    /// True when every path from the entry to `dominated` passes through
    /// `dominator` first. Reflexive; false for unreachable blocks.
    pub fn dominates(&self, dominator: BlockId, dominated: BlockId) -> bool {
        let (Some(&dom), Some(&sub)) =
            (self.number.get(&dominator), self.number.get(&dominated))
        else {
            return false;
        };
        let mut current = sub;
        // Idom numbers strictly decrease towards the entry.
        while current > dom {
            current = self.idom[current];
        }
        current == dom
    }

    pub fn idom(&self, block: BlockId) -> Option<BlockId> {
        let number = *self.number.get(&block)?;
        if number == 0 {
            return None;
        }
        Some(self.blocks[self.idom[number]])
    }
}

/// Finger-walk meet of two numbered blocks over the partial idom array.
fn meet(idom: &[usize], a: usize, b: usize) -> usize {
    let (mut a, mut b) = (a, b);
    while a != b {
        while a > b {
            a = idom[a];
        }
        while b > a {
            b = idom[b];
        }
    }
    a
}

fn reverse_postorder(function: &Function) -> Vec<BlockId> {
    let entry = function.entry_block();
    let successors = |block: BlockId| {
        function
            .body
            .blocks
            .get(&block)
            .map(|b| b.successors())
            .unwrap_or_default()
    };

    let mut order = Vec::new();
    let mut visited = HashSet::from([entry]);
    let mut stack = vec![(entry, successors(entry))];
    while let Some(frame) = stack.last_mut() {
        match frame.1.pop() {
            Some(succ) => {
                if visited.insert(succ) {
                    stack.push((succ, successors(succ)));
                }
            }
            None => {
                if let Some((block, _)) = stack.pop() {
                    order.push(block);
                }
            }
        }
    }
    order.reverse();
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModuleBuilder;
    use crate::types::Type;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_diamond_merge_is_dominated_only_by_entry() {
        let mut builder = ModuleBuilder::new();
        let mut fb = builder.function("diamond", Type::Void);
        let entry = fb.entry_block().block_id();
        let left = fb.create_block();
        let right = fb.create_block();
        let merge = fb.create_block();

        let mut eb = fb.switch_to_block(entry).unwrap();
        let cond = eb.const_bool(true);
        eb.branch(cond, left, right).unwrap();
        fb.switch_to_block(left).unwrap().jump(merge).unwrap();
        fb.switch_to_block(right).unwrap().jump(merge).unwrap();
        fb.switch_to_block(merge).unwrap().return_void().unwrap();
        let func = fb.finish().unwrap();
        let module = builder.build();

        let tree = DominatorTree::build(module.function(func).unwrap());

        assert!(tree.dominates(entry, entry));
        assert!(tree.dominates(entry, left));
        assert!(tree.dominates(entry, right));
        assert!(tree.dominates(entry, merge));
        assert!(!tree.dominates(left, merge));
        assert!(!tree.dominates(right, merge));
        assert!(!tree.dominates(left, right));

        assert_eq!(tree.idom(entry), None);
        assert_eq!(tree.idom(left), Some(entry));
        assert_eq!(tree.idom(right), Some(entry));
        assert_eq!(tree.idom(merge), Some(entry));
    }

    #[test]
    fn test_loop_header_dominates_body_and_exit() {
        let mut builder = ModuleBuilder::new();
        let mut fb = builder.function("looping", Type::Void);
        let entry = fb.entry_block().block_id();
        let header = fb.create_block();
        let body = fb.create_block();
        let exit = fb.create_block();

        let mut eb = fb.switch_to_block(entry).unwrap();
        let cond = eb.const_bool(true);
        eb.jump(header).unwrap();
        fb.switch_to_block(header)
            .unwrap()
            .branch(cond, body, exit)
            .unwrap();
        // The back edge makes the refinement re-visit the header.
        fb.switch_to_block(body).unwrap().jump(header).unwrap();
        fb.switch_to_block(exit).unwrap().return_void().unwrap();
        let func = fb.finish().unwrap();
        let module = builder.build();

        let tree = DominatorTree::build(module.function(func).unwrap());

        assert!(tree.dominates(header, body));
        assert!(tree.dominates(header, exit));
        assert!(tree.dominates(entry, exit));
        assert!(!tree.dominates(body, header));
        assert!(!tree.dominates(body, exit));

        assert_eq!(tree.idom(header), Some(entry));
        assert_eq!(tree.idom(body), Some(header));
        assert_eq!(tree.idom(exit), Some(header));
    }

    #[test]
    fn test_unreachable_block_is_never_dominated() {
        let mut builder = ModuleBuilder::new();
        let mut fb = builder.function("orphaned", Type::Void);
        let entry = fb.entry_block().block_id();
        let orphan = fb.create_block();
        fb.switch_to_block(entry).unwrap().return_void().unwrap();
        fb.switch_to_block(orphan).unwrap().return_void().unwrap();
        let func = fb.finish().unwrap();
        let module = builder.build();

        let tree = DominatorTree::build(module.function(func).unwrap());

        assert!(!tree.dominates(entry, orphan));
        assert!(!tree.dominates(orphan, entry));
        assert_eq!(tree.idom(orphan), None);
    }
}
