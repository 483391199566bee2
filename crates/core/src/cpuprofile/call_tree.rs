use std::collections::HashMap;

use thiserror::Error;

use crate::model::ProfileNode;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallTreeError {
    /// Parent pointers loop back on themselves. A valid profile is a tree,
    /// so a cycle means the input data is corrupt and must be reported, not
    /// patched over.
    #[error("cycle in call tree parent pointers at node {0}")]
    CycleDetected(u64),
}

/// Rebuild `children` arrays from parent pointers, in place.
///
/// Chunked profiles encode the call tree as parent pointers only. Canonical
/// node lists already carry `children` and only the root lacks a parent, so
/// when neither of the first two nodes has one there is nothing to do.
///
/// Only nodes that arrived without a `children` list take appends. A node
/// whose parent already declared children is left unattached rather than
/// merged in — matching how the emitter's own tooling treats this case.
pub fn rebuild_children(nodes: &mut [ProfileNode]) -> Result<(), CallTreeError> {
    if nodes.len() < 2 {
        return Ok(());
    }
    if nodes[0].parent.is_none() && nodes[1].parent.is_none() {
        return Ok(());
    }

    detect_cycles(nodes)?;

    let mut repairable: HashMap<u64, usize> = HashMap::new();
    for (index, node) in nodes.iter().enumerate() {
        if node.children.is_none() {
            repairable.insert(node.id, index);
        }
    }

    for index in 0..nodes.len() {
        let Some(parent_id) = nodes[index].parent else {
            continue;
        };
        let child_id = nodes[index].id;
        match repairable.get(&parent_id) {
            Some(&parent_index) => {
                nodes[parent_index]
                    .children
                    .get_or_insert_with(Vec::new)
                    .push(child_id);
            }
            None => {
                log::debug!(
                    "node {child_id} points at parent {parent_id} with explicit children; left unattached"
                );
            }
        }
    }
    Ok(())
}

/// Walk every parent chain, coloring nodes as visited. Seeing a node that is
/// already on the current chain means the pointers loop.
fn detect_cycles(nodes: &[ProfileNode]) -> Result<(), CallTreeError> {
    let index_of: HashMap<u64, usize> = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id, index))
        .collect();

    // 0 = unvisited, 1 = on the current chain, 2 = known acyclic.
    let mut state = vec![0u8; nodes.len()];
    for start in 0..nodes.len() {
        let mut chain: Vec<usize> = Vec::new();
        let mut at = start;
        loop {
            match state[at] {
                1 => return Err(CallTreeError::CycleDetected(nodes[at].id)),
                2 => break,
                _ => {}
            }
            state[at] = 1;
            chain.push(at);
            let Some(parent_id) = nodes[at].parent else {
                break;
            };
            let Some(&next) = index_of.get(&parent_id) else {
                break;
            };
            at = next;
        }
        for visited in chain {
            state[visited] = 2;
        }
    }
    Ok(())
}
