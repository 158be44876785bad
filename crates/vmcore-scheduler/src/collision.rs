// Path: crates/vmcore-scheduler/src/collision.rs
//! The collision-clique algorithm (spec.md §4.6): for every chunk, derives
//! the set of request pairs whose declared accesses collide, then verifies
//! that the proposer's DAG contains a directed path between each pair.
//! Verifying *reachability* rather than a direct edge is what generalizes
//! the raw pairwise check into the clique/bipartite rule of spec.md §4.6: a
//! writable run `u -> v -> w` satisfies every pair in the run (`u`-`v`,
//! `v`-`w`, and `u`-`w` via the path through `v`) with only the two direct
//! edges the proposer actually needs to supply.

use std::collections::HashSet;
use vmcore_types::{BlockError, DeclaredAccess, FullID, LongID, LongLongID};

use crate::request::DagNode;

/// One required dependency: the proposer's DAG must contain a path from
/// `lower` to `upper` (`lower < upper`, the convention spec.md §4.6 uses
/// when registering a dependency).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RequiredEdge {
    pub lower: u32,
    pub upper: u32,
}

fn push_required(edges: &mut Vec<RequiredEdge>, a: u32, b: u32) {
    if a == b {
        return;
    }
    let (lower, upper) = if a < b { (a, b) } else { (b, a) };
    edges.push(RequiredEdge { lower, upper });
}

/// Computes every required dependency for one chunk's already-sorted
/// declared-access list (spec.md §4.6): resizing blocks (offset `-1`)
/// against every data block their new size touches, then a sweep over data
/// blocks (offset ≥ 0) using the access-type collision table.
pub(crate) fn required_edges_for_chunk(sorted: &[DeclaredAccess]) -> Vec<RequiredEdge> {
    let mut edges = Vec::new();

    let resizing: Vec<&DeclaredAccess> = sorted.iter().filter(|e| e.offset == -1).collect();
    let data: Vec<&DeclaredAccess> = sorted.iter().filter(|e| e.offset >= 0).collect();

    for resize in &resizing {
        let new_size = resize.new_size.unwrap_or(0);
        for block in &data {
            let collides = if new_size > 0 {
                block.offset < new_size
            } else {
                block.end() > -new_size
            };
            if collides {
                push_required(&mut edges, resize.request_id, block.request_id);
            }
        }
    }

    for i in 0..data.len() {
        let end = data[i].end();
        for later in data.iter().skip(i + 1) {
            if later.offset >= end {
                break;
            }
            if data[i].access_type.collides_with(later.access_type) {
                push_required(&mut edges, data[i].request_id, later.request_id);
            }
        }
    }

    edges
}

/// Whether `to` is reachable from `from` by following adjacency edges
/// forward through `nodes`.
fn reachable(nodes: &[DagNode], from: u32, to: u32) -> bool {
    if from == to {
        return true;
    }
    let mut stack = vec![from];
    let mut visited: HashSet<u32> = HashSet::new();
    visited.insert(from);
    while let Some(u) = stack.pop() {
        let Some(node) = nodes.get(u as usize) else {
            continue;
        };
        for &v in &node.adjacency {
            if v == to {
                return true;
            }
            if visited.insert(v) {
                stack.push(v);
            }
        }
    }
    false
}

/// Verifies every chunk in `merged` against `nodes`' declared adjacency,
/// returning the first missing edge as a `BlockError` (spec.md §4.6, §7).
pub(crate) fn verify_collisions(
    merged: &std::collections::BTreeMap<(LongID, LongLongID), Vec<DeclaredAccess>>,
    nodes: &[DagNode],
) -> Result<(), BlockError> {
    for (&(app, chunk_id), entries) in merged {
        for edge in required_edges_for_chunk(entries) {
            if !reachable(nodes, edge.lower, edge.upper) {
                let full_id = FullID { app, id: chunk_id };
                return Err(BlockError::MissingEdge {
                    a: edge.lower,
                    b: edge.upper,
                    chunk: full_id.to_string(),
                });
            }
        }
    }
    Ok(())
}
