use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};

use crate::{
    errors::GraphBenchError,
    store::{EntityHandle, UnitOfWork},
};

/// Targets of the relationships leaving `node`.
pub fn outgoing<U: UnitOfWork>(
    uow: &U,
    node: EntityHandle,
) -> Result<Vec<EntityHandle>, GraphBenchError> {
    Ok(uow
        .relationships(node)?
        .into_iter()
        .filter(|rel| rel.from_id == node.id())
        .map(|rel| EntityHandle::new(rel.to_id))
        .collect())
}

/// Entities reachable from `start` in at most `max_depth` outgoing hops, in
/// breadth-first order, `start` included.
pub fn bfs_neighbors<U: UnitOfWork>(
    uow: &U,
    start: EntityHandle,
    max_depth: u32,
) -> Result<Vec<EntityHandle>, GraphBenchError> {
    let start = uow.get_entity(start.id())?;
    let mut visited = Vec::new();
    let mut seen = AHashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back((start, 0));
    seen.insert(start);
    while let Some((node, depth)) = queue.pop_front() {
        visited.push(node);
        if depth >= max_depth {
            continue;
        }
        for next in outgoing(uow, node)? {
            if seen.insert(next) {
                queue.push_back((next, depth + 1));
            }
        }
    }
    Ok(visited)
}

/// Fewest-hop outgoing path from `start` to `end`, both ends included.
pub fn shortest_path<U: UnitOfWork>(
    uow: &U,
    start: EntityHandle,
    end: EntityHandle,
) -> Result<Option<Vec<EntityHandle>>, GraphBenchError> {
    let start = uow.get_entity(start.id())?;
    let end = uow.get_entity(end.id())?;
    if start == end {
        return Ok(Some(vec![start]));
    }
    let mut queue = VecDeque::new();
    let mut parents = AHashMap::new();
    let mut seen = AHashSet::new();
    queue.push_back(start);
    seen.insert(start);
    'search: while let Some(node) = queue.pop_front() {
        for next in outgoing(uow, node)? {
            if seen.insert(next) {
                parents.insert(next, node);
                if next == end {
                    break 'search;
                }
                queue.push_back(next);
            }
        }
    }
    if !parents.contains_key(&end) {
        return Ok(None);
    }
    let mut path = vec![end];
    let mut current = end;
    while let Some(&parent) = parents.get(&current) {
        path.push(parent);
        current = parent;
    }
    path.reverse();
    Ok(Some(path))
}
