//! Bounded walks over parent/child links stored in relational tables.
//!
//! Parent links (`parent_job_id`, `parent_contract_id`) are plain columns, so
//! nothing but these walks stops a cycle from hanging a traversal. Every walk
//! carries a visited set and a hop limit; when either trips, the walk stops at
//! the last node it reached and reports itself as truncated.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;
use uuid::Uuid;

use crate::contract::SubContract;

/// Default bound on parent/child hops.
pub const DEFAULT_HOP_LIMIT: usize = 10;

// ─── Upward ──────────────────────────────────────────────────────────────────

/// The result of walking parent links from a starting node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ancestry {
  /// Visited nodes, starting node first, root (or last-known node) last.
  pub path:      Vec<Uuid>,
  /// `true` if the walk hit a cycle or the hop limit before reaching a node
  /// without a parent.
  pub truncated: bool,
}

impl Ancestry {
  /// The terminal ancestor, or the last-known node when truncated.
  pub fn root(&self) -> Uuid {
    // `path` always holds at least the starting node.
    self.path.last().copied().unwrap_or_default()
  }

  /// Number of parent hops taken.
  pub fn depth(&self) -> usize { self.path.len().saturating_sub(1) }
}

/// Follow `parent_of` upward from `start` for at most `hop_limit` hops.
pub fn walk_to_root<E>(
  start: Uuid,
  hop_limit: usize,
  mut parent_of: impl FnMut(Uuid) -> Result<Option<Uuid>, E>,
) -> Result<Ancestry, E> {
  let mut path = vec![start];
  let mut seen = HashSet::from([start]);
  let mut current = start;

  loop {
    let Some(parent) = parent_of(current)? else {
      return Ok(Ancestry { path, truncated: false });
    };
    if !seen.insert(parent) {
      tracing::warn!(%start, %current, %parent, "cycle in parent chain");
      return Ok(Ancestry { path, truncated: true });
    }
    if path.len() > hop_limit {
      tracing::warn!(%start, hop_limit, "parent chain exceeds hop limit");
      return Ok(Ancestry { path, truncated: true });
    }
    path.push(parent);
    current = parent;
  }
}

// ─── Downward ────────────────────────────────────────────────────────────────

/// Subcontract edges reachable below a contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descendants {
  /// Edges in breadth-first order.
  pub edges:     Vec<SubContract>,
  pub truncated: bool,
}

/// Breadth-first walk of the subcontract tree under `root`, at most
/// `max_depth` levels deep. Each contract is expanded at most once.
pub fn walk_subcontracts<E>(
  root: Uuid,
  max_depth: usize,
  mut children_of: impl FnMut(Uuid) -> Result<Vec<SubContract>, E>,
) -> Result<Descendants, E> {
  let mut edges = Vec::new();
  let mut truncated = false;
  let mut seen = HashSet::from([root]);
  let mut queue = VecDeque::from([(root, 0usize)]);

  while let Some((contract_id, depth)) = queue.pop_front() {
    for edge in children_of(contract_id)? {
      let child = edge.sub_contract_id;
      if !seen.insert(child) {
        tracing::warn!(%root, %child, "subcontract tree revisits a contract");
        truncated = true;
        continue;
      }
      if depth + 1 > max_depth {
        truncated = true;
        continue;
      }
      queue.push_back((child, depth + 1));
      edges.push(edge);
    }
  }

  Ok(Descendants { edges, truncated })
}

// ─── Repair ──────────────────────────────────────────────────────────────────

/// Find the parent links that close a cycle in `parents` (node → parent).
///
/// Returns the nodes whose parent link should be severed, one per cycle. A
/// parent that is not itself a key is treated as a dangling root.
pub fn cycle_breaks(parents: &HashMap<Uuid, Option<Uuid>>) -> Vec<Uuid> {
  #[derive(Clone, Copy, PartialEq)]
  enum Mark {
    OnPath,
    Done,
  }

  let mut marks: HashMap<Uuid, Mark> = HashMap::with_capacity(parents.len());
  let mut breaks = Vec::new();

  let mut nodes: Vec<Uuid> = parents.keys().copied().collect();
  nodes.sort_unstable();

  for node in nodes {
    let mut path = Vec::new();
    let mut current = node;
    loop {
      match marks.get(&current) {
        Some(Mark::Done) => break,
        Some(Mark::OnPath) => {
          // The last node pushed points back into the current path.
          if let Some(&closing) = path.last() {
            breaks.push(closing);
          }
          break;
        }
        None => {
          marks.insert(current, Mark::OnPath);
          path.push(current);
          match parents.get(&current).copied().flatten() {
            Some(parent) if parents.contains_key(&parent) => current = parent,
            _ => break,
          }
        }
      }
    }
    for visited in path {
      marks.insert(visited, Mark::Done);
    }
  }

  breaks
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::commission::CommissionType;

  fn ids(n: usize) -> Vec<Uuid> {
    let mut v: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
    v.sort_unstable();
    v
  }

  fn lookup(
    parents: &HashMap<Uuid, Option<Uuid>>,
  ) -> impl FnMut(Uuid) -> Result<Option<Uuid>, ()> + '_ {
    move |id| Ok(parents.get(&id).copied().flatten())
  }

  #[test]
  fn walk_reaches_root() {
    let n = ids(3);
    let parents = HashMap::from([
      (n[0], Some(n[1])),
      (n[1], Some(n[2])),
      (n[2], None),
    ]);
    let a = walk_to_root(n[0], DEFAULT_HOP_LIMIT, lookup(&parents)).unwrap();
    assert_eq!(a.root(), n[2]);
    assert_eq!(a.depth(), 2);
    assert!(!a.truncated);
  }

  #[test]
  fn walk_from_root_is_trivial() {
    let n = ids(1);
    let parents = HashMap::from([(n[0], None)]);
    let a = walk_to_root(n[0], DEFAULT_HOP_LIMIT, lookup(&parents)).unwrap();
    assert_eq!(a.path, vec![n[0]]);
    assert_eq!(a.root(), n[0]);
  }

  #[test]
  fn walk_stops_on_cycle_without_revisiting() {
    let n = ids(3);
    let parents = HashMap::from([
      (n[0], Some(n[1])),
      (n[1], Some(n[2])),
      (n[2], Some(n[0])),
    ]);
    let a = walk_to_root(n[0], DEFAULT_HOP_LIMIT, lookup(&parents)).unwrap();
    assert!(a.truncated);
    assert_eq!(a.path, vec![n[0], n[1], n[2]]);
    let unique: HashSet<_> = a.path.iter().collect();
    assert_eq!(unique.len(), a.path.len());
  }

  #[test]
  fn walk_stops_at_hop_limit_with_last_known_node() {
    let n = ids(6);
    let parents: HashMap<_, _> = n
      .iter()
      .enumerate()
      .map(|(i, id)| (*id, n.get(i + 1).copied()))
      .collect();
    let a = walk_to_root(n[0], 3, lookup(&parents)).unwrap();
    assert!(a.truncated);
    assert_eq!(a.depth(), 3);
    assert_eq!(a.root(), n[3]);
  }

  #[test]
  fn walk_propagates_lookup_errors() {
    let start = Uuid::new_v4();
    let result = walk_to_root(start, 5, |_| Err::<Option<Uuid>, _>("db down"));
    assert_eq!(result, Err("db down"));
  }

  fn edge(parent: Uuid, child: Uuid, split: i64) -> SubContract {
    SubContract {
      id: Uuid::new_v4(),
      root_contract_id: parent,
      parent_contract_id: parent,
      sub_contract_id: child,
      reshared_job_id: Uuid::new_v4(),
      split_percentage: 100.0,
      split_amount: split,
      commission_type: CommissionType::Percentage,
      platform_commission_percent: 0.0,
      platform_commission_amount: 0,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn descendants_are_breadth_first_and_bounded() {
    let n = ids(4);
    let tree = HashMap::from([
      (n[0], vec![edge(n[0], n[1], 10), edge(n[0], n[2], 20)]),
      (n[1], vec![edge(n[1], n[3], 5)]),
    ]);
    let children = |id: Uuid| Ok::<_, ()>(tree.get(&id).cloned().unwrap_or_default());

    let all = walk_subcontracts(n[0], DEFAULT_HOP_LIMIT, children).unwrap();
    let order: Vec<_> = all.edges.iter().map(|e| e.sub_contract_id).collect();
    assert_eq!(order, vec![n[1], n[2], n[3]]);
    assert!(!all.truncated);

    let shallow = walk_subcontracts(n[0], 1, children).unwrap();
    assert_eq!(shallow.edges.len(), 2);
    assert!(shallow.truncated);
  }

  #[test]
  fn descendants_ignore_back_edges() {
    let n = ids(2);
    let tree = HashMap::from([
      (n[0], vec![edge(n[0], n[1], 10)]),
      (n[1], vec![edge(n[1], n[0], 10)]),
    ]);
    let d = walk_subcontracts(n[0], DEFAULT_HOP_LIMIT, |id| {
      Ok::<_, ()>(tree.get(&id).cloned().unwrap_or_default())
    })
    .unwrap();
    assert_eq!(d.edges.len(), 1);
    assert!(d.truncated);
  }

  #[test]
  fn cycle_breaks_finds_one_edge_per_cycle() {
    let n = ids(6);
    let parents = HashMap::from([
      // cycle a: 0 -> 1 -> 2 -> 0
      (n[0], Some(n[1])),
      (n[1], Some(n[2])),
      (n[2], Some(n[0])),
      // tail into cycle a
      (n[3], Some(n[0])),
      // self loop
      (n[4], Some(n[4])),
      // healthy root
      (n[5], None),
    ]);
    let mut breaks = cycle_breaks(&parents);
    breaks.sort_unstable();
    assert_eq!(breaks, vec![n[2], n[4]]);

    // After severing, no cycles remain.
    let mut repaired = parents.clone();
    for b in &breaks {
      repaired.insert(*b, None);
    }
    assert!(cycle_breaks(&repaired).is_empty());
  }

  #[test]
  fn dangling_parents_are_roots() {
    let n = ids(2);
    let parents = HashMap::from([(n[0], Some(n[1]))]);
    assert!(cycle_breaks(&parents).is_empty());
  }
}
