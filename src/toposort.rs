//! Dependency ordering for inclusions.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// The dependency relation contains a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError<N> {
  /// Nodes along the cycle; the first node is repeated at the end.
  pub cycle: Vec<N>,
}

impl<N: fmt::Display> fmt::Display for CycleError<N> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("dependency cycle: ")?;
    for (index, node) in self.cycle.iter().enumerate() {
      if index > 0 {
        f.write_str(" -> ")?;
      }
      write!(f, "{node}")?;
    }
    Ok(())
  }
}

impl<N: fmt::Debug + fmt::Display> std::error::Error for CycleError<N> {}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
  Visiting,
  Done,
}

/// Order `nodes` so every node comes after all of its transitive dependencies.
///
/// Nodes only reachable as dependencies are part of the output. Traversal is a depth-first
/// walk in input order, visiting dependencies in the order `dependencies` yields them, so a
/// fixed input always produces the same sequence.
pub fn topological_sort<N, F, I>(
  nodes: impl IntoIterator<Item = N>,
  mut dependencies: F,
) -> Result<Vec<N>, CycleError<N>>
where
  N: Clone + Eq + Hash,
  F: FnMut(&N) -> I,
  I: IntoIterator<Item = N>,
{
  let mut marks: HashMap<N, Mark> = HashMap::new();
  let mut path: Vec<N> = Vec::new();
  let mut ordered = Vec::new();

  for node in nodes {
    visit(node, &mut dependencies, &mut marks, &mut path, &mut ordered)?;
  }

  Ok(ordered)
}

fn visit<N, F, I>(
  node: N,
  dependencies: &mut F,
  marks: &mut HashMap<N, Mark>,
  path: &mut Vec<N>,
  ordered: &mut Vec<N>,
) -> Result<(), CycleError<N>>
where
  N: Clone + Eq + Hash,
  F: FnMut(&N) -> I,
  I: IntoIterator<Item = N>,
{
  match marks.get(&node) {
    Some(Mark::Done) => return Ok(()),
    Some(Mark::Visiting) => {
      let start = path.iter().position(|entry| entry == &node).unwrap_or(0);
      let mut cycle = path[start..].to_vec();
      cycle.push(node);
      return Err(CycleError { cycle });
    }
    None => {}
  }

  marks.insert(node.clone(), Mark::Visiting);
  path.push(node.clone());

  let direct: Vec<N> = dependencies(&node).into_iter().collect();
  for dependency in direct {
    visit(dependency, dependencies, marks, path, ordered)?;
  }

  path.pop();
  marks.insert(node.clone(), Mark::Done);
  ordered.push(node);
  Ok(())
}
