use crate::util::BitSet;
use thiserror::Error;

/// Why a single build attempt was thrown away. Never leaves the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub(crate) enum AttemptFailure {
    #[error("key #{key} hashes to vertex {vertex} under both functions")]
    SelfLoop { key: usize, vertex: usize },
    #[error("cycle closed at vertex {vertex}")]
    Cycle { vertex: usize },
}

/// Undirected multigraph over `[0, n)`. Every edge carries the value the two
/// endpoint values must sum to, modulo `n`.
///
/// Vertex values are found by walking each connected component from an
/// arbitrary root pinned to 0; that only works when the component is a tree,
/// so any cycle (parallel edges and self-loops included) fails the whole
/// assignment.
#[derive(Debug)]
pub(crate) struct Graph {
    n: usize,
    /// Per vertex: `(neighbor, edge_value)` in insertion order.
    adjacent: Vec<Vec<(usize, usize)>>,
}

impl Graph {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            adjacent: vec![Vec::new(); n],
        }
    }

    #[inline]
    pub fn connect(&mut self, v1: usize, v2: usize, edge_value: usize) {
        self.adjacent[v1].push((v2, edge_value));
        self.adjacent[v2].push((v1, edge_value));
    }

    /// Resolve every vertex so that for each edge `(a, b, e)`:
    /// `(values[a] + values[b]) % n == e`.
    ///
    /// Iterative DFS over `(parent, vertex)` pairs. When a vertex is expanded,
    /// the first adjacency entry pointing back at its parent is the tree edge
    /// and is skipped; any other entry reaching a visited vertex closes a cycle.
    pub fn assign_vertex_values(&self) -> Result<Vec<usize>, AttemptFailure> {
        let n = self.n;
        let mut values = vec![0usize; n];
        let mut visited = BitSet::new(n);
        let mut stack: Vec<(Option<usize>, usize)> = Vec::new();

        for root in 0..n {
            if visited.test(root) {
                continue;
            }
            values[root] = 0;
            stack.push((None, root));

            while let Some((parent, vertex)) = stack.pop() {
                visited.set(vertex);

                let mut skip_parent = parent.is_some();
                for &(neighbor, edge_value) in &self.adjacent[vertex] {
                    if skip_parent && Some(neighbor) == parent {
                        skip_parent = false;
                        continue;
                    }
                    if visited.test(neighbor) {
                        return Err(AttemptFailure::Cycle { vertex: neighbor });
                    }
                    stack.push((Some(vertex), neighbor));
                    // edge_value < n and values[vertex] < n
                    values[neighbor] = (edge_value + n - values[vertex]) % n;
                }
            }
        }

        Ok(values)
    }
}
