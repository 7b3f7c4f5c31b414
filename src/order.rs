//! The weak partial ordering and its query surface.
//!
//! `WeakPartialOrdering::new` runs the depth-first pass and the component
//! constructor, then freezes the result. Everything afterwards is
//! read-only: the ordering can be shared across threads and queried
//! concurrently, and must be rebuilt from scratch if the source graph
//! changes.
//!
//! # Traversal contract
//!
//! Clients walk successor/predecessor links, never array positions. A
//! Head's successors are its loop-body entries; the loop's Exit is
//! reached through [`exit_of_head`](WeakPartialOrdering::exit_of_head)
//! (a bodyless self-loop has no other path to it). Each Exit carries one
//! closing successor edge back to its Head, the only cycle in the
//! structure, which a fixpoint engine follows while the component is
//! unstable and skips once it stabilizes. Widening is required wherever
//! `num_reducible_predecessors < num_predecessors`, and at every entry
//! recorded in a non-empty [`irreducibles`](WeakPartialOrdering::irreducibles)
//! map.

use rustc_hash::{FxHashMap, FxHashSet};
use std::hash::Hash;

use crate::builder;
use crate::dfs::{Dfn, DfsTables};
use crate::graph::FlowGraph;
use crate::vertex::{Vertex, VertexId, VertexKind};

// =============================================================================
// ConstructionStats
// =============================================================================

/// Counters collected while building an ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstructionStats {
    /// Reachable nodes.
    pub nodes: u32,
    /// Edges enumerated by the adapter (duplicates included).
    pub edges: u32,
    /// First-discovery edges.
    pub tree_edges: u32,
    /// Edges into a still-open ancestor (loop-head markers).
    pub back_edges: u32,
    /// Edges into an already-finished node, attributed to an LCA.
    pub cross_forward_edges: u32,
    /// Synthesized Head/Exit pairs.
    pub heads: u32,
    /// Edges that enter a loop without passing through its head.
    pub irreducible_entries: u32,
}

// =============================================================================
// WeakPartialOrdering
// =============================================================================

/// Immutable weak partial ordering over a single-entry flow graph.
#[derive(Debug, Clone)]
pub struct WeakPartialOrdering<N> {
    vertices: Vec<Vertex<N>>,
    entry: VertexId,
    /// DFN for each reachable node, for node-keyed queries.
    dfn_of: FxHashMap<N, Dfn>,
    /// Entry vertex per DFN (slot 0 unused).
    entry_vertex: Vec<VertexId>,
    /// `(head DFN, predecessor DFN)` pairs, kept for diagnostics.
    back_edges: FxHashSet<(Dfn, Dfn)>,
    stats: ConstructionStats,
}

impl<N: Copy + Eq + Hash> WeakPartialOrdering<N> {
    /// Build the ordering for the reachable subgraph of `graph`.
    ///
    /// Linear in reachable nodes plus edges. Panics if the graph violates
    /// the single-entry precondition; unreachable nodes are silently
    /// excluded.
    pub fn new<G: FlowGraph<Node = N>>(graph: &G) -> Self {
        let mut tables = DfsTables::build(graph);

        let back_edges: FxHashSet<(Dfn, Dfn)> = tables
            .back_preds
            .iter()
            .enumerate()
            .flat_map(|(head, preds)| preds.iter().map(move |&p| (head as Dfn, p)))
            .collect();
        let dfn_of = std::mem::take(&mut tables.dfn_of);

        let mut stats = ConstructionStats {
            nodes: tables.len() as u32,
            edges: tables.tree_edges + tables.back_edges + tables.cross_forward_edges,
            tree_edges: tables.tree_edges,
            back_edges: tables.back_edges,
            cross_forward_edges: tables.cross_forward_edges,
            heads: 0,
            irreducible_entries: 0,
        };

        let built = builder::construct(tables);
        stats.heads = built.heads;
        stats.irreducible_entries = built.irreducible_entries;

        WeakPartialOrdering {
            vertices: built.vertices,
            entry: built.entry,
            dfn_of,
            entry_vertex: built.entry_vertex,
            back_edges,
            stats,
        }
    }

    // =========================================================================
    // Whole-ordering queries
    // =========================================================================

    /// Number of vertices. Valid indices are `0..size()`.
    #[inline]
    pub fn size(&self) -> usize {
        self.vertices.len()
    }

    /// The outermost component's entry vertex; always the last index.
    #[inline]
    pub fn entry(&self) -> VertexId {
        self.entry
    }

    /// Iterate all vertex ids in construction order (innermost first).
    pub fn indices(&self) -> impl Iterator<Item = VertexId> {
        (0..self.vertices.len() as u32).map(VertexId::new)
    }

    /// Construction counters.
    #[inline]
    pub fn stats(&self) -> &ConstructionStats {
        &self.stats
    }

    // =========================================================================
    // Per-vertex queries
    // =========================================================================

    /// The original node wrapped by `idx`.
    #[inline]
    pub fn node(&self, idx: VertexId) -> N {
        self.vertices[idx.as_usize()].node
    }

    /// Classification of `idx`.
    #[inline]
    pub fn kind(&self, idx: VertexId) -> VertexKind {
        self.vertices[idx.as_usize()].kind
    }

    /// Check if `idx` wraps a non-head node.
    #[inline]
    pub fn is_plain(&self, idx: VertexId) -> bool {
        self.kind(idx) == VertexKind::Plain
    }

    /// Check if `idx` is the entry half of a loop pair.
    #[inline]
    pub fn is_head(&self, idx: VertexId) -> bool {
        self.kind(idx) == VertexKind::Head
    }

    /// Check if `idx` is the closing half of a loop pair.
    #[inline]
    pub fn is_exit(&self, idx: VertexId) -> bool {
        self.kind(idx) == VertexKind::Exit
    }

    /// Ordered successor vertices of `idx`.
    #[inline]
    pub fn successors(&self, idx: VertexId) -> &[VertexId] {
        &self.vertices[idx.as_usize()].successors
    }

    /// Predecessor vertices of `idx` (deduplicated; see
    /// [`num_predecessors`](Self::num_predecessors) for edge counts).
    #[inline]
    pub fn predecessors(&self, idx: VertexId) -> &[VertexId] {
        &self.vertices[idx.as_usize()].predecessors
    }

    /// Total count of incoming original edges.
    #[inline]
    pub fn num_predecessors(&self, idx: VertexId) -> u32 {
        self.vertices[idx.as_usize()].num_preds
    }

    /// Count of incoming edges that do not bypass a loop head. The gap to
    /// [`num_predecessors`](Self::num_predecessors) is the number of
    /// incoming edges needing extra fixpoint care at this vertex.
    #[inline]
    pub fn num_reducible_predecessors(&self, idx: VertexId) -> u32 {
        self.vertices[idx.as_usize()].num_reducible_preds
    }

    /// Post-order number of the wrapped node (Head and Exit report the
    /// same number as their node).
    #[inline]
    pub fn post_order(&self, idx: VertexId) -> u32 {
        self.vertices[idx.as_usize()].post_order
    }

    /// Component size: 1 for Plain, `2 + Σ size(direct nested
    /// components)` for a loop pair.
    #[inline]
    pub fn component_size(&self, idx: VertexId) -> u32 {
        self.vertices[idx.as_usize()].size
    }

    // =========================================================================
    // Pairing and irreducibility
    // =========================================================================

    /// The Head paired with an Exit.
    pub fn head_of_exit(&self, idx: VertexId) -> VertexId {
        assert!(self.is_exit(idx), "head_of_exit on non-exit vertex {idx}");
        self.vertices[idx.as_usize()].partner
    }

    /// The Exit paired with a Head.
    pub fn exit_of_head(&self, idx: VertexId) -> VertexId {
        assert!(self.is_head(idx), "exit_of_head on non-head vertex {idx}");
        self.vertices[idx.as_usize()].partner
    }

    /// Irreducible entries of an Exit's loop: vertex index to count of
    /// edges entering it from outside without passing through the Head.
    pub fn irreducibles(&self, idx: VertexId) -> &FxHashMap<VertexId, u32> {
        assert!(self.is_exit(idx), "irreducibles on non-exit vertex {idx}");
        &self.vertices[idx.as_usize()].irreducibles
    }

    // =========================================================================
    // Node-keyed queries
    // =========================================================================

    /// The vertex wrapping `node`: its Plain vertex, or the Head of its
    /// pair. `None` for nodes unreachable from the entry.
    pub fn vertex_of(&self, node: N) -> Option<VertexId> {
        let dfn = *self.dfn_of.get(&node)?;
        Some(self.entry_vertex[dfn as usize])
    }

    /// Diagnostic: was `pred_node -> head_node` classified as a back edge?
    pub fn is_back_edge(&self, head_node: N, pred_node: N) -> bool {
        let (Some(&head), Some(&pred)) = (self.dfn_of.get(&head_node), self.dfn_of.get(&pred_node))
        else {
            return false;
        };
        self.back_edges.contains(&(head, pred))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AdjacencyGraph;

    #[test]
    fn test_smoke_chain() {
        let mut g = AdjacencyGraph::new(3, 0);
        g.add_edge(0, 1);
        g.add_edge(1, 2);

        let wpo = WeakPartialOrdering::new(&g);
        assert_eq!(wpo.size(), 3);
        assert_eq!(wpo.entry().as_usize(), 2);
        assert_eq!(wpo.node(wpo.entry()), 0);
        assert_eq!(wpo.stats().tree_edges, 2);
        assert_eq!(wpo.stats().heads, 0);
    }

    #[test]
    fn test_vertex_of_reachability() {
        let mut g = AdjacencyGraph::new(3, 0);
        g.add_edge(0, 1);

        let wpo = WeakPartialOrdering::new(&g);
        assert!(wpo.vertex_of(0).is_some());
        assert!(wpo.vertex_of(1).is_some());
        assert_eq!(wpo.vertex_of(2), None);
    }

    #[test]
    fn test_is_back_edge_diagnostic() {
        let mut g = AdjacencyGraph::new(3, 0);
        g.add_edge(0, 1);
        g.add_edge(1, 2);
        g.add_edge(2, 1);

        let wpo = WeakPartialOrdering::new(&g);
        assert!(wpo.is_back_edge(1, 2));
        assert!(!wpo.is_back_edge(2, 1));
        assert!(!wpo.is_back_edge(0, 1));
    }

    #[test]
    #[should_panic]
    fn test_exit_of_head_on_plain_panics() {
        let g = AdjacencyGraph::new(1, 0);
        let wpo = WeakPartialOrdering::new(&g);
        wpo.exit_of_head(wpo.entry());
    }
}
