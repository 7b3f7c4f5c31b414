//! Bottom-up component construction.
//!
//! Consumes the depth-first tables and emits the vertex arena. Head
//! candidates are processed in strictly decreasing DFN order, so every
//! nested loop is finalized before the loop that encloses it:
//!
//! 1. Cross/forward edges parked at the candidate's DFN are re-homed to
//!    the current representative of their original target.
//! 2. The candidate's back-edge sources, mapped through representatives
//!    and expanded backward along non-back predecessors (stopping at the
//!    candidate), form the nested components of its loop.
//! 3. A candidate with no back edges becomes a Plain vertex.
//! 4. Otherwise an Exit/Head pair is synthesized and the component is
//!    wired: one closing Exit→Head edge, one edge from each back-edge
//!    source's exit into the new Exit, and every member's homed edge
//!    retargeted to the member's entry vertex. An edge whose original
//!    target is not the canonical head of the component it folded into
//!    entered that loop without passing its head; the fold target's Exit
//!    counts it as irreducible, keyed by the literal target's entry
//!    vertex.
//! 5. The component contracts into the candidate, which becomes the
//!    canonical DFN of the merged set.
//!
//! Surviving representatives are top-level components and are wired with
//! the same rule afterwards. Vertices are published in synthesis order,
//! so the entry component's vertex is always the last slot.

use crate::dfs::{Dfn, DfsTables};
use crate::union_find::UnionFind;
use crate::vertex::{Vertex, VertexId, VertexKind};

// =============================================================================
// Construction output
// =============================================================================

pub(crate) struct Construction<N> {
    pub vertices: Vec<Vertex<N>>,
    /// Entry vertex (Plain or Head) per DFN; the vertex wrapping that node.
    pub entry_vertex: Vec<VertexId>,
    /// Index of the outermost component's entry vertex.
    pub entry: VertexId,
    pub heads: u32,
    pub irreducible_entries: u32,
}

/// Build the vertex arena from the depth-first tables.
pub(crate) fn construct<N: Copy>(tables: DfsTables<N>) -> Construction<N> {
    Constructor::new(tables).run()
}

// =============================================================================
// Constructor
// =============================================================================

struct Constructor<N> {
    tables: DfsTables<N>,
    /// Union-find over DFNs tracking contracted components.
    sets: UnionFind,
    /// Canonical DFN of each set, read through `find`.
    canonical: Vec<Dfn>,
    /// Entry (Plain or Head) and exit (Plain or Exit) vertex per DFN;
    /// only meaningful at canonical DFNs.
    entry_vertex: Vec<VertexId>,
    exit_vertex: Vec<VertexId>,
    /// Component-membership stamp for the expansion worklist; stamping
    /// with the candidate DFN makes resets free.
    stamp: Vec<Dfn>,
    vertices: Vec<Vertex<N>>,
    heads: u32,
    irreducible_entries: u32,
}

impl<N: Copy> Constructor<N> {
    fn new(tables: DfsTables<N>) -> Self {
        let n = tables.len();
        assert!(n > 0, "flow graph has no reachable nodes");
        Constructor {
            tables,
            sets: UnionFind::new(n + 1),
            canonical: (0..=n as Dfn).collect(),
            entry_vertex: vec![VertexId::INVALID; n + 1],
            exit_vertex: vec![VertexId::INVALID; n + 1],
            stamp: vec![0; n + 1],
            vertices: Vec::with_capacity(n),
            heads: 0,
            irreducible_entries: 0,
        }
    }

    fn run(mut self) -> Construction<N> {
        let n = self.tables.len() as Dfn;

        for h in (1..=n).rev() {
            self.restore_cross_forwards(h);
            let nested = self.collect_nested(h);
            if self.tables.back_preds[h as usize].is_empty() {
                let id = self.push_vertex(Vertex::new(
                    self.tables.node(h),
                    VertexKind::Plain,
                    self.tables.post_dfn[h as usize],
                    1,
                ));
                self.entry_vertex[h as usize] = id;
                self.exit_vertex[h as usize] = id;
                continue;
            }
            self.build_component(h, &nested);
        }

        // Top-level pass: wire the components that survived contraction.
        for d in 1..=n {
            if self.rep(d) == d {
                self.wire_homed_edges(d);
            }
        }

        // Single-entry contract: the entry node's component must own
        // itself, and its entry vertex is the last one synthesized.
        assert!(
            self.rep(1) == 1,
            "flow graph violates the single-entry precondition"
        );
        let entry = self.entry_vertex[1];
        assert!(
            entry.as_usize() == self.vertices.len() - 1,
            "entry vertex must be the last in construction order"
        );

        Construction {
            vertices: self.vertices,
            entry_vertex: self.entry_vertex,
            entry,
            heads: self.heads,
            irreducible_entries: self.irreducible_entries,
        }
    }

    /// Current canonical DFN of the component containing `d`.
    #[inline]
    fn rep(&mut self, d: Dfn) -> Dfn {
        self.canonical[self.sets.find(d) as usize]
    }

    /// Step 1: re-home cross/forward edges whose LCA is `h` to the
    /// current representative of their original target.
    fn restore_cross_forwards(&mut self, h: Dfn) {
        let parked = std::mem::take(&mut self.tables.cross_fwds[h as usize]);
        for (origin, target) in parked {
            let home = self.rep(target);
            self.tables.non_back_preds[home as usize].push((origin, target));
        }
    }

    /// Step 2: the nested components of `h`'s loop: back-edge source
    /// representatives, expanded backward through non-back predecessors
    /// until closure, never crossing `h` itself.
    fn collect_nested(&mut self, h: Dfn) -> Vec<Dfn> {
        let mut nested: Vec<Dfn> = Vec::new();
        for i in 0..self.tables.back_preds[h as usize].len() {
            let p = self.tables.back_preds[h as usize][i];
            let rep = self.rep(p);
            if rep != h && self.stamp[rep as usize] != h {
                self.stamp[rep as usize] = h;
                nested.push(rep);
            }
        }
        let mut cursor = 0;
        while cursor < nested.len() {
            let member = nested[cursor];
            cursor += 1;
            for i in 0..self.tables.non_back_preds[member as usize].len() {
                let (origin, _) = self.tables.non_back_preds[member as usize][i];
                let rep = self.rep(origin);
                if rep != h && self.stamp[rep as usize] != h {
                    self.stamp[rep as usize] = h;
                    nested.push(rep);
                }
            }
        }
        nested
    }

    /// Steps 4 and 5: synthesize the Exit/Head pair for head `h`, wire
    /// its component and contract it.
    fn build_component(&mut self, h: Dfn, nested: &[Dfn]) {
        self.heads += 1;
        let size: u32 = 2 + nested
            .iter()
            .map(|&rep| self.vertices[self.entry_vertex[rep as usize].as_usize()].size)
            .sum::<u32>();
        let node = self.tables.node(h);
        let post_order = self.tables.post_dfn[h as usize];
        let exit = self.push_vertex(Vertex::new(node, VertexKind::Exit, post_order, size));
        let head = self.push_vertex(Vertex::new(node, VertexKind::Head, post_order, size));
        self.vertices[exit.as_usize()].partner = head;
        self.vertices[head.as_usize()].partner = exit;

        // Until contraction completes, the Head stands as the component's
        // exit representative: edges leaving the head reach the body
        // through the Head vertex.
        self.entry_vertex[h as usize] = head;
        self.exit_vertex[h as usize] = head;

        // The closing edge. It is the Head's one non-reducible
        // predecessor and the only sanctioned cycle in the result.
        self.add_edge(exit, head, false);

        // Back-edge sources close the loop into the Exit. A self back
        // edge is already represented by the closing edge.
        let back_preds = std::mem::take(&mut self.tables.back_preds[h as usize]);
        for (i, &p) in back_preds.iter().enumerate() {
            if back_preds[..i].contains(&p) {
                continue;
            }
            let rep = self.rep(p);
            if rep != h {
                self.add_edge(self.exit_vertex[rep as usize], exit, true);
            }
        }

        for &member in nested {
            self.wire_homed_edges(member);
        }

        // Contract the loop into `h`.
        for &member in nested {
            self.sets.union(h, member);
        }
        let root = self.sets.find(h);
        self.canonical[root as usize] = h;
        self.exit_vertex[h as usize] = exit;
    }

    /// Wire the homed non-back predecessor edges of the component `home`.
    ///
    /// Every edge retargets to the component's entry vertex. An edge
    /// whose original target is not `home` itself folded into a loop past
    /// its head: the component's Exit counts it as irreducible under the
    /// literal target's entry vertex.
    fn wire_homed_edges(&mut self, home: Dfn) {
        let homed = std::mem::take(&mut self.tables.non_back_preds[home as usize]);
        for (i, &(origin, target)) in homed.iter().enumerate() {
            // Idempotent on the original (origin, target) pair: adapter
            // duplicates never double-count.
            if homed[..i].contains(&(origin, target)) {
                continue;
            }
            let origin_rep = self.rep(origin);
            let from = self.exit_vertex[origin_rep as usize];
            let to = self.entry_vertex[home as usize];
            let reducible = target == home;
            self.add_edge(from, to, reducible);
            if !reducible {
                let exit = self.exit_vertex[home as usize];
                debug_assert_eq!(self.vertices[exit.as_usize()].kind, VertexKind::Exit);
                let key = self.entry_vertex[target as usize];
                *self.vertices[exit.as_usize()]
                    .irreducibles
                    .entry(key)
                    .or_insert(0) += 1;
                self.irreducible_entries += 1;
            }
        }
    }

    /// Append a vertex and return its id.
    fn push_vertex(&mut self, vertex: Vertex<N>) -> VertexId {
        let id = VertexId::new(self.vertices.len() as u32);
        self.vertices.push(vertex);
        id
    }

    /// Insert a vertex edge. The successor/predecessor lists stay
    /// deduplicated; the predecessor counts track original edges, so a
    /// fold of two distinct edges onto one vertex edge still counts
    /// twice.
    fn add_edge(&mut self, from: VertexId, to: VertexId, reducible: bool) {
        debug_assert!(from.is_valid() && to.is_valid());
        if !self.vertices[from.as_usize()].successors.contains(&to) {
            self.vertices[from.as_usize()].successors.push(to);
            self.vertices[to.as_usize()].predecessors.push(from);
        }
        let target = &mut self.vertices[to.as_usize()];
        target.num_preds += 1;
        if reducible {
            target.num_reducible_preds += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfs::DfsTables;
    use crate::graph::AdjacencyGraph;

    fn build(g: &AdjacencyGraph) -> Construction<u32> {
        construct(DfsTables::build(g))
    }

    #[test]
    fn test_single_node() {
        let g = AdjacencyGraph::new(1, 0);
        let c = build(&g);
        assert_eq!(c.vertices.len(), 1);
        assert_eq!(c.vertices[0].kind, VertexKind::Plain);
        assert_eq!(c.entry, VertexId::new(0));
        assert_eq!(c.heads, 0);
    }

    #[test]
    fn test_chain_wiring() {
        let mut g = AdjacencyGraph::new(3, 0);
        g.add_edge(0, 1);
        g.add_edge(1, 2);

        let c = build(&g);
        assert_eq!(c.vertices.len(), 3);
        // Synthesis order is decreasing DFN: node 2, node 1, node 0.
        let (v2, v1, v0) = (VertexId::new(0), VertexId::new(1), VertexId::new(2));
        assert_eq!(c.entry, v0);
        assert_eq!(c.vertices[v0.as_usize()].successors.as_slice(), &[v1]);
        assert_eq!(c.vertices[v1.as_usize()].successors.as_slice(), &[v2]);
        assert!(c.vertices[v2.as_usize()].successors.is_empty());
    }

    #[test]
    fn test_self_loop_pair() {
        let mut g = AdjacencyGraph::new(1, 0);
        g.add_edge(0, 0);

        let c = build(&g);
        assert_eq!(c.vertices.len(), 2);
        let (exit, head) = (VertexId::new(0), VertexId::new(1));
        assert_eq!(c.vertices[exit.as_usize()].kind, VertexKind::Exit);
        assert_eq!(c.vertices[head.as_usize()].kind, VertexKind::Head);
        assert_eq!(c.vertices[exit.as_usize()].partner, head);
        assert_eq!(c.vertices[head.as_usize()].partner, exit);
        assert_eq!(c.vertices[exit.as_usize()].successors.as_slice(), &[head]);
        assert_eq!(c.vertices[exit.as_usize()].size, 2);
        assert_eq!(c.vertices[head.as_usize()].size, 2);
        assert!(c.vertices[exit.as_usize()].irreducibles.is_empty());
        assert_eq!(c.entry, head);
        assert_eq!(c.heads, 1);
    }

    #[test]
    fn test_duplicate_edges_count_once() {
        let mut g = AdjacencyGraph::new(2, 0);
        g.add_edge(0, 1);
        g.add_edge(0, 1);

        let c = build(&g);
        let target = VertexId::new(0);
        assert_eq!(c.vertices[target.as_usize()].num_preds, 1);
        assert_eq!(c.vertices[target.as_usize()].num_reducible_preds, 1);
    }
}
