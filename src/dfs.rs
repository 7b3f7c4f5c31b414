//! Iterative depth-first pass over the reachable subgraph.
//!
//! One traversal produces everything the component constructor needs:
//! - 1-based discovery numbers (DFN) and completion (post-order) numbers;
//! - every edge classified as tree, back, or cross/forward;
//! - cross/forward edges filed under the lowest common ancestor of their
//!   endpoints, computed online with union-find ancestor labels.
//!
//! The traversal uses an explicit frame stack rather than recursion so
//! that graph depth never threatens the call stack. Successors are pushed
//! in reverse and classified when their frame pops, which makes the
//! processing order identical to a forward recursive walk: a popped node
//! without a DFN is a tree edge; one that is still open on the DFS path
//! is a back edge (its target is a loop-head candidate); one that already
//! finished is a cross/forward edge.
//!
//! Non-back predecessor records keep both the origin DFN and the original
//! target DFN. Re-attribution during construction moves a record between
//! component representatives, and irreducibility accounting needs the
//! literal successor the edge was aimed at.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::graph::FlowGraph;
use crate::union_find::UnionFind;

/// 1-based depth-first discovery number. Zero means "not visited".
pub(crate) type Dfn = u32;

/// A non-back predecessor record: `(origin DFN, original target DFN)`.
pub(crate) type PredEdge = (Dfn, Dfn);

// =============================================================================
// DfsTables
// =============================================================================

/// Per-DFN tables produced by the depth-first pass.
///
/// All DFN-indexed vectors reserve slot 0 for the "not visited" sentinel.
pub(crate) struct DfsTables<N> {
    /// Reachable node for each DFN (slot `dfn - 1`).
    pub nodes: Vec<N>,
    /// DFN for each reachable node.
    pub dfn_of: FxHashMap<N, Dfn>,
    /// Post-order number per DFN; zero while the node is still open.
    pub post_dfn: Vec<u32>,
    /// Back-edge source DFNs per target DFN.
    pub back_preds: Vec<Vec<Dfn>>,
    /// Non-back predecessor edges homed at their current attribution
    /// target. Starts out as the tree edge of each node; the constructor
    /// re-homes cross/forward edges here as components contract.
    pub non_back_preds: Vec<Vec<PredEdge>>,
    /// Cross/forward edges filed under their LCA DFN.
    pub cross_fwds: Vec<Vec<PredEdge>>,
    /// Edge-class tallies: tree, back, cross/forward.
    pub tree_edges: u32,
    pub back_edges: u32,
    pub cross_forward_edges: u32,
}

impl<N: Copy> DfsTables<N> {
    /// Number of reachable nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// The node wrapped by `dfn`.
    #[inline]
    pub fn node(&self, dfn: Dfn) -> N {
        self.nodes[dfn as usize - 1]
    }
}

impl<N: Copy + Eq + std::hash::Hash> DfsTables<N> {
    /// Run the depth-first pass from the graph's entry node.
    pub fn build<G: FlowGraph<Node = N>>(graph: &G) -> Self {
        let mut tables = DfsTables {
            nodes: Vec::new(),
            dfn_of: FxHashMap::default(),
            post_dfn: vec![0],
            back_preds: vec![Vec::new()],
            non_back_preds: vec![Vec::new()],
            cross_fwds: vec![Vec::new()],
            tree_edges: 0,
            back_edges: 0,
            cross_forward_edges: 0,
        };

        // Union-find over DFNs, with one ancestor label per set: the
        // deepest still-open ancestor that absorbed the set. Querying it
        // at the moment a cross/forward edge is seen yields the LCA of
        // the edge's endpoints.
        let mut sets = UnionFind::new(1);
        let mut ancestor: Vec<Dfn> = vec![0];

        let mut stack = vec![Frame::Enter(graph.entry(), 0)];
        let mut next_post = 0u32;

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(node, pred) => match tables.dfn_of.get(&node) {
                    None => {
                        // Tree edge: first discovery.
                        let dfn = tables.discover(node);
                        sets.push();
                        ancestor.push(dfn);
                        if pred != 0 {
                            tables.non_back_preds[dfn as usize].push((pred, dfn));
                            tables.tree_edges += 1;
                        }
                        stack.push(Frame::Finish(dfn, pred));

                        let mut succs: SmallVec<[N; 8]> = SmallVec::new();
                        graph.each_successor(node, &mut |s| succs.push(s));
                        for &succ in succs.iter().rev() {
                            stack.push(Frame::Enter(succ, dfn));
                        }
                    }
                    Some(&dfn) => {
                        if tables.post_dfn[dfn as usize] == 0 {
                            // Back edge: target still open on the DFS
                            // path (covers self-loops).
                            tables.back_preds[dfn as usize].push(pred);
                            tables.back_edges += 1;
                        } else {
                            // Cross/forward edge: park it at the LCA for
                            // re-attribution during construction.
                            let lca = ancestor[sets.find(dfn) as usize];
                            tables.cross_fwds[lca as usize].push((pred, dfn));
                            tables.cross_forward_edges += 1;
                        }
                    }
                },
                Frame::Finish(dfn, pred) => {
                    next_post += 1;
                    tables.post_dfn[dfn as usize] = next_post;
                    if pred != 0 {
                        let root = sets.union(dfn, pred);
                        ancestor[root as usize] = pred;
                    }
                }
            }
        }

        tables
    }

    /// Assign the next DFN to a newly discovered node.
    fn discover(&mut self, node: N) -> Dfn {
        self.nodes.push(node);
        let dfn = self.nodes.len() as Dfn;
        self.dfn_of.insert(node, dfn);
        self.post_dfn.push(0);
        self.back_preds.push(Vec::new());
        self.non_back_preds.push(Vec::new());
        self.cross_fwds.push(Vec::new());
        dfn
    }
}

/// DFS stack frame. `Enter` carries the discovering predecessor's DFN so
/// the edge can be classified when the frame pops; `Finish` replays it for
/// the union step.
enum Frame<N> {
    Enter(N, Dfn),
    Finish(Dfn, Dfn),
}
