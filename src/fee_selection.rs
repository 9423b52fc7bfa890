use crate::CandidateGraph;
use tracing::warn;

/// Largest group of related candidates that is searched exhaustively by default.
pub const DEFAULT_EXACT_COMPONENT_LIMIT: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionParams {
    /// Groups of conflicting or dependent candidates up to this size are solved exactly.
    /// Larger groups are solved greedily.
    pub exact_component_limit: usize,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            exact_component_limit: DEFAULT_EXACT_COMPONENT_LIMIT,
        }
    }
}

/// The candidates chosen for commit, as node positions in the candidate graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    // Sorted, so parents always come before their children.
    pub positions: Vec<usize>,
    pub total_fee: i128,
    // Number of components that were too large to be solved exactly.
    pub approximated_components: usize,
}

/// Chooses a subset of the candidates that maximizes the total fee, such that no two chosen
/// candidates claim the same output and every chosen candidate's parents are chosen too.
///
/// This is the maximum-weight independent set problem, which is NP-hard, so each connected
/// component of the candidate graph is handled separately:
///   - Components with at most `exact_component_limit` nodes are solved exactly with a
///     depth-first branch and bound. Its cost is exponential in the component size.
///   - Larger components take the highest-fee candidate that can still be added, until none
///     is left. This is not guaranteed to be optimal.
///
/// Among optimal subsets, the exact search returns the one that takes the earliest node at
/// the first node where optimal subsets differ, so the result is deterministic.
#[derive(Debug, Clone, Default)]
pub struct FeeSelector {
    params: SelectionParams,
}

impl FeeSelector {
    pub fn new(params: SelectionParams) -> Self {
        Self { params }
    }

    pub fn select(&self, graph: &CandidateGraph) -> Selection {
        let mut selection = Selection::default();
        for members in graph.components() {
            let component = Component::new(graph, &members);
            let chosen = if members.len() <= self.params.exact_component_limit {
                BranchAndBound::new(&component).solve()
            } else {
                warn!(
                    "Selecting greedily among {} related candidates (exact limit: {})",
                    members.len(),
                    self.params.exact_component_limit
                );
                selection.approximated_components += 1;
                component.greedy()
            };
            for local in chosen {
                selection.total_fee += component.fees[local];
                selection.positions.push(members[local]);
            }
        }
        selection.positions.sort_unstable();
        selection
    }
}

// A connected component with nodes renumbered from 0 in topological order.
struct Component {
    fees: Vec<i128>,
    conflicts: Vec<Vec<usize>>,
    parents: Vec<Vec<usize>>,
}

impl Component {
    fn new(graph: &CandidateGraph, members: &[usize]) -> Self {
        // `members` is sorted, so the local numbering preserves the topological order.
        let local = |position: &usize| {
            members
                .binary_search(position)
                .expect("neighbours are in the same component")
        };
        Self {
            fees: members
                .iter()
                .map(|position| graph.nodes()[*position].fee() as i128)
                .collect(),
            conflicts: members
                .iter()
                .map(|position| graph.conflicts(*position).iter().map(local).collect())
                .collect(),
            parents: members
                .iter()
                .map(|position| graph.nodes()[*position].parents().iter().map(local).collect())
                .collect(),
        }
    }

    fn len(&self) -> usize {
        self.fees.len()
    }

    fn greedy(&self) -> Vec<usize> {
        let mut order = (0..self.len()).collect::<Vec<_>>();
        order.sort_by(|a, b| self.fees[*b].cmp(&self.fees[*a]).then(a.cmp(b)));

        let mut state = SearchState::new(self.len());
        loop {
            let next = order
                .iter()
                .copied()
                .find(|node| !state.taken[*node] && state.can_take(self, *node));
            match next {
                Some(node) => state.take(self, node),
                None => return state.chosen(),
            }
        }
    }
}

// Nodes taken so far, and how many taken nodes conflict with each node.
struct SearchState {
    taken: Vec<bool>,
    blocked: Vec<u32>,
    fee: i128,
}

impl SearchState {
    fn new(len: usize) -> Self {
        Self {
            taken: vec![false; len],
            blocked: vec![0; len],
            fee: 0,
        }
    }

    fn can_take(&self, component: &Component, node: usize) -> bool {
        self.blocked[node] == 0 && component.parents[node].iter().all(|p| self.taken[*p])
    }

    fn take(&mut self, component: &Component, node: usize) {
        self.taken[node] = true;
        self.fee += component.fees[node];
        for neighbour in &component.conflicts[node] {
            self.blocked[*neighbour] += 1;
        }
    }

    fn untake(&mut self, component: &Component, node: usize) {
        self.taken[node] = false;
        self.fee -= component.fees[node];
        for neighbour in &component.conflicts[node] {
            self.blocked[*neighbour] -= 1;
        }
    }

    fn chosen(&self) -> Vec<usize> {
        (0..self.taken.len()).filter(|node| self.taken[*node]).collect()
    }
}

struct BranchAndBound<'a> {
    component: &'a Component,
    state: SearchState,
    best: Option<(i128, Vec<usize>)>,
}

impl<'a> BranchAndBound<'a> {
    fn new(component: &'a Component) -> Self {
        Self {
            component,
            state: SearchState::new(component.len()),
            best: None,
        }
    }

    fn solve(mut self) -> Vec<usize> {
        self.search(0);
        self.best.map(|(_, chosen)| chosen).unwrap_or_default()
    }

    // Decides the nodes from `next` onwards, trying to take each node before skipping it.
    fn search(&mut self, next: usize) {
        if let Some((best_fee, _)) = &self.best {
            // Only strictly better subsets replace the best one, which keeps the first optimum.
            if self.upper_bound(next) <= *best_fee {
                return;
            }
        }
        if next == self.component.len() {
            self.best = Some((self.state.fee, self.state.chosen()));
            return;
        }

        if self.state.can_take(self.component, next) {
            self.state.take(self.component, next);
            self.search(next + 1);
            self.state.untake(self.component, next);
        }
        self.search(next + 1);
    }

    // Fee of the taken nodes plus the fees of the undecided nodes that can still be taken.
    fn upper_bound(&self, next: usize) -> i128 {
        let component = self.component;
        let remaining: i128 = (next..component.len())
            .filter(|node| {
                self.state.blocked[*node] == 0
                    && component.parents[*node]
                        .iter()
                        .all(|p| *p >= next || self.state.taken[*p])
            })
            .map(|node| component.fees[node])
            .sum();
        self.state.fee + remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{genesis_pool, genesis_ref, key, output_of, spend};
    use crate::{Transaction, TransactionValidator, UtxoPool};

    fn select(pool: &UtxoPool, candidates: &[Transaction], limit: usize) -> (Vec<usize>, i128) {
        let graph = CandidateGraph::build(pool, candidates, &TransactionValidator::default());
        let selection = FeeSelector::new(SelectionParams {
            exact_component_limit: limit,
        })
        .select(&graph);
        let indices = selection
            .positions
            .iter()
            .map(|position| graph.nodes()[*position].index())
            .collect();
        (indices, selection.total_fee)
    }

    #[test]
    fn picks_higher_fee_of_two_conflicting() {
        let alice = key(1);
        let pool = genesis_pool(&[(10, &alice)]);
        let candidates = vec![
            spend(&alice, &[genesis_ref(0)], &[9]),
            spend(&alice, &[genesis_ref(0)], &[4]),
        ];
        assert_eq!(select(&pool, &candidates, 24), (vec![1], 6));
    }

    #[test]
    fn two_small_beat_one_large() {
        // A conflicts with both B and C, but B and C together pay more than A.
        let alice = key(1);
        let pool = genesis_pool(&[(10, &alice), (10, &alice)]);
        let candidates = vec![
            spend(&alice, &[genesis_ref(0), genesis_ref(1)], &[13]),
            spend(&alice, &[genesis_ref(0)], &[6]),
            spend(&alice, &[genesis_ref(1)], &[6]),
        ];
        assert_eq!(select(&pool, &candidates, 24), (vec![1, 2], 8));
        // The greedy approximation takes the single highest fee first.
        assert_eq!(select(&pool, &candidates, 1), (vec![0], 7));
    }

    #[test]
    fn equal_fees_prefer_earlier_candidate() {
        let alice = key(1);
        let pool = genesis_pool(&[(10, &alice)]);
        let candidates = vec![
            spend(&alice, &[genesis_ref(0)], &[7]),
            spend(&alice, &[genesis_ref(0)], &[5, 2]),
        ];
        assert_eq!(select(&pool, &candidates, 24), (vec![0], 3));
        assert_eq!(select(&pool, &candidates, 0), (vec![0], 3));
    }

    #[test]
    fn zero_fee_candidates_are_kept() {
        let alice = key(1);
        let pool = genesis_pool(&[(10, &alice), (10, &alice)]);
        let candidates = vec![
            spend(&alice, &[genesis_ref(0)], &[10]),
            spend(&alice, &[genesis_ref(1)], &[8]),
        ];
        assert_eq!(select(&pool, &candidates, 24), (vec![0, 1], 2));
    }

    #[test]
    fn child_fee_can_justify_low_fee_parent() {
        let alice = key(1);
        let pool = genesis_pool(&[(10, &alice)]);
        let parent = spend(&alice, &[genesis_ref(0)], &[10]);
        let rival = spend(&alice, &[genesis_ref(0)], &[7]);
        let child = spend(&alice, &[output_of(&parent, 0)], &[2]);
        let candidates = vec![child, rival, parent];
        // Parent and child pay 0 + 8, the rival pays 3.
        assert_eq!(select(&pool, &candidates, 24), (vec![2, 0], 8));
    }

    #[test]
    fn child_is_never_selected_without_parent() {
        let alice = key(1);
        let pool = genesis_pool(&[(10, &alice)]);
        let parent = spend(&alice, &[genesis_ref(0)], &[10]);
        let rival = spend(&alice, &[genesis_ref(0)], &[7]);
        let child = spend(&alice, &[output_of(&parent, 0)], &[2]);
        let candidates = vec![child, rival, parent];
        // Greedy takes the child first only if its parent is taken, so it settles for the rival.
        assert_eq!(select(&pool, &candidates, 0), (vec![1], 3));
    }

    #[test]
    fn empty_graph() {
        let pool = UtxoPool::new();
        assert_eq!(select(&pool, &[], 24), (vec![], 0));
    }
}
