use crate::{
    Amount, OutputRef, Rejection, SignatureVerifier, Transaction, TransactionId,
    TransactionValidator, UtxoPool,
};
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

/// A candidate transaction that can be part of a committed selection.
#[derive(Debug, Clone)]
pub struct CandidateNode {
    // Position of the transaction in the list of candidates.
    index: usize,
    fee: Amount,
    // Nodes whose outputs this transaction spends. They always precede this node.
    parents: Vec<usize>,
}

impl CandidateNode {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn fee(&self) -> Amount {
        self.fee
    }

    pub fn parents(&self) -> &[usize] {
        &self.parents
    }
}

/// The relations between the candidates of an epoch that may be committed together.
///
/// Every candidate is validated once against the pool extended with all outputs that the
/// candidates would create, so a candidate may spend an output of another candidate.
/// Two candidates conflict if they claim the same output, and a candidate depends on the
/// candidates whose outputs it spends.
/// Nodes are stored in topological order: parents first, ties broken by the candidate index.
#[derive(Debug, Clone, Default)]
pub struct CandidateGraph {
    nodes: Vec<CandidateNode>,
    conflicts: Vec<Vec<usize>>,
    rejected: Vec<(usize, Rejection)>,
}

impl CandidateGraph {
    pub fn build<V: SignatureVerifier>(
        pool: &UtxoPool,
        candidates: &[Transaction],
        validator: &TransactionValidator<V>,
    ) -> Self {
        let mut extended_pool = pool.clone();
        for transaction in candidates {
            for (output_ref, output) in transaction.minted_outputs() {
                if !pool.contains(&output_ref) {
                    extended_pool.insert(output_ref, output.clone());
                }
            }
        }

        let mut rejected = vec![];
        let mut fees = HashMap::new();
        let mut first_by_id: HashMap<&TransactionId, usize> = HashMap::new();
        for (index, transaction) in candidates.iter().enumerate() {
            match validator.validate(transaction, &extended_pool) {
                Ok(_) if first_by_id.contains_key(transaction.id()) => {
                    rejected.push((index, Rejection::DuplicateTransaction));
                }
                Ok(fee) => {
                    first_by_id.insert(transaction.id(), index);
                    fees.insert(index, fee);
                }
                Err(reason) => rejected.push((index, reason)),
            }
        }

        let parents = Self::candidate_parents(pool, candidates, &first_by_id);
        let order = Self::topological_order(&parents);

        let mut position_of = HashMap::with_capacity(order.len());
        for (position, index) in order.iter().enumerate() {
            position_of.insert(*index, position);
        }
        for (index, transaction) in candidates.iter().enumerate() {
            if fees.contains_key(&index) && !position_of.contains_key(&index) {
                // A parent was rejected, or the spends form a cycle.
                let unresolved = transaction
                    .inputs()
                    .iter()
                    .map(|input| *input.output_ref())
                    .find(|output_ref| {
                        !pool.contains(output_ref)
                            && !first_by_id
                                .get(output_ref.transaction_id())
                                .map_or(false, |parent| position_of.contains_key(parent))
                    })
                    .unwrap_or_else(|| *transaction.inputs()[0].output_ref());
                rejected.push((index, Rejection::MissingOutput(unresolved)));
            }
        }
        rejected.sort_by_key(|(index, _)| *index);

        let nodes = order
            .iter()
            .map(|index| CandidateNode {
                index: *index,
                fee: fees[index],
                parents: parents[index]
                    .iter()
                    .map(|parent| position_of[parent])
                    .collect(),
            })
            .collect::<Vec<_>>();

        let mut claims: HashMap<&OutputRef, Vec<usize>> = HashMap::new();
        for (position, node) in nodes.iter().enumerate() {
            for input in candidates[node.index].inputs() {
                claims.entry(input.output_ref()).or_default().push(position);
            }
        }
        let mut conflicts = vec![BTreeSet::new(); nodes.len()];
        for claimants in claims.values() {
            for (i, a) in claimants.iter().enumerate() {
                for b in &claimants[i + 1..] {
                    conflicts[*a].insert(*b);
                    conflicts[*b].insert(*a);
                }
            }
        }

        Self {
            nodes,
            conflicts: conflicts
                .into_iter()
                .map(|neighbours| neighbours.into_iter().collect())
                .collect(),
            rejected,
        }
    }

    /// Valid candidates whose ancestors are all valid, in topological order.
    pub fn nodes(&self) -> &[CandidateNode] {
        &self.nodes
    }

    /// Positions of the nodes that claim at least one output also claimed by `position`.
    pub fn conflicts(&self, position: usize) -> &[usize] {
        &self.conflicts[position]
    }

    /// Candidates that can never be committed, with the reason, ordered by candidate index.
    pub fn rejected(&self) -> &[(usize, Rejection)] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Splits the nodes into groups connected by conflicts or dependencies.
    /// Each group is sorted by position, and groups are ordered by their first position.
    /// A selection can be chosen for every group independently.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut children = vec![vec![]; self.nodes.len()];
        for (position, node) in self.nodes.iter().enumerate() {
            for parent in &node.parents {
                children[*parent].push(position);
            }
        }

        let mut component_of = vec![None; self.nodes.len()];
        let mut components = vec![];
        for start in 0..self.nodes.len() {
            if component_of[start].is_some() {
                continue;
            }
            let id = components.len();
            let mut members = vec![start];
            let mut stack = vec![start];
            component_of[start] = Some(id);
            while let Some(position) = stack.pop() {
                let neighbours = self.conflicts[position]
                    .iter()
                    .chain(self.nodes[position].parents.iter())
                    .chain(children[position].iter());
                for neighbour in neighbours {
                    if component_of[*neighbour].is_none() {
                        component_of[*neighbour] = Some(id);
                        members.push(*neighbour);
                        stack.push(*neighbour);
                    }
                }
            }
            members.sort_unstable();
            components.push(members);
        }
        components
    }

    // Maps each valid candidate to the candidates that create the outputs it spends.
    // A spend of an output created by an invalid candidate maps to a parent that is absent from
    // the result, so the spending candidate never becomes ready in the topological order.
    fn candidate_parents(
        pool: &UtxoPool,
        candidates: &[Transaction],
        first_by_id: &HashMap<&TransactionId, usize>,
    ) -> HashMap<usize, BTreeSet<usize>> {
        first_by_id
            .values()
            .map(|index| {
                let parents: BTreeSet<usize> = candidates[*index]
                    .inputs()
                    .iter()
                    .map(|input| input.output_ref())
                    .filter(|output_ref| !pool.contains(output_ref))
                    .map(|output_ref| {
                        first_by_id
                            .get(output_ref.transaction_id())
                            .copied()
                            .unwrap_or(usize::MAX)
                    })
                    .collect();
                (*index, parents)
            })
            .collect()
    }

    // Kahn's algorithm that always picks the ready candidate with the lowest index.
    fn topological_order(parents: &HashMap<usize, BTreeSet<usize>>) -> Vec<usize> {
        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut pending = HashMap::with_capacity(parents.len());
        let mut ready = BinaryHeap::new();
        for (index, index_parents) in parents {
            pending.insert(*index, index_parents.len());
            if index_parents.is_empty() {
                ready.push(Reverse(*index));
            }
            for parent in index_parents {
                children.entry(*parent).or_default().push(*index);
            }
        }

        let mut order = Vec::with_capacity(parents.len());
        while let Some(Reverse(index)) = ready.pop() {
            order.push(index);
            for child in children.get(&index).into_iter().flatten() {
                if let Some(count) = pending.get_mut(child) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(Reverse(*child));
                    }
                }
            }
        }
        order
    }
}
