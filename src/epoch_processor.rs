use crate::{
    CandidateGraph, Ed25519Verifier, FeeSelector, Rejection, SelectionParams, SignatureVerifier,
    Transaction, TransactionId, TransactionValidator, UtxoPool,
};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use tracing::{debug, info};

/// Decides which of the valid candidates of an epoch are committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Candidates are processed in the given order, and the first valid claim of an output wins.
    Sequential,
    /// The subset of candidates that pays the most fees wins.
    MaxFee,
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(SelectionPolicy::Sequential),
            "max-fee" => Ok(SelectionPolicy::MaxFee),
            _ => Err(format!(
                "Unknown policy: {}. Expected one of: sequential, max-fee",
                s
            )),
        }
    }
}

impl Display for SelectionPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionPolicy::Sequential => write!(f, "sequential"),
            SelectionPolicy::MaxFee => write!(f, "max-fee"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedTransaction {
    /// Position of the transaction in the list of candidates.
    pub index: usize,
    pub id: TransactionId,
    pub reason: Rejection,
}

/// The result of processing one epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpochOutcome {
    /// Committed transactions, in the order they were applied to the pool.
    pub accepted: Vec<Transaction>,
    /// Candidates that were not committed, ordered by their index.
    pub rejected: Vec<RejectedTransaction>,
    /// Sum of the fees of the accepted transactions.
    pub total_fee: i128,
    /// Groups of related candidates that were too large for an exact search, so the fee may
    /// not be the highest possible. Always zero for the sequential policy.
    pub approximated_components: usize,
}

/// Maintains the pool of unspent outputs across epochs, and commits the candidate transactions
/// of each epoch.
///
/// The processor owns a copy of the pool it was created with, so the caller's pool is never
/// affected. Every transaction is either fully committed or not at all.
pub struct EpochProcessor<V = Ed25519Verifier> {
    pool: UtxoPool,
    validator: TransactionValidator<V>,
    selector: FeeSelector,
}

impl EpochProcessor {
    pub fn new(pool: &UtxoPool) -> Self {
        Self::with_verifier(pool, Ed25519Verifier, SelectionParams::default())
    }
}

impl<V: SignatureVerifier> EpochProcessor<V> {
    pub fn with_verifier(pool: &UtxoPool, verifier: V, params: SelectionParams) -> Self {
        Self {
            pool: pool.clone(),
            validator: TransactionValidator::new(verifier),
            selector: FeeSelector::new(params),
        }
    }

    /// The current state of the pool.
    pub fn pool(&self) -> &UtxoPool {
        &self.pool
    }

    pub fn into_pool(self) -> UtxoPool {
        self.pool
    }

    /// Checks the transaction against the current state of the pool.
    pub fn is_valid_tx(&self, transaction: &Transaction) -> bool {
        self.validator.is_valid(transaction, &self.pool)
    }

    pub fn process(&mut self, policy: SelectionPolicy, candidates: &[Transaction]) -> EpochOutcome {
        let outcome = match policy {
            SelectionPolicy::Sequential => self.handle_txs(candidates),
            SelectionPolicy::MaxFee => self.handle_txs_max_fee(candidates),
        };
        info!(
            "Epoch processed with {} policy: {} of {} candidates accepted, total fee: {}, unspent outputs: {}",
            policy,
            outcome.accepted.len(),
            candidates.len(),
            outcome.total_fee,
            self.pool.len()
        );
        outcome
    }

    /// Processes the candidates in order. Each one is validated against the pool as updated by
    /// the candidates accepted before it, so it may spend their outputs, and it is rejected if
    /// one of them already spent an output it claims.
    pub fn handle_txs(&mut self, candidates: &[Transaction]) -> EpochOutcome {
        let mut outcome = EpochOutcome::default();
        for (index, transaction) in candidates.iter().enumerate() {
            match self.validator.validate(transaction, &self.pool) {
                Ok(fee) => {
                    self.pool.apply(transaction);
                    outcome.total_fee += fee as i128;
                    outcome.accepted.push(transaction.clone());
                }
                Err(reason) => outcome.rejected.push(Self::rejected(index, transaction, reason)),
            }
        }
        outcome
    }

    /// Commits the subset of candidates with the highest total fee that can be committed
    /// together. All candidates are evaluated against the pool as it was before the call, and
    /// the chosen ones are applied at the end, parents before children.
    /// See `FeeSelector` for how the subset is searched and its limits.
    pub fn handle_txs_max_fee(&mut self, candidates: &[Transaction]) -> EpochOutcome {
        let graph = CandidateGraph::build(&self.pool, candidates, &self.validator);
        let selection = self.selector.select(&graph);

        let mut outcome = EpochOutcome {
            total_fee: selection.total_fee,
            approximated_components: selection.approximated_components,
            ..EpochOutcome::default()
        };
        let mut chosen = vec![false; graph.len()];
        for position in &selection.positions {
            chosen[*position] = true;
            let transaction = &candidates[graph.nodes()[*position].index()];
            self.pool.apply(transaction);
            outcome.accepted.push(transaction.clone());
        }

        let outbid = graph
            .nodes()
            .iter()
            .zip(chosen)
            .filter(|(_, chosen)| !chosen)
            .map(|(node, _)| (node.index(), Rejection::Conflict));
        let mut rejected = graph
            .rejected()
            .iter()
            .cloned()
            .chain(outbid)
            .collect::<Vec<_>>();
        rejected.sort_by_key(|(index, _)| *index);
        outcome.rejected = rejected
            .into_iter()
            .map(|(index, reason)| Self::rejected(index, &candidates[index], reason))
            .collect();
        outcome
    }

    fn rejected(index: usize, transaction: &Transaction, reason: Rejection) -> RejectedTransaction {
        debug!("Rejected candidate {} ({}): {}", index, transaction.id(), reason);
        RejectedTransaction {
            index,
            id: *transaction.id(),
            reason,
        }
    }
}
