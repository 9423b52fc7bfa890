use crate::{OutputRef, Transaction, TransactionOutput};
use std::collections::HashMap;

/// A pool of confirmed and unspent transaction outputs.
///
/// The pool has value semantics: cloning it produces an independent copy, and the
/// epoch processor works on its own clone so the caller's pool is never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoPool {
    // Unspent transaction outputs, indexed by the id of the transaction that created them and
    // their index in that transaction.
    utxos: HashMap<OutputRef, TransactionOutput>,
}

impl UtxoPool {
    pub fn new() -> Self {
        Self {
            utxos: HashMap::new(),
        }
    }

    pub fn contains(&self, output_ref: &OutputRef) -> bool {
        self.utxos.contains_key(output_ref)
    }

    pub fn get(&self, output_ref: &OutputRef) -> Option<&TransactionOutput> {
        self.utxos.get(output_ref)
    }

    /// Adds the unspent output, replacing any output previously stored under the same reference.
    pub fn insert(&mut self, output_ref: OutputRef, output: TransactionOutput) {
        self.utxos.insert(output_ref, output);
    }

    pub fn remove(&mut self, output_ref: &OutputRef) -> Option<TransactionOutput> {
        self.utxos.remove(output_ref)
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutputRef, &TransactionOutput)> {
        self.utxos.iter()
    }

    /// Sum of all unspent output amounts.
    pub fn total_value(&self) -> i128 {
        self.utxos
            .values()
            .map(|output| output.amount() as i128)
            .sum()
    }

    /// Commits an already validated transaction: every referenced output is consumed and every
    /// output of the transaction becomes unspent.
    pub fn apply(&mut self, transaction: &Transaction) {
        for input in transaction.inputs() {
            self.utxos.remove(input.output_ref());
        }
        for (output_ref, output) in transaction.minted_outputs() {
            self.utxos.insert(output_ref, output.clone());
        }
    }
}

impl std::iter::FromIterator<(OutputRef, TransactionOutput)> for UtxoPool {
    fn from_iter<T: IntoIterator<Item = (OutputRef, TransactionOutput)>>(iter: T) -> Self {
        Self {
            utxos: iter.into_iter().collect(),
        }
    }
}
