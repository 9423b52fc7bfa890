//! Fixtures shared by the unit tests.

use crate::{
    KeyPair, OutputIndex, OutputRef, Sha256, Transaction, TransactionId, TransactionOutput,
    UtxoPool,
};

pub fn key(seed: u8) -> KeyPair {
    KeyPair::from_seed(&[seed; 32])
}

/// A reference to an output of an imaginary transaction that funded the initial pool.
pub fn genesis_ref(index: u32) -> OutputRef {
    OutputRef::new(
        TransactionId::new(Sha256::digest(b"genesis")),
        OutputIndex::new(index),
    )
}

/// A pool with one output per entry, stored at `genesis_ref(position)`.
pub fn genesis_pool(outputs: &[(i64, &KeyPair)]) -> UtxoPool {
    outputs
        .iter()
        .enumerate()
        .map(|(index, (amount, owner))| {
            (
                genesis_ref(index as u32),
                TransactionOutput::new(*amount, owner.public_key()),
            )
        })
        .collect()
}

/// Spends the given outputs (all owned by `owner`) and pays each amount to `owner`.
pub fn spend(owner: &KeyPair, output_refs: &[OutputRef], amounts: &[i64]) -> Transaction {
    let spends = output_refs
        .iter()
        .map(|output_ref| (*output_ref, owner))
        .collect::<Vec<_>>();
    let outputs = amounts
        .iter()
        .map(|amount| TransactionOutput::new(*amount, owner.public_key()))
        .collect();
    Transaction::new_signed(&spends, outputs)
}

/// The reference of the `index`-th output of `transaction`.
pub fn output_of(transaction: &Transaction, index: u32) -> OutputRef {
    OutputRef::new(*transaction.id(), OutputIndex::new(index))
}
