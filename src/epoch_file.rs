use crate::{OutputRef, Transaction, TransactionOutput, UtxoPool};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub output_ref: OutputRef,
    pub output: TransactionOutput,
}

/// The JSON document read by the `process` command: the pool at the start of the epoch and the
/// candidate transactions in the order they were proposed.
/// Hashes, keys and signatures are hex-encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochFile {
    pub pool: Vec<PoolEntry>,
    pub candidates: Vec<Transaction>,
}

impl EpochFile {
    pub fn new(pool: &UtxoPool, candidates: Vec<Transaction>) -> Self {
        let mut entries = pool
            .iter()
            .map(|(output_ref, output)| PoolEntry {
                output_ref: *output_ref,
                output: output.clone(),
            })
            .collect::<Vec<_>>();
        // The pool has no order, but the file should be stable.
        entries.sort_by_key(|entry| entry.output_ref);
        Self {
            pool: entries,
            candidates,
        }
    }

    pub fn read(path: &str) -> Result<Self, String> {
        let json = fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path, e))?;
        serde_json::from_str(&json).map_err(|e| format!("Invalid epoch file {}: {}", path, e))
    }

    pub fn write(&self, path: &str) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| format!("Failed to write {}: {}", path, e))
    }

    /// Builds the pool. A reference listed more than once keeps its last output.
    pub fn utxo_pool(&self) -> UtxoPool {
        self.pool
            .iter()
            .map(|entry| (entry.output_ref, entry.output.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{genesis_pool, genesis_ref, key, spend};

    #[test]
    fn parses_hex_encoded_document() {
        let owner = key(1);
        let pool = genesis_pool(&[(10, &owner)]);
        let transaction = spend(&owner, &[genesis_ref(0)], &[4]);
        let json = format!(
            r#"{{
                "pool": [{{
                    "output_ref": {{"transaction_id": "{}", "output_index": 0}},
                    "output": {{"amount": 10, "public_key": "{}"}}
                }}],
                "candidates": [{{
                    "inputs": [{{
                        "output_ref": {{"transaction_id": "{}", "output_index": 0}},
                        "signature": "{}"
                    }}],
                    "outputs": [{{"amount": 4, "public_key": "{}"}}]
                }}]
            }}"#,
            genesis_ref(0).transaction_id(),
            owner.public_key(),
            genesis_ref(0).transaction_id(),
            transaction.inputs()[0].signature(),
            owner.public_key(),
        );

        let file: EpochFile = serde_json::from_str(&json).unwrap();
        assert_eq!(file.utxo_pool(), pool);
        assert_eq!(file.candidates, vec![transaction]);
    }

    #[test]
    fn pool_entries_are_sorted() {
        let owner = key(1);
        let pool = genesis_pool(&[(1, &owner), (2, &owner), (3, &owner)]);
        let file = EpochFile::new(&pool, vec![]);
        let indices = file
            .pool
            .iter()
            .map(|entry| entry.output_ref.output_index().value())
            .collect::<Vec<_>>();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(file.utxo_pool(), pool);
    }

    #[test]
    fn rejects_malformed_key() {
        let json = r#"{"pool": [{
            "output_ref": {"transaction_id": "00", "output_index": 0},
            "output": {"amount": 1, "public_key": "00"}
        }], "candidates": []}"#;
        assert!(serde_json::from_str::<EpochFile>(json).is_err());
    }
}
