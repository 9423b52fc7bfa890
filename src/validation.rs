use crate::{
    Amount, Ed25519Verifier, OutputRef, SignatureVerifier, Transaction, TransactionOutput,
    UtxoPool,
};
use std::collections::HashSet;
use thiserror::Error;

/// The reason a candidate transaction was not committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("transaction has no inputs")]
    NoInputs,
    #[error("referenced output {0} is not unspent")]
    MissingOutput(OutputRef),
    #[error("output {0} is claimed more than once")]
    DoubleClaim(OutputRef),
    #[error("signature of input {input_index} does not verify")]
    BadSignature { input_index: usize },
    #[error("output {output_index} has negative amount {amount}")]
    NegativeOutput { output_index: usize, amount: Amount },
    #[error("inputs worth {input_total} cannot pay for outputs worth {output_total}")]
    InsufficientInput {
        input_total: Amount,
        output_total: Amount,
    },
    #[error("transaction amounts overflow")]
    ValueOverflow,
    #[error("valid, but conflicts with a selection that pays more fees")]
    Conflict,
    #[error("an identical transaction is already a candidate")]
    DuplicateTransaction,
}

/// Validates transactions against a pool of unspent outputs.
///
/// A transaction is valid if all of the following are satisfied, checked in this order:
///   1. It has inputs, and every referenced output is in the pool.
///   2. No output is referenced by more than one of its inputs.
///   3. The signature of every input verifies against the owner of the referenced output.
///   4. All output amounts are non-negative.
///   5. The sum of the input amounts is greater than or equal to the sum of the output amounts.
/// Validation doesn't modify the pool.
#[derive(Debug, Clone)]
pub struct TransactionValidator<V = Ed25519Verifier> {
    verifier: V,
}

impl Default for TransactionValidator {
    fn default() -> Self {
        Self::new(Ed25519Verifier)
    }
}

impl<V: SignatureVerifier> TransactionValidator<V> {
    pub fn new(verifier: V) -> Self {
        Self { verifier }
    }

    pub fn is_valid(&self, transaction: &Transaction, pool: &UtxoPool) -> bool {
        self.validate(transaction, pool).is_ok()
    }

    /// Returns the fee paid by the transaction if it's valid.
    pub fn validate(&self, transaction: &Transaction, pool: &UtxoPool) -> Result<Amount, Rejection> {
        let spent = Self::validate_inputs_exist(transaction, pool)?;
        Self::validate_no_double_claim(transaction)?;
        self.validate_signatures(transaction, &spent)?;
        Self::validate_outputs_non_negative(transaction)?;
        Self::validate_fee(&spent, transaction.outputs())
    }

    fn validate_inputs_exist<'a>(
        transaction: &Transaction,
        pool: &'a UtxoPool,
    ) -> Result<Vec<&'a TransactionOutput>, Rejection> {
        if transaction.inputs().is_empty() {
            return Err(Rejection::NoInputs);
        }
        transaction
            .inputs()
            .iter()
            .map(|input| {
                pool.get(input.output_ref())
                    .ok_or(Rejection::MissingOutput(*input.output_ref()))
            })
            .collect()
    }

    fn validate_no_double_claim(transaction: &Transaction) -> Result<(), Rejection> {
        // Scoped to this transaction only. Conflicts between transactions are resolved by
        // the epoch processor.
        let mut claimed = HashSet::with_capacity(transaction.inputs().len());
        for input in transaction.inputs() {
            if !claimed.insert(input.output_ref()) {
                return Err(Rejection::DoubleClaim(*input.output_ref()));
            }
        }
        Ok(())
    }

    fn validate_signatures(
        &self,
        transaction: &Transaction,
        spent: &[&TransactionOutput],
    ) -> Result<(), Rejection> {
        for (input_index, (input, output)) in transaction.inputs().iter().zip(spent).enumerate() {
            let message = transaction.data_to_sign(input_index);
            if !self
                .verifier
                .verify(&message, input.signature(), output.public_key())
            {
                return Err(Rejection::BadSignature { input_index });
            }
        }
        Ok(())
    }

    fn validate_outputs_non_negative(transaction: &Transaction) -> Result<(), Rejection> {
        match transaction
            .outputs()
            .iter()
            .enumerate()
            .find(|(_, output)| output.amount() < 0)
        {
            Some((output_index, output)) => Err(Rejection::NegativeOutput {
                output_index,
                amount: output.amount(),
            }),
            None => Ok(()),
        }
    }

    fn validate_fee(
        spent: &[&TransactionOutput],
        outputs: &[TransactionOutput],
    ) -> Result<Amount, Rejection> {
        let input_total = Self::checked_total(spent.iter().map(|output| output.amount()))?;
        let output_total = Self::checked_total(outputs.iter().map(TransactionOutput::amount))?;
        if input_total >= output_total {
            Ok(input_total - output_total)
        } else {
            Err(Rejection::InsufficientInput {
                input_total,
                output_total,
            })
        }
    }

    fn checked_total(mut amounts: impl Iterator<Item = Amount>) -> Result<Amount, Rejection> {
        amounts.try_fold(0 as Amount, |total, amount| {
            total.checked_add(amount).ok_or(Rejection::ValueOverflow)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{genesis_pool, genesis_ref, key, spend};
    use crate::{Signature, TransactionInput};

    fn validator() -> TransactionValidator {
        TransactionValidator::default()
    }

    #[test]
    fn valid_transaction_returns_fee() {
        let alice = key(1);
        let pool = genesis_pool(&[(10, &alice), (5, &alice)]);
        let transaction = spend(&alice, &[genesis_ref(0), genesis_ref(1)], &[8, 4]);
        assert_eq!(validator().validate(&transaction, &pool), Ok(3));
        assert!(validator().is_valid(&transaction, &pool));
    }

    #[test]
    fn spending_everything_is_valid() {
        let alice = key(1);
        let pool = genesis_pool(&[(10, &alice)]);
        assert_eq!(
            validator().validate(&spend(&alice, &[genesis_ref(0)], &[10]), &pool),
            Ok(0)
        );
        assert_eq!(
            validator().validate(&spend(&alice, &[genesis_ref(0)], &[]), &pool),
            Ok(10)
        );
    }

    #[test]
    fn missing_output() {
        let alice = key(1);
        let pool = genesis_pool(&[(10, &alice)]);
        let transaction = spend(&alice, &[genesis_ref(3)], &[1]);
        assert_eq!(
            validator().validate(&transaction, &pool),
            Err(Rejection::MissingOutput(genesis_ref(3)))
        );
    }

    #[test]
    fn no_inputs() {
        let alice = key(1);
        let pool = genesis_pool(&[(10, &alice)]);
        let transaction = spend(&alice, &[], &[0]);
        assert_eq!(
            validator().validate(&transaction, &pool),
            Err(Rejection::NoInputs)
        );
    }

    #[test]
    fn double_claim_within_transaction() {
        let alice = key(1);
        let pool = genesis_pool(&[(10, &alice)]);
        let transaction = spend(&alice, &[genesis_ref(0), genesis_ref(0)], &[15]);
        assert_eq!(
            validator().validate(&transaction, &pool),
            Err(Rejection::DoubleClaim(genesis_ref(0)))
        );
        // Rejected even though the double-counted inputs would be needed to pay for outputs.
        let cheap = spend(&alice, &[genesis_ref(0), genesis_ref(0)], &[1]);
        assert!(!validator().is_valid(&cheap, &pool));
    }

    #[test]
    fn signature_by_wrong_owner() {
        let alice = key(1);
        let mallory = key(66);
        let pool = genesis_pool(&[(10, &alice)]);
        let transaction = spend(&mallory, &[genesis_ref(0)], &[4]);
        assert_eq!(
            validator().validate(&transaction, &pool),
            Err(Rejection::BadSignature { input_index: 0 })
        );
    }

    #[test]
    fn missing_signature() {
        let alice = key(1);
        let pool = genesis_pool(&[(10, &alice), (10, &alice)]);
        let signed = spend(&alice, &[genesis_ref(0), genesis_ref(1)], &[4]);
        let mut inputs = signed.inputs().clone();
        inputs[1] = TransactionInput::new(*inputs[1].output_ref(), Signature::empty());
        let transaction = Transaction::new(inputs, signed.outputs().clone());
        assert_eq!(
            validator().validate(&transaction, &pool),
            Err(Rejection::BadSignature { input_index: 1 })
        );
    }

    #[test]
    fn signature_does_not_carry_over_to_other_outputs() {
        let alice = key(1);
        let pool = genesis_pool(&[(10, &alice)]);
        let signed = spend(&alice, &[genesis_ref(0)], &[4]);
        let tampered = Transaction::new(
            signed.inputs().clone(),
            vec![TransactionOutput::new(9, key(66).public_key())],
        );
        assert!(!validator().is_valid(&tampered, &pool));
    }

    #[test]
    fn negative_output() {
        let alice = key(1);
        let pool = genesis_pool(&[(10, &alice)]);
        let transaction = spend(&alice, &[genesis_ref(0)], &[5, -1]);
        assert_eq!(
            validator().validate(&transaction, &pool),
            Err(Rejection::NegativeOutput {
                output_index: 1,
                amount: -1
            })
        );
    }

    #[test]
    fn insufficient_input() {
        let alice = key(1);
        let pool = genesis_pool(&[(10, &alice)]);
        let transaction = spend(&alice, &[genesis_ref(0)], &[6, 5]);
        assert_eq!(
            validator().validate(&transaction, &pool),
            Err(Rejection::InsufficientInput {
                input_total: 10,
                output_total: 11
            })
        );
    }

    #[test]
    fn output_overflow() {
        let alice = key(1);
        let pool = genesis_pool(&[(10, &alice)]);
        let transaction = spend(&alice, &[genesis_ref(0)], &[i64::MAX, 1]);
        assert_eq!(
            validator().validate(&transaction, &pool),
            Err(Rejection::ValueOverflow)
        );
    }

    #[test]
    fn validation_does_not_modify_pool() {
        let alice = key(1);
        let pool = genesis_pool(&[(10, &alice)]);
        let before = pool.clone();
        let transaction = spend(&alice, &[genesis_ref(0)], &[4]);
        assert!(validator().is_valid(&transaction, &pool));
        assert!(validator().is_valid(&transaction, &pool));
        assert_eq!(pool, before);
    }

    struct AcceptAll;

    impl SignatureVerifier for AcceptAll {
        fn verify(&self, _: &[u8], _: &Signature, _: &crate::PublicKey) -> bool {
            true
        }
    }

    #[test]
    fn custom_verifier() {
        let alice = key(1);
        let pool = genesis_pool(&[(10, &alice)]);
        let transaction = spend(&key(66), &[genesis_ref(0)], &[4]);
        assert!(!validator().is_valid(&transaction, &pool));
        assert!(TransactionValidator::new(AcceptAll).is_valid(&transaction, &pool));
    }
}
