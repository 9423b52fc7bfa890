use crate::{KeyPair, PublicKey, Sha256, Signature};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Monetary amount in the smallest currency unit.
/// It is signed so that a malformed negative output can be represented and rejected.
pub type Amount = i64;

/// A double SHA-256 hash of the transaction content, excluding signatures.
#[derive(Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Serialize, Deserialize)]
pub struct TransactionId(Sha256);

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TransactionId {
    pub fn new(data: Sha256) -> Self {
        Self(data)
    }
}

/// The index of the transaction output.
#[derive(Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Serialize, Deserialize)]
pub struct OutputIndex(u32);

impl Display for OutputIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OutputIndex {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

/// Names exactly one transaction output: the transaction that created it and its position
/// among that transaction's outputs.
#[derive(Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Serialize, Deserialize)]
pub struct OutputRef {
    transaction_id: TransactionId,
    output_index: OutputIndex,
}

impl Display for OutputRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.transaction_id, self.output_index)
    }
}

impl OutputRef {
    pub fn new(transaction_id: TransactionId, output_index: OutputIndex) -> Self {
        Self {
            transaction_id,
            output_index,
        }
    }

    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    pub fn output_index(&self) -> OutputIndex {
        self.output_index
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    // The unspent output that this input consumes.
    output_ref: OutputRef,
    // Proves that the owner of the referenced output authorized this transaction.
    signature: Signature,
}

impl Display for TransactionInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.output_ref)
    }
}

impl TransactionInput {
    pub fn new(output_ref: OutputRef, signature: Signature) -> Self {
        Self {
            output_ref,
            signature,
        }
    }

    pub fn unsigned(output_ref: OutputRef) -> Self {
        Self::new(output_ref, Signature::empty())
    }

    pub fn output_ref(&self) -> &OutputRef {
        &self.output_ref
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TransactionOutput {
    amount: Amount,
    // The owner who can spend this output.
    public_key: PublicKey,
}

impl Display for TransactionOutput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.amount, self.public_key)
    }
}

impl TransactionOutput {
    pub fn new(amount: Amount, public_key: PublicKey) -> Self {
        Self { amount, public_key }
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }
}

/// The serialized form of a transaction. The id is not part of it because it is always
/// recomputed from the content.
#[derive(Serialize, Deserialize)]
struct TransactionData {
    inputs: Vec<TransactionInput>,
    outputs: Vec<TransactionOutput>,
}

/// The content that the id hashes and the signatures attest to: every input reference and
/// every output, without the signatures.
#[derive(Serialize)]
struct TransactionContent<'a> {
    inputs: Vec<&'a OutputRef>,
    outputs: &'a [TransactionOutput],
}

#[derive(Serialize)]
struct InputSigningData<'a> {
    content: TransactionContent<'a>,
    input_index: u32,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(from = "TransactionData", into = "TransactionData")]
pub struct Transaction {
    id: TransactionId,
    inputs: Vec<TransactionInput>,
    outputs: Vec<TransactionOutput>,
}

impl From<TransactionData> for Transaction {
    fn from(data: TransactionData) -> Self {
        Transaction::new(data.inputs, data.outputs)
    }
}

impl From<Transaction> for TransactionData {
    fn from(transaction: Transaction) -> Self {
        Self {
            inputs: transaction.inputs,
            outputs: transaction.outputs,
        }
    }
}

impl Transaction {
    pub fn new(inputs: Vec<TransactionInput>, outputs: Vec<TransactionOutput>) -> Self {
        let content = Self::content(&inputs, &outputs);
        let id = TransactionId::new(Sha256::double_digest(&Self::encode(&content)));
        Self {
            id,
            inputs,
            outputs,
        }
    }

    /// Creates a transaction that spends `spends` and signs every input with its key pair.
    pub fn new_signed(spends: &[(OutputRef, &KeyPair)], outputs: Vec<TransactionOutput>) -> Self {
        let inputs = spends
            .iter()
            .map(|(output_ref, _)| TransactionInput::unsigned(*output_ref))
            .collect();
        let mut transaction = Self::new(inputs, outputs);
        for (index, (_, key_pair)) in spends.iter().enumerate() {
            transaction
                .sign_input(index, key_pair)
                .expect("every spend has an input");
        }
        transaction
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn inputs(&self) -> &Vec<TransactionInput> {
        &self.inputs
    }

    pub fn outputs(&self) -> &Vec<TransactionOutput> {
        &self.outputs
    }

    /// Returns the references that this transaction's outputs will have once committed.
    pub fn minted_outputs(&self) -> impl Iterator<Item = (OutputRef, &TransactionOutput)> + '_ {
        self.outputs.iter().enumerate().map(move |(index, output)| {
            (
                OutputRef::new(self.id, OutputIndex::new(index as u32)),
                output,
            )
        })
    }

    /// The message that the signature of the input at `input_index` attests to.
    /// It covers every input reference and every output, but none of the signatures,
    /// so a signature can never sign itself.
    pub fn data_to_sign(&self, input_index: usize) -> Vec<u8> {
        Self::encode(&InputSigningData {
            content: Self::content(&self.inputs, &self.outputs),
            input_index: input_index as u32,
        })
    }

    /// Signs the input at `input_index` with `key_pair`. The id doesn't change.
    pub fn sign_input(&mut self, input_index: usize, key_pair: &KeyPair) -> Result<(), String> {
        if input_index >= self.inputs.len() {
            return Err(format!(
                "Transaction: {} has no input at index: {}",
                self.id, input_index
            ));
        }
        let signature = key_pair.sign(&self.data_to_sign(input_index));
        self.inputs[input_index].signature = signature;
        Ok(())
    }

    fn content<'a>(
        inputs: &'a [TransactionInput],
        outputs: &'a [TransactionOutput],
    ) -> TransactionContent<'a> {
        TransactionContent {
            inputs: inputs.iter().map(|input| &input.output_ref).collect(),
            outputs,
        }
    }

    fn encode<T: Serialize>(data: &T) -> Vec<u8> {
        // Serializing into memory only fails for types that can't be represented by bincode.
        bincode::serialize(data).expect("transaction content is serializable")
    }
}
