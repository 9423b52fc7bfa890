pub mod candidate_graph;
pub mod commands;
pub mod epoch_file;
pub mod epoch_processor;
pub mod fee_selection;
pub mod hash;
pub mod public_key;
pub mod signature;
pub mod transaction;
pub mod utxo_pool;
pub mod validation;

#[cfg(test)]
mod test_utils;

pub use self::{
    candidate_graph::*, epoch_file::*, epoch_processor::*, fee_selection::*, hash::*,
    public_key::*, signature::*, transaction::*, utxo_pool::*, validation::*,
};
