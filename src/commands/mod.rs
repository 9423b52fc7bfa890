pub mod process_command;
pub mod sample_command;

pub use self::{process_command::*, sample_command::*};
