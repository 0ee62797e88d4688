//! App module - terminal front end over the generation session

pub mod command;
pub mod studio;

pub use command::Command;
pub use studio::{Outcome, Studio};
