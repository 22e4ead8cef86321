pub mod command;
pub mod stack;

pub use command::{Revert, UndoAction, UndoBatch, UndoEntry};
pub use stack::UndoLog;
