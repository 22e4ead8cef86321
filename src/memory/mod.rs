pub mod heap;
pub mod budget;
