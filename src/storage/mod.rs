pub mod btree;
pub mod persistence;
pub mod record;
pub mod layout;
