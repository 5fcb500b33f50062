pub mod cli;
pub mod entity;
pub mod error;
pub mod generation;
pub mod integration;
pub mod push;
pub mod resolve;
pub mod review;
pub mod search;
pub mod store;
pub mod ticket;

pub use error::{CaseforgeError, Result};
pub use store::JsonStore;
