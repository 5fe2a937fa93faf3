//! Account module
//!
//! Accounts are owned by an external service; the transfer core only reads
//! them and applies single-row balance mutations through [`AccountService`].

pub mod models;
pub mod service;

pub use models::{Account, AccountStatus, BalanceDirection, BalanceUpdate};
pub use service::AccountService;
