pub mod browse;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod operation;
pub mod transfer;
pub mod utils;

pub use error::{ManagerError, Result};
