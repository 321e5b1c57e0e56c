pub mod types;
pub mod models;
pub mod tracker;
pub mod gate;
pub mod worker;

pub use types::*;
pub use models::*;
pub use tracker::*;
pub use gate::*;
