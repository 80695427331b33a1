pub mod manager;
pub mod persistence;
pub mod schedule;
pub mod state;

pub use manager::*;
pub use persistence::*;
pub use schedule::*;
pub use state::*;
