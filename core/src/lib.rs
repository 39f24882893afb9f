pub mod error;
pub mod tasks;
pub mod weather;
