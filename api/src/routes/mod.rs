pub mod health;
pub mod skillset;
pub mod tasks;
pub mod weather;
