pub mod config;
pub mod med;
pub mod remind;
pub mod roster;
