pub mod core;
pub mod grid;
pub mod patterns;
pub mod results;
pub mod roster;
pub mod setup;
