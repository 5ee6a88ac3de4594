// Core commands
pub mod config;
pub mod generate;
