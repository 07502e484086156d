pub mod cli;
pub mod handler;
