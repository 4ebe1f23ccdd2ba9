pub mod blob;
pub mod cli;
pub mod load_config;
pub mod server;
pub mod store;
pub mod vault;

pub use cli::{run, Cli, Commands};
