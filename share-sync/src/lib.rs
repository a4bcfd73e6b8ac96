pub mod cli;
pub mod client;
pub mod load_config;
pub mod logging;
pub mod recorder;

pub use cli::{run, Cli};
