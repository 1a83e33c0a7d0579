//! Command-line surface for the `edgepass` binary.
pub mod cli_args;
pub mod startup;

pub use cli_args::Cli;
pub use startup::{init_tracing, run_cli};
