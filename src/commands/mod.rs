// Command implementations split by subcommand.
pub mod monitor;
pub mod replay;

pub use monitor::run_monitor;
pub use replay::run_replay;
