// Process-level helpers shared by the subcommands.
pub mod lock;
pub mod report;
pub mod signal;
