#[cfg(feature = "cli")]
pub mod cli;
pub mod stack;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use stack::{ReadinessPolicy, StackLayout};
