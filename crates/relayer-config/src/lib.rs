//! Configuration loading for the relayer.
//!
//! Configuration comes either from a TOML/JSON/YAML file with `${VAR}`
//! substitution, or entirely from the environment using the variable names
//! the relayer has always been deployed with (`RPC_READ`, `RPC_WRITE`,
//! `PRIVATE_KEY`, `CONTRACT_ADDRESS`, `MULTI_PROOF_API`, `PORT`).

use thiserror::Error;

pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}
