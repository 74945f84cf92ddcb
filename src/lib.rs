//! Deploys one compiled contract, passing the configured wallet address to its
//! constructor, and reports the resulting address.

pub mod artifact;
pub mod config;
pub mod error;
pub mod factory;
pub mod runner;

pub use crate::config::Settings;
pub use crate::error::{DeployError, Result};
pub use crate::factory::{
    ContractFactory, ContractFactoryProvider, DeployedContract, EthersFactoryProvider,
};
pub use crate::runner::{deploy, run, Outcome};
