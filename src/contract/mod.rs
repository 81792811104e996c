//! Contract build and deploy pipeline
//!
//! Sources become [`Artifact`]s through a [`Builder`], are cached by the
//! [`ContractPipeline`], and are deployed to accounts as [`ContractHandle`]s.

pub mod abi;
pub mod builder;
pub mod burnpool;
pub mod pipeline;
pub mod token;

pub use abi::Abi;
pub use builder::{Artifact, Builder, CommandBuilder, PrebuiltLoader};
pub use burnpool::BurnPoolContract;
pub use pipeline::{BuildResult, ContractHandle, ContractPipeline};
pub use token::TokenContract;
