//! Stratus function deployment
//!
//! This crate packages user code and deploys it as a versioned function on a
//! managed compute platform. Deployments are create-or-update: running the
//! same deployment twice converges on one remote function instead of
//! creating duplicates.
//!
//! # Architecture
//!
//! - **Packager** ([`package`]): bundles the user's code with the runtime
//!   wrapper into an in-memory archive
//! - **Existence prober** ([`probe`]): decides whether the function is
//!   already registered
//! - **Layer resolver** ([`layer`]): finds the latest shared runtime layer
//! - **Reconciler** ([`reconcile`]): creates the function, or patches drifted
//!   configuration and republishes the code
//! - **Deployer** ([`deployer`]): composes the above behind one call
//!
//! All remote calls go through a [`FunctionPlatform`] supplied by the caller.
//!
//! # Example
//!
//! ```ignore
//! use stratus_deploy::{DeployConfig, Deployer, FunctionName};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = DeployConfig::load()?;
//! let deployer = Deployer::from_config(&config)?;
//!
//! let name = FunctionName::new("fn-65f1c0ab")?;
//! let outcome = deployer
//!     .deploy(&name, "exports.handler = async () => 'ok';", &CancellationToken::new())
//!     .await?;
//! println!("{} -> {:?}", outcome.name, outcome.action);
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod deployer;
pub mod error;
pub mod function;
pub mod layer;
pub mod package;
pub mod platform;
pub mod probe;
pub mod reconcile;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::{DeployConfig, DeploymentConfig, FunctionConfig, PlatformConfig, PlatformType};
pub use deployer::{DeployAction, DeployOutcome, Deployer};
pub use error::{DeployError, DeployResult};
pub use function::{ConfigDiff, DesiredConfiguration};
pub use package::{package, Archive};
pub use platform::{
    FunctionConfiguration, FunctionPlatform, HttpPlatform, MemoryPlatform, Operation,
    PlatformCall, PlatformError,
};
pub use reconcile::Reconciler;
pub use types::{FunctionName, LayerVersionRef};
