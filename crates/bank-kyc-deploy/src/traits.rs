//! Trait definitions for the collaborators a deployment talks to.
//!
//! The runner only sees these traits so every step of a deployment can be
//! replaced by a mock in tests.

use anyhow::Result;

/// Hands out factories for compiled contracts.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FactoryProvider: Send + Sync {
    /// Returns a factory for the contract with the given name.
    ///
    /// Fails if no artifact for the contract can be located or loaded.
    async fn contract_factory(&self, name: &str) -> Result<Box<dyn ContractFactory>>;
}

/// Something that can create new instances of one contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ContractFactory: Send + Sync {
    /// Submits a deployment transaction. Resolves as soon as the transaction
    /// is accepted by the node, not when it is mined.
    async fn deploy(&self) -> Result<Box<dyn DeployedContract>>;
}

/// A submitted deployment.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DeployedContract: Send + Sync {
    /// Waits until the network confirmed the deployment.
    async fn confirmed(&self) -> Result<()>;

    /// Address the contract lives at once the deployment is confirmed.
    fn address(&self) -> String;
}
