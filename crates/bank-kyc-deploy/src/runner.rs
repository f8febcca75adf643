use {
    crate::{error::DeployError, traits::FactoryProvider},
    std::io::Write,
};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Deploys a single instance of the named contract and returns its address
/// once the deployment is confirmed.
///
/// Every step waits for the previous one. There are no retries: the first
/// failure ends the run.
pub async fn deploy(provider: &dyn FactoryProvider, name: &str) -> Result<String, DeployError> {
    let factory = provider
        .contract_factory(name)
        .await
        .map_err(DeployError::Provider)?;
    let contract = factory.deploy().await.map_err(DeployError::Deployment)?;
    contract
        .confirmed()
        .await
        .map_err(DeployError::Confirmation)?;
    Ok(contract.address())
}

/// Writes the outcome of a deployment as a single line and returns the exit
/// code for the process.
///
/// Failures are written to the same output as successes. A result that
/// can't be written fails the run.
pub fn report(name: &str, outcome: Result<String, DeployError>, out: &mut impl Write) -> i32 {
    let (line, code) = match outcome {
        Ok(address) => {
            tracing::info!(%address, "deployment confirmed");
            (format!(" {name} deployed to:{address}"), EXIT_SUCCESS)
        }
        Err(err) => {
            tracing::error!(?err, "deployment failed");
            (err.to_string(), EXIT_FAILURE)
        }
    };
    if let Err(err) = writeln!(out, "{line}").and_then(|()| out.flush()) {
        tracing::error!(?err, "failed to write deployment outcome");
        return EXIT_FAILURE;
    }
    code
}
