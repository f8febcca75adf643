/// Reasons a deployment run can fail. All of them are fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("failed to get contract factory: {0:#}")]
    Provider(anyhow::Error),
    #[error("failed to submit deployment: {0:#}")]
    Deployment(anyhow::Error),
    #[error("deployment was not confirmed: {0:#}")]
    Confirmation(anyhow::Error),
}
