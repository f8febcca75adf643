pub mod arguments;
pub mod artifact;
pub mod error;
pub mod node;
pub mod runner;
pub mod traits;

use {arguments::Arguments, node::NodeProvider};

/// The contract this tool deploys.
pub const CONTRACT_NAME: &str = "BankKycSystem";

/// Deploys the contract once and reports the outcome on stdout. Returns the
/// exit code for the process.
pub async fn run(args: Arguments) -> i32 {
    let provider = NodeProvider::new(&args);
    let outcome = runner::deploy(&provider, CONTRACT_NAME).await;
    runner::report(CONTRACT_NAME, outcome, &mut std::io::stdout().lock())
}
