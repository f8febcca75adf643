use {
    alloy::signers::local::PrivateKeySigner,
    std::{
        fmt::{self, Display, Formatter},
        path::PathBuf,
        time::Duration,
    },
    url::Url,
};

#[derive(clap::Parser)]
pub struct LoggingArguments {
    #[clap(long, env, default_value = "warn,bank_kyc_deploy=info")]
    pub log_filter: String,

    /// Output log events as JSON.
    #[clap(long, env)]
    pub log_json: bool,
}

impl Display for LoggingArguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            log_filter,
            log_json,
        } = self;

        writeln!(f, "log_filter: {log_filter}")?;
        writeln!(f, "log_json: {log_json}")?;
        Ok(())
    }
}

#[derive(clap::Parser)]
pub struct Arguments {
    #[clap(flatten)]
    pub logging: LoggingArguments,

    /// The Ethereum node URL to connect to.
    #[clap(long, env, default_value = "http://localhost:8545")]
    pub node_url: Url,

    /// Directory containing the compiled contract artifacts.
    #[clap(long, env, default_value = "artifacts")]
    pub artifacts: PathBuf,

    /// Private key used to sign the deployment transaction. If omitted the
    /// transaction is sent from the node's first unlocked account.
    #[clap(long, env)]
    pub private_key: Option<PrivateKeySigner>,

    /// Number of confirmations to wait for before the deployment counts as
    /// successful.
    #[clap(
        long,
        env,
        default_value = "1",
        value_parser = clap::value_parser!(u64).range(1..),
    )]
    pub confirmations: u64,

    /// How often the node is polled while waiting for the deployment receipt.
    /// Defaults to the provider's interval for the connected chain.
    #[clap(long, env, value_parser = humantime::parse_duration)]
    pub poll_interval: Option<Duration>,
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            logging,
            node_url,
            artifacts,
            private_key,
            confirmations,
            poll_interval,
        } = self;

        write!(f, "{logging}")?;
        writeln!(f, "node_url: {node_url}")?;
        writeln!(f, "artifacts: {}", artifacts.display())?;
        display_secret_option(f, "private_key", private_key)?;
        writeln!(f, "confirmations: {confirmations}")?;
        display_option(
            f,
            "poll_interval",
            &poll_interval.map(humantime::format_duration),
        )?;
        Ok(())
    }
}

pub fn display_secret_option<T>(
    f: &mut Formatter<'_>,
    name: &str,
    option: &Option<T>,
) -> fmt::Result {
    display_option(f, name, &option.as_ref().map(|_| "SECRET"))
}

pub fn display_option(
    f: &mut Formatter<'_>,
    name: &str,
    option: &Option<impl Display>,
) -> fmt::Result {
    write!(f, "{name}: ")?;
    match option {
        Some(display) => writeln!(f, "{display}"),
        None => writeln!(f, "None"),
    }
}
