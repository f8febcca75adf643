use clap::Parser;

#[tokio::main]
async fn main() {
    let args = bank_kyc_deploy::arguments::Arguments::parse();
    observe::tracing::initialize(&observe::config::Config::new(
        &args.logging.log_filter,
        args.logging.log_json,
    ));
    tracing::info!("running deployment with validated arguments:\n{}", args);
    let code = bank_kyc_deploy::run(args).await;
    std::process::exit(code);
}
