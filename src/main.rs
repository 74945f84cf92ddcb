use clap::Parser;
use lock_deployer::{config, runner, EthersFactoryProvider, Settings};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "deploy", about = "Deploy a contract with WALLET_ADDRESS as constructor argument")]
struct Cli {
    /// Env file to load before reading configuration. `.env` is used when present.
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Contract to deploy, plain (`Lock`) or fully qualified
    /// (`contracts/Lock.sol:Lock`). Overrides CONTRACT_NAME.
    #[arg(long)]
    contract: Option<String>,

    /// Tracing filter directives. Overrides RUST_LOG.
    #[arg(long)]
    log_filter: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Before tracing, so RUST_LOG from the env file applies.
    let env_file = config::load_env_file(cli.env_file.as_deref());
    init_tracing(cli.log_filter.as_deref());
    if let Ok(env_file) = &env_file {
        env_file.report();
    }

    let mut stderr = std::io::stderr();
    let loaded = env_file.and_then(|_| Settings::from_env());
    let settings = match runner::load_settings(loaded, cli.contract, &mut stderr) {
        Ok(settings) => settings,
        Err(outcome) => return ExitCode::from(outcome.exit_code()),
    };
    debug!(?settings, "loaded configuration");

    let provider = EthersFactoryProvider::new(&settings);
    let outcome = runner::run(&settings, &provider, &mut std::io::stdout(), &mut stderr).await;
    ExitCode::from(outcome.exit_code())
}

fn init_tracing(explicit: Option<&str>) {
    let from_env = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(config::log_filter(explicit, from_env.as_deref()))
        .with_writer(std::io::stderr)
        .init();
}
