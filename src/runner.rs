use crate::{
    config::Settings,
    error::{DeployError, Result},
    factory::{ContractFactoryProvider, DeployedContract},
};
use std::io::Write;
use tracing::{debug, info};

/// How a run ended. Maps onto the process exit code and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Deployed(DeployedContract),
    Failed,
}

impl Outcome {
    /// `0` after a deployment, `1` for any failure whatsoever.
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Deployed(_) => 0,
            Outcome::Failed => 1,
        }
    }
}

/// Deploys `settings.contract_name` with the configured wallet address as its
/// constructor argument.
///
/// The wallet address is not checked here; a missing value reaches the
/// factory as `None`. Not idempotent: calling this twice with the same
/// settings sends two transactions and creates two contracts.
pub async fn deploy<P>(settings: &Settings, provider: &P) -> Result<DeployedContract>
where
    P: ContractFactoryProvider + ?Sized,
{
    let address = settings.wallet_address.clone();
    if address.is_none() {
        debug!("WALLET_ADDRESS is not set, passing no value to the constructor");
    }

    let factory = provider.get_contract_factory(&settings.contract_name).await?;
    let deployed = factory.deploy(address).await?;

    info!(
        contract = %settings.contract_name,
        address = %deployed.address,
        tx = deployed.transaction_hash.as_deref().unwrap_or("-"),
        "contract deployed"
    );
    Ok(deployed)
}

/// Runs one deployment and reports it: the address line on `stdout` on
/// success, the error on `stderr` otherwise.
pub async fn run<P, O, E>(settings: &Settings, provider: &P, stdout: &mut O, stderr: &mut E) -> Outcome
where
    P: ContractFactoryProvider + ?Sized,
    O: Write,
    E: Write,
{
    match deploy(settings, provider).await {
        Ok(deployed) => {
            if let Err(e) = writeln!(stdout, "Contract Deployed to Address: {}", deployed.address) {
                return report_failure(&DeployError::Io(e), stderr);
            }
            Outcome::Deployed(deployed)
        }
        Err(e) => report_failure(&e, stderr),
    }
}

/// Applies the `--contract` override to freshly loaded settings. A load
/// failure is reported like any other and yields [`Outcome::Failed`].
pub fn load_settings<E: Write>(
    loaded: Result<Settings>,
    contract: Option<String>,
    stderr: &mut E,
) -> std::result::Result<Settings, Outcome> {
    match loaded {
        Ok(mut settings) => {
            if let Some(contract) = contract {
                settings.contract_name = contract;
            }
            Ok(settings)
        }
        Err(e) => Err(report_failure(&e, stderr)),
    }
}

/// Writes the error to `stderr` and turns it into [`Outcome::Failed`].
pub fn report_failure<E: Write>(err: &DeployError, stderr: &mut E) -> Outcome {
    // Nothing left to report to if stderr itself is gone.
    let _ = writeln!(stderr, "{}", err);
    Outcome::Failed
}
