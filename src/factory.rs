//! Contract factories.
//!
//! The runner only sees the two traits below. The ethers-backed implementation
//! resolves a compiled artifact, connects a signing client and submits the
//! deployment transaction.

use crate::{
    artifact::{load_artifact, Artifact},
    config::Settings,
    error::{DeployError, Result},
};
use async_trait::async_trait;
use ethers::{
    abi::{
        token::{LenientTokenizer, Tokenizer},
        Abi, ParamType, Token,
    },
    contract::ContractFactory as DeploymentFactory,
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::Address,
    utils::to_checksum,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// What a finished deployment hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
    pub address: String,
    pub transaction_hash: Option<String>,
}

/// Builds and submits deployment transactions for one contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractFactory: Send + Sync {
    /// Deploys a new instance. `argument` fills the single constructor slot;
    /// `None` is passed through untouched and it is up to the factory to
    /// refuse it.
    ///
    /// Every call is a new transaction and yields a new contract.
    async fn deploy(&self, argument: Option<String>) -> Result<DeployedContract>;
}

/// Looks up factories by contract name.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractFactoryProvider: Send + Sync {
    async fn get_contract_factory(&self, name: &str) -> Result<Box<dyn ContractFactory>>;
}

/// Factory provider backed by Hardhat artifacts on disk and an HTTP JSON-RPC
/// node, signing with a local private key.
pub struct EthersFactoryProvider {
    artifacts_dir: PathBuf,
    rpc_url: String,
    private_key: Option<String>,
    confirmations: usize,
}

impl EthersFactoryProvider {
    pub fn new(settings: &Settings) -> Self {
        Self {
            artifacts_dir: settings.artifacts_dir.clone(),
            rpc_url: settings.ethereum_rpc_url.clone(),
            private_key: settings.private_key.clone(),
            confirmations: settings.deploy_confirmations,
        }
    }

    fn wallet(&self) -> Result<LocalWallet> {
        let key = self
            .private_key
            .as_deref()
            .ok_or_else(|| DeployError::Signer("PRIVATE_KEY is not set".to_string()))?;
        key.trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| DeployError::Signer(e.to_string()))
    }

    async fn connect(&self, wallet: LocalWallet) -> Result<Arc<SignerClient>> {
        let provider = Provider::<Http>::try_from(self.rpc_url.as_str())
            .map_err(|e| DeployError::Provider(e.to_string()))?;
        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| DeployError::Provider(e.to_string()))?;
        debug!(rpc_url = %self.rpc_url, %chain_id, "connected to node");

        let wallet = wallet.with_chain_id(chain_id.as_u64());
        info!(deployer = %to_checksum(&wallet.address(), None), "using deployer account");
        Ok(Arc::new(SignerMiddleware::new(provider, wallet)))
    }
}

#[async_trait]
impl ContractFactoryProvider for EthersFactoryProvider {
    async fn get_contract_factory(&self, name: &str) -> Result<Box<dyn ContractFactory>> {
        let artifact = load_artifact(&self.artifacts_dir, name)?;
        info!(contract = %artifact.fully_qualified_name(), "loaded artifact");

        let wallet = self.wallet()?;
        let client = self.connect(wallet).await?;

        Ok(Box::new(EthersContractFactory {
            artifact,
            client,
            confirmations: self.confirmations,
        }))
    }
}

pub struct EthersContractFactory {
    artifact: Artifact,
    client: Arc<SignerClient>,
    confirmations: usize,
}

#[async_trait]
impl ContractFactory for EthersContractFactory {
    async fn deploy(&self, argument: Option<String>) -> Result<DeployedContract> {
        let tokens = encode_constructor_argument(&self.artifact.abi, argument)?;

        let factory = DeploymentFactory::new(
            self.artifact.abi.clone(),
            self.artifact.bytecode.clone(),
            self.client.clone(),
        );
        let deployer = factory
            .deploy_tokens(tokens)
            .map_err(|e| DeployError::Deployment(e.to_string()))?
            .confirmations(self.confirmations);

        info!(
            contract = %self.artifact.contract_name,
            confirmations = self.confirmations,
            "sending deployment transaction"
        );
        let (contract, receipt) = deployer
            .send_with_receipt()
            .await
            .map_err(|e| DeployError::Deployment(e.to_string()))?;

        Ok(DeployedContract {
            address: to_checksum(&contract.address(), None),
            transaction_hash: Some(format!("{:?}", receipt.transaction_hash)),
        })
    }
}

/// Encodes the single constructor argument against the contract's ABI.
pub fn encode_constructor_argument(abi: &Abi, argument: Option<String>) -> Result<Vec<Token>> {
    let inputs = abi
        .constructor()
        .map(|constructor| constructor.inputs.as_slice())
        .unwrap_or_default();
    if inputs.len() != 1 {
        return Err(DeployError::ConstructorArguments(format!(
            "constructor expects {} arguments, got 1",
            inputs.len()
        )));
    }

    let param = &inputs[0];
    let value = argument.ok_or_else(|| {
        DeployError::ConstructorArguments(format!(
            "missing value for constructor argument {} ({})",
            param.name, param.kind
        ))
    })?;
    let token = match &param.kind {
        ParamType::Address => value
            .parse::<Address>()
            .map(Token::Address)
            .map_err(|e| e.to_string()),
        kind => LenientTokenizer::tokenize(kind, &value).map_err(|e| e.to_string()),
    }
    .map_err(|e| {
        DeployError::ConstructorArguments(format!(
            "invalid value {:?} for constructor argument {} ({}): {}",
            value, param.name, param.kind, e
        ))
    })?;

    Ok(vec![token])
}
