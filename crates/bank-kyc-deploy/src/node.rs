//! Collaborators backed by an Ethereum node.

use {
    crate::{
        arguments::Arguments,
        artifact::{Artifact, ArtifactStore},
        traits::{ContractFactory, DeployedContract, FactoryProvider},
    },
    alloy::{
        network::{EthereumWallet, ReceiptResponse, TransactionBuilder},
        primitives::{Address, Bytes, TxHash},
        providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
        rpc::types::{TransactionReceipt, TransactionRequest},
    },
    anyhow::{Context, Result, ensure},
};

/// Loads factories from compiled artifacts and deploys them through a node.
pub struct NodeProvider {
    provider: DynProvider,
    /// Deployer when transactions are signed locally. `None` means the node's
    /// first unlocked account deploys.
    signer: Option<Address>,
    artifacts: ArtifactStore,
    confirmations: u64,
}

impl NodeProvider {
    pub fn new(args: &Arguments) -> Self {
        let builder = ProviderBuilder::new();
        let (provider, signer) = match &args.private_key {
            Some(signer) => (
                builder
                    .wallet(EthereumWallet::new(signer.clone()))
                    .connect_http(args.node_url.clone())
                    .erased(),
                Some(signer.address()),
            ),
            None => (builder.connect_http(args.node_url.clone()).erased(), None),
        };
        if let Some(interval) = args.poll_interval {
            provider.client().set_poll_interval(interval);
        }

        Self::with_provider(
            provider,
            signer,
            ArtifactStore::new(&args.artifacts),
            args.confirmations,
        )
    }

    pub fn with_provider(
        provider: DynProvider,
        signer: Option<Address>,
        artifacts: ArtifactStore,
        confirmations: u64,
    ) -> Self {
        Self {
            provider,
            signer,
            artifacts,
            confirmations,
        }
    }

    async fn deployer(&self) -> Result<Address> {
        if let Some(signer) = self.signer {
            return Ok(signer);
        }
        let accounts = self
            .provider
            .get_accounts()
            .await
            .context("failed to fetch node accounts")?;
        accounts
            .first()
            .copied()
            .context("node has no unlocked account to deploy from")
    }
}

#[async_trait::async_trait]
impl FactoryProvider for NodeProvider {
    async fn contract_factory(&self, name: &str) -> Result<Box<dyn ContractFactory>> {
        let artifact = self.artifacts.find(name)?;
        let bytecode = artifact.deployable()?;
        let deployer = self.deployer().await?;
        tracing::debug!(
            contract = %artifact.fully_qualified_name(),
            ?deployer,
            "loaded contract factory"
        );

        Ok(Box::new(NodeFactory {
            provider: self.provider.clone(),
            artifact,
            bytecode,
            deployer,
            confirmations: self.confirmations,
        }))
    }
}

pub struct NodeFactory {
    provider: DynProvider,
    artifact: Artifact,
    bytecode: Bytes,
    deployer: Address,
    confirmations: u64,
}

#[async_trait::async_trait]
impl ContractFactory for NodeFactory {
    async fn deploy(&self) -> Result<Box<dyn DeployedContract>> {
        if let Some(constructor) = &self.artifact.abi.constructor {
            ensure!(
                constructor.inputs.is_empty(),
                "constructor of {} expects {} arguments but none are supplied",
                self.artifact.contract_name,
                constructor.inputs.len(),
            );
        }

        // The address only depends on the deployer and its nonce, so it is
        // known before the transaction is mined.
        let nonce = self
            .provider
            .get_transaction_count(self.deployer)
            .pending()
            .await
            .context("failed to fetch deployer nonce")?;
        let address = self.deployer.create(nonce);

        let pending = self
            .provider
            .send_transaction(deployment_request(
                self.deployer,
                nonce,
                self.bytecode.clone(),
            ))
            .await
            .context("failed to send deployment transaction")?;
        let tx_hash = *pending.tx_hash();
        tracing::info!(
            contract = %self.artifact.contract_name,
            ?tx_hash,
            %address,
            nonce,
            "submitted deployment transaction"
        );

        Ok(Box::new(NodeContract {
            provider: self.provider.clone(),
            tx_hash,
            address,
            confirmations: self.confirmations,
        }))
    }
}

fn deployment_request(deployer: Address, nonce: u64, bytecode: Bytes) -> TransactionRequest {
    TransactionRequest::default()
        .with_from(deployer)
        .with_nonce(nonce)
        .with_deploy_code(bytecode)
}

pub struct NodeContract {
    provider: DynProvider,
    tx_hash: TxHash,
    address: Address,
    confirmations: u64,
}

impl NodeContract {
    async fn receipt(&self) -> Result<TransactionReceipt> {
        // Nodes that mine on submission already have the receipt, no need to
        // watch for blocks.
        if self.confirmations == 1 {
            let receipt = self
                .provider
                .get_transaction_receipt(self.tx_hash)
                .await
                .context("failed to fetch deployment receipt")?;
            if let Some(receipt) = receipt {
                return Ok(receipt);
            }
        }

        PendingTransactionBuilder::new(self.provider.root().clone(), self.tx_hash)
            .with_required_confirmations(self.confirmations)
            .get_receipt()
            .await
            .context("failed to wait for deployment receipt")
    }
}

#[async_trait::async_trait]
impl DeployedContract for NodeContract {
    async fn confirmed(&self) -> Result<()> {
        let receipt = self.receipt().await?;
        ensure!(
            receipt.status(),
            "deployment transaction {:?} reverted",
            self.tx_hash
        );
        if let Some(deployed) = receipt.contract_address() {
            ensure!(
                deployed == self.address,
                "contract was deployed to {deployed} instead of {}",
                self.address
            );
        }

        let code = self
            .provider
            .get_code_at(self.address)
            .await
            .context("failed to fetch deployed code")?;
        ensure!(
            !code.is_empty(),
            "contract not deployed: no code at {}",
            self.address
        );

        tracing::debug!(
            tx_hash = ?self.tx_hash,
            block = ?receipt.block_number(),
            gas_used = receipt.gas_used(),
            "deployment mined"
        );
        Ok(())
    }

    fn address(&self) -> String {
        self.address.to_checksum(None)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::artifact::{
            ArtifactError,
            tests::{BYTECODE, write_artifact, write_artifact_json},
        },
        alloy::{
            primitives::{B256, TxKind, address},
            providers::mock::Asserter,
        },
        clap::Parser,
        serde_json::json,
    };

    const DEPLOYER: Address = address!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0");

    fn mocked_provider(asserter: &Asserter, artifacts: &std::path::Path) -> NodeProvider {
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_mocked_client(asserter.clone())
            .erased();
        NodeProvider::with_provider(provider, None, ArtifactStore::new(artifacts), 1)
    }

    fn mocked_contract(asserter: &Asserter, address: Address) -> NodeContract {
        NodeContract {
            provider: ProviderBuilder::new()
                .disable_recommended_fillers()
                .connect_mocked_client(asserter.clone())
                .erased(),
            tx_hash: B256::repeat_byte(0x11),
            address,
            confirmations: 1,
        }
    }

    fn receipt(contract_address: Option<Address>, status: bool) -> serde_json::Value {
        json!({
            "transactionHash": B256::repeat_byte(0x11),
            "transactionIndex": "0x0",
            "blockHash": B256::repeat_byte(0x42),
            "blockNumber": "0x10",
            "from": DEPLOYER,
            "to": null,
            "contractAddress": contract_address,
            "gasUsed": "0x5208",
            "cumulativeGasUsed": "0x5208",
            "effectiveGasPrice": "0x3b9aca00",
            "logs": [],
            "logsBloom": format!("0x{}", "0".repeat(512)),
            "type": "0x2",
            "status": if status { "0x1" } else { "0x0" },
        })
    }

    fn provider(artifacts: &std::path::Path) -> NodeProvider {
        let args = Arguments::try_parse_from([
            "bank-kyc-deploy",
            "--node-url",
            "http://127.0.0.1:1",
            "--artifacts",
            artifacts.to_str().unwrap(),
            "--private-key",
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        ])
        .unwrap();
        NodeProvider::new(&args)
    }

    #[test]
    fn deployment_request_creates_contract() {
        let deployer = address!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0");
        let bytecode: Bytes = BYTECODE.parse().unwrap();

        let request = deployment_request(deployer, 7, bytecode.clone());

        assert_eq!(request.from, Some(deployer));
        assert_eq!(request.nonce, Some(7));
        assert_eq!(request.to, Some(TxKind::Create));
        assert_eq!(request.input.input(), Some(&bytecode));
    }

    #[test]
    fn predicted_address_follows_deployer_nonce() {
        let deployer = address!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0");
        assert_eq!(
            deployer.create(0),
            address!("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d")
        );
        assert_eq!(
            deployer.create(1),
            address!("343c43a37d37dff08ae8c4a11544c718abb4fcf8")
        );
    }

    #[tokio::test]
    async fn missing_artifact_fails_before_touching_the_node() {
        let dir = tempfile::tempdir().unwrap();
        let provider = provider(dir.path());

        let err = provider
            .contract_factory("BankKycSystem")
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<ArtifactError>(),
            Some(ArtifactError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn abstract_contract_has_no_factory() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), "contracts/IKyc.sol", "IKyc", "0x");
        let provider = provider(dir.path());

        let err = provider.contract_factory("IKyc").await.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ArtifactError>(),
            Some(ArtifactError::Abstract(_))
        ));
    }

    #[tokio::test]
    async fn constructor_arguments_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact_json(
            dir.path(),
            "contracts/Owned.sol",
            "Owned",
            json!({
                "contractName": "Owned",
                "sourceName": "contracts/Owned.sol",
                "abi": [{
                    "type": "constructor",
                    "stateMutability": "nonpayable",
                    "inputs": [{ "name": "owner", "type": "address", "internalType": "address" }],
                }],
                "bytecode": BYTECODE,
                "linkReferences": {},
            }),
        );
        // Signing locally means the factory is created without node access.
        let factory = provider(dir.path())
            .contract_factory("Owned")
            .await
            .unwrap();

        let err = factory.deploy().await.err().unwrap();
        assert_eq!(
            err.to_string(),
            "constructor of Owned expects 1 arguments but none are supplied"
        );
    }

    #[tokio::test]
    async fn deploys_from_first_unlocked_account() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(
            dir.path(),
            "contracts/BankKycSystem.sol",
            "BankKycSystem",
            BYTECODE,
        );
        let asserter = Asserter::new();
        let provider = mocked_provider(&asserter, dir.path());
        let expected = DEPLOYER.create(5);

        // eth_accounts
        asserter.push_success(&vec![DEPLOYER, Address::repeat_byte(0x22)]);
        let factory = provider.contract_factory("BankKycSystem").await.unwrap();

        // eth_getTransactionCount, eth_sendTransaction
        asserter.push_success(&"0x5");
        asserter.push_success(&B256::repeat_byte(0x11));
        let contract = factory.deploy().await.unwrap();
        assert_eq!(contract.address(), expected.to_checksum(None));

        // eth_getTransactionReceipt, eth_getCode
        asserter.push_success(&receipt(Some(expected), true));
        asserter.push_success(&"0x6080604052");
        contract.confirmed().await.unwrap();
        assert!(asserter.read_q().is_empty());
    }

    #[tokio::test]
    async fn node_without_accounts_cannot_deploy() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(
            dir.path(),
            "contracts/BankKycSystem.sol",
            "BankKycSystem",
            BYTECODE,
        );
        let asserter = Asserter::new();
        let provider = mocked_provider(&asserter, dir.path());

        asserter.push_success(&Vec::<Address>::new());
        let err = provider
            .contract_factory("BankKycSystem")
            .await
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "node has no unlocked account to deploy from"
        );
    }

    #[tokio::test]
    async fn reverted_deployment_is_not_confirmed() {
        let asserter = Asserter::new();
        let address = DEPLOYER.create(0);
        let contract = mocked_contract(&asserter, address);

        asserter.push_success(&receipt(Some(address), false));
        let err = contract.confirmed().await.unwrap_err();
        assert!(err.to_string().contains("reverted"), "{err}");
    }

    #[tokio::test]
    async fn deployment_to_unexpected_address_is_not_confirmed() {
        let asserter = Asserter::new();
        let contract = mocked_contract(&asserter, DEPLOYER.create(0));

        asserter.push_success(&receipt(Some(DEPLOYER.create(1)), true));
        let err = contract.confirmed().await.unwrap_err();
        assert!(err.to_string().contains("instead of"), "{err}");
    }

    #[tokio::test]
    async fn deployment_without_code_is_not_confirmed() {
        let asserter = Asserter::new();
        let address = DEPLOYER.create(0);
        let contract = mocked_contract(&asserter, address);

        asserter.push_success(&receipt(Some(address), true));
        asserter.push_success(&"0x");
        let err = contract.confirmed().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("contract not deployed: no code at {address}")
        );
    }
}
