//! Live [`ChainClient`] backed by an alloy HTTP provider.
//!
//! The provider stack carries the service wallet, so every submitted
//! transfer is signed and paid for by the operator key. Gas price and the
//! account nonce are pinned explicitly at submission time rather than left
//! to the fillers, and the gas limit is a fixed constant — a
//! `transferWithAuthorization` call has a narrow, predictable cost.

use std::time::Duration;

use alloy_network::EthereumWallet;
use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::fillers::{
    BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
};
use alloy_provider::{Identity, Provider, ProviderBuilder, RootProvider};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::sol;
use taskpay::PaymentError;
use taskpay::config::EngineConfig;
#[cfg(feature = "telemetry")]
use tracing::instrument;
use url::Url;

use crate::chain::{ChainClient, ReceiptOutcome};
use crate::typed_data::AuthorizationMessage;
use crate::wire::EcdsaSignature;

sol! {
    /// Minimal ERC-3009 + ERC-20 surface used by the engine.
    ///
    /// Only the split-signature `transferWithAuthorization` overload is
    /// declared; it is the variant USDC-style tokens expose for (v, r, s)
    /// submissions.
    ///
    /// Reference: <https://eips.ethereum.org/EIPS/eip-3009>
    #[allow(missing_docs)]
    #[allow(clippy::too_many_arguments)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IEIP3009 {
        function balanceOf(address account) external view returns (uint256);
        function transferWithAuthorization(
            address from,
            address to,
            uint256 value,
            uint256 validAfter,
            uint256 validBefore,
            bytes32 nonce,
            uint8 v,
            bytes32 r,
            bytes32 s
        ) external;
    }
}

/// Gas limit for a `transferWithAuthorization` call.
const SETTLEMENT_GAS_LIMIT: u64 = 200_000;

/// Receipt polling cadence.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Combined filler type for gas, blob gas, nonce, and chain id.
pub type InnerFiller = JoinFill<
    GasFiller,
    JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>,
>;

/// The fully composed provider type: fillers plus the operator wallet over
/// a root HTTP provider.
pub type InnerProvider = FillProvider<
    JoinFill<JoinFill<Identity, InnerFiller>, WalletFiller<EthereumWallet>>,
    RootProvider,
>;

/// [`ChainClient`] implementation for EIP-155 chains.
pub struct Eip155ChainClient {
    inner: InnerProvider,
    token: Address,
    operator: Address,
}

impl std::fmt::Debug for Eip155ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Eip155ChainClient")
            .field("token", &self.token)
            .field("operator", &self.operator)
            .finish_non_exhaustive()
    }
}

impl Eip155ChainClient {
    /// Connects to `rpc_url` with the operator signer and token contract.
    #[must_use]
    pub fn connect(rpc_url: &Url, signer: PrivateKeySigner, token: Address) -> Self {
        let operator = signer.address();
        let wallet = EthereumWallet::from(signer);
        let filler = JoinFill::new(
            GasFiller,
            JoinFill::new(
                BlobGasFiller::default(),
                JoinFill::new(NonceFiller::default(), ChainIdFiller::default()),
            ),
        );
        let inner: InnerProvider = ProviderBuilder::default()
            .filler(filler)
            .wallet(wallet)
            .connect_http(rpc_url.clone());

        #[cfg(feature = "telemetry")]
        tracing::info!(rpc_url = %rpc_url, token = %token, operator = %operator, "Connected EVM chain client");

        Self {
            inner,
            token,
            operator,
        }
    }

    /// Builds a client from engine configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured operator key does not parse.
    pub fn from_config(config: &EngineConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let signer: PrivateKeySigner = config.operator.private_key.parse()?;
        Ok(Self::connect(
            &config.chain.rpc_url,
            signer,
            config.token.contract,
        ))
    }

    /// The service wallet address paying gas for settlements.
    #[must_use]
    pub const fn operator(&self) -> Address {
        self.operator
    }
}

impl ChainClient for Eip155ChainClient {
    async fn native_balance(&self, address: Address) -> Result<U256, PaymentError> {
        self.inner
            .get_balance(address)
            .await
            .map_err(|e| PaymentError::ChainUnavailable(e.to_string()))
    }

    async fn token_balance(&self, address: Address) -> Result<U256, PaymentError> {
        IEIP3009::new(self.token, &self.inner)
            .balanceOf(address)
            .call()
            .await
            .map_err(|e| PaymentError::ChainUnavailable(e.to_string()))
    }

    async fn gas_price(&self) -> Result<u128, PaymentError> {
        self.inner
            .get_gas_price()
            .await
            .map_err(|e| PaymentError::ChainUnavailable(e.to_string()))
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, PaymentError> {
        self.inner
            .get_transaction_count(address)
            .await
            .map_err(|e| PaymentError::ChainUnavailable(e.to_string()))
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(
        from = %message.from,
        value = %message.value,
        nonce = %message.nonce,
    )))]
    async fn submit_transfer_with_authorization(
        &self,
        message: &AuthorizationMessage,
        signature: &EcdsaSignature,
    ) -> Result<TxHash, PaymentError> {
        let gas_price = self.gas_price().await?;
        let chain_nonce = self.transaction_count(self.operator).await?;

        let contract = IEIP3009::new(self.token, &self.inner);
        let call = contract
            .transferWithAuthorization(
                message.from,
                message.to,
                message.value,
                U256::from(message.valid_after.as_secs()),
                U256::from(message.valid_before.as_secs()),
                message.nonce,
                signature.v,
                signature.r,
                signature.s,
            )
            .from(self.operator)
            .gas(SETTLEMENT_GAS_LIMIT)
            .gas_price(gas_price)
            .nonce(chain_nonce);

        let pending = call
            .send()
            .await
            .map_err(|e| PaymentError::ChainUnavailable(e.to_string()))?;
        let tx = *pending.tx_hash();

        #[cfg(feature = "telemetry")]
        tracing::info!(tx = %tx, "transferWithAuthorization submitted");

        Ok(tx)
    }

    #[cfg_attr(feature = "telemetry", instrument(skip(self), err))]
    async fn wait_for_receipt(
        &self,
        tx: TxHash,
        timeout: Duration,
    ) -> Result<ReceiptOutcome, PaymentError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let receipt = self
                .inner
                .get_transaction_receipt(tx)
                .await
                .map_err(|e| PaymentError::ChainUnavailable(e.to_string()))?;

            if let Some(receipt) = receipt {
                if receipt.status() {
                    return Ok(ReceiptOutcome::Settled(tx));
                }
                // The node does not return a reason with the receipt; a
                // revert string would require re-simulating the call.
                return Ok(ReceiptOutcome::Reverted { tx, reason: None });
            }

            if tokio::time::Instant::now() >= deadline {
                return Ok(ReceiptOutcome::Unconfirmed(tx));
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}
