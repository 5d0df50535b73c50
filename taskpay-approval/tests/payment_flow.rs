//! End-to-end payment flows across the gate, the requirement builder, and
//! the settlement executor, with the chain and email transports mocked.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::{Address, TxHash, U256, address};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use rust_decimal::dec;
use taskpay::{PaymentError, UnixTimestamp};
use taskpay_approval::{
    ApprovalEmail, ApprovalGate, ApprovalMailer, ApprovalStore, ApprovalStatus, BlockReason,
    GateDecision, MagicLinkWorkflow, MailerError, PaymentContext, Verdict,
};
use taskpay_evm::chain::{ChainClient, ReceiptOutcome};
use taskpay_evm::typed_data::{AuthorizationMessage, TokenDomain};
use taskpay_evm::wire::{EcdsaSignature, WireSignature};
use taskpay_evm::{RequirementBuilder, SettlementExecutor};

const OPERATOR: Address = address!("0x2222222222222222222222222222222222222222");

fn domain() -> TokenDomain {
    TokenDomain {
        name: "USDC".to_owned(),
        version: "2".to_owned(),
        chain_id: 84532,
        contract: address!("0x036CbD53842c5426634e7929541eC2318f3dCF7e"),
    }
}

fn builder() -> RequirementBuilder {
    RequirementBuilder::new(
        domain(),
        OPERATOR,
        6,
        "USDC".to_owned(),
        "base-sepolia".to_owned(),
        Duration::from_secs(3600),
    )
}

#[derive(Debug, Clone, Default)]
struct CapturingMailer {
    sent: Arc<Mutex<Vec<ApprovalEmail>>>,
}

impl CapturingMailer {
    fn last_token(&self) -> String {
        let sent = self.sent.lock().unwrap();
        let email = sent.last().expect("no email dispatched");
        email.approve_url.as_str().rsplit('/').next().unwrap().to_owned()
    }
}

#[async_trait]
impl ApprovalMailer for CapturingMailer {
    async fn send(&self, email: &ApprovalEmail) -> Result<(), MailerError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Chain fake: funded payer, funded gas wallet, transfers always settle.
#[derive(Debug)]
struct SettlingChain;

impl ChainClient for SettlingChain {
    async fn native_balance(&self, _address: Address) -> Result<U256, PaymentError> {
        Ok(U256::from(1_000_000_000u64))
    }

    async fn token_balance(&self, _address: Address) -> Result<U256, PaymentError> {
        Ok(U256::from(100_000_000u64))
    }

    async fn gas_price(&self) -> Result<u128, PaymentError> {
        Ok(1_000_000_000)
    }

    async fn transaction_count(&self, _address: Address) -> Result<u64, PaymentError> {
        Ok(7)
    }

    async fn submit_transfer_with_authorization(
        &self,
        _message: &AuthorizationMessage,
        _signature: &EcdsaSignature,
    ) -> Result<TxHash, PaymentError> {
        Ok(TxHash::repeat_byte(0xaa))
    }

    async fn wait_for_receipt(
        &self,
        tx: TxHash,
        _timeout: Duration,
    ) -> Result<ReceiptOutcome, PaymentError> {
        Ok(ReceiptOutcome::Settled(tx))
    }
}

async fn gate(mailer: CapturingMailer) -> ApprovalGate<CapturingMailer> {
    let store = ApprovalStore::in_memory().await.unwrap();
    let workflow = MagicLinkWorkflow::new(
        store,
        mailer,
        Duration::from_secs(600),
        "https://pay.example.com".parse().unwrap(),
    );
    ApprovalGate::new(workflow, dec!(0.002))
}

fn ctx(amount: rust_decimal::Decimal) -> PaymentContext {
    PaymentContext {
        task_id: "task-e2e".to_owned(),
        user_id: "user-1".to_owned(),
        user_email: "payer@example.com".to_owned(),
        amount,
        description: "web research".to_owned(),
    }
}

/// Cost $0.0015 under a $0.002 threshold: no approval, requirement built
/// at 1500 minor units, a validly signed authorization settles.
#[tokio::test]
async fn micro_payment_settles_without_approval() {
    let gate = gate(CapturingMailer::default()).await;
    assert_eq!(
        gate.evaluate(&ctx(dec!(0.0015))).await.unwrap(),
        GateDecision::ReadyToSign
    );

    let payer = PrivateKeySigner::random();
    let requirement = builder()
        .build("task-e2e", dec!(0.0015), Some(payer.address()))
        .unwrap();
    assert_eq!(requirement.amount_minor, 1500);

    // The client signs exactly the message it was handed.
    let message = requirement.message.decode().unwrap();
    let signature = payer.sign_hash_sync(&message.signing_hash(&domain())).unwrap();
    let wire_signature = WireSignature {
        v: 27 + u8::from(signature.v()),
        r: signature.r().to_string(),
        s: signature.s().to_string(),
    };

    let executor =
        SettlementExecutor::new(SettlingChain, domain(), OPERATOR, Duration::from_secs(120));
    let tx = executor
        .execute(&requirement.message, &wire_signature)
        .await
        .unwrap();
    assert_eq!(tx, TxHash::repeat_byte(0xaa));
}

/// Cost $0.05 over the threshold: a pending request is created, a wrong
/// token is rejected, denial is terminal, and the gate reports blocked.
#[tokio::test]
async fn large_payment_requires_approval_and_denial_blocks() {
    let mailer = CapturingMailer::default();
    let gate = gate(mailer.clone()).await;

    let decision = gate.evaluate(&ctx(dec!(0.05))).await.unwrap();
    let GateDecision::AwaitingApproval { request_id, expires_at } = decision else {
        panic!("expected AwaitingApproval, got {decision:?}");
    };
    assert!(expires_at > UnixTimestamp::now());

    let report = gate.workflow().check_status(&request_id).await.unwrap();
    assert_eq!(report.status, ApprovalStatus::Pending);

    let wrong = gate
        .workflow()
        .redeem("0000000000000000000000000000000000000000000000000000000000000000", Verdict::Approve)
        .await
        .unwrap_err();
    assert_eq!(wrong.reason_code(), "invalid_token");

    let redemption = gate
        .workflow()
        .redeem(&mailer.last_token(), Verdict::Deny)
        .await
        .unwrap();
    assert_eq!(redemption.status, ApprovalStatus::Denied);
    assert_eq!(redemption.task_id, "task-e2e");

    assert_eq!(
        gate.evaluate(&ctx(dec!(0.05))).await.unwrap(),
        GateDecision::Blocked {
            reason: BlockReason::ApprovalDenied
        }
    );
}

/// An approval observed on a later poll lets the payment proceed through
/// signing and settlement like any micro-payment.
#[tokio::test]
async fn approved_payment_proceeds_to_settlement() {
    let mailer = CapturingMailer::default();
    let gate = gate(mailer.clone()).await;

    let decision = gate.evaluate(&ctx(dec!(0.05))).await.unwrap();
    assert!(matches!(decision, GateDecision::AwaitingApproval { .. }));

    gate.workflow()
        .redeem(&mailer.last_token(), Verdict::Approve)
        .await
        .unwrap();
    assert_eq!(
        gate.evaluate(&ctx(dec!(0.05))).await.unwrap(),
        GateDecision::ReadyToSign
    );

    let payer = PrivateKeySigner::random();
    let requirement = builder()
        .build("task-e2e", dec!(0.05), Some(payer.address()))
        .unwrap();
    assert_eq!(requirement.amount_minor, 50_000);

    let message = requirement.message.decode().unwrap();
    let signature = payer.sign_hash_sync(&message.signing_hash(&domain())).unwrap();
    let wire_signature = WireSignature {
        v: 27 + u8::from(signature.v()),
        r: format!("{:#x}", signature.r()),
        s: format!("{:#x}", signature.s()),
    };

    let executor =
        SettlementExecutor::new(SettlingChain, domain(), OPERATOR, Duration::from_secs(120));
    executor
        .execute(&requirement.message, &wire_signature)
        .await
        .unwrap();
}
