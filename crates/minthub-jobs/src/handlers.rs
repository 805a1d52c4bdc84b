//! Per-kind chain operation handlers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value as JsonValue};

use minthub_core::{
    CallArg, ChainGateway, ChainTransaction, Error, JobKind, MoveCall, Result, TokenAmount,
};

use crate::executor::ExecutorConfig;
use crate::handler::{JobContext, JobHandler};

/// Shared environment for the chain handlers: executor configuration
/// plus the submission gateway.
pub struct ChainEnv {
    config: ExecutorConfig,
    gateway: Arc<dyn ChainGateway>,
}

impl ChainEnv {
    pub fn new(config: ExecutorConfig, gateway: Arc<dyn ChainGateway>) -> Self {
        Self { config, gateway }
    }

    /// The executor configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// The full handler set, ready for executor registration.
    pub fn handlers(self: &Arc<Self>) -> Vec<Arc<dyn JobHandler>> {
        vec![
            Arc::new(MintHandler::new(self.clone())),
            Arc::new(BurnHandler::new(self.clone())),
            Arc::new(DistributeHandler::new(self.clone())),
            Arc::new(FreezeWalletHandler::new(self.clone())),
            Arc::new(TransferHandler::new(self.clone())),
        ]
    }

    fn dry_run(&self) -> bool {
        self.config.dry_run
    }

    fn treasury(&self) -> Result<String> {
        self.config
            .treasury_cap_id
            .clone()
            .ok_or_else(|| Error::Config("treasury cap id is not configured".into()))
    }

    /// Deterministic dry-run result: the operation is echoed back with
    /// its normalized payload instead of being submitted.
    fn mock_result(&self, kind: JobKind, payload: JsonValue) -> JsonValue {
        json!({
            "mock": true,
            "type": kind.as_str(),
            "payload": payload,
            "timestamp": Utc::now().to_rfc3339(),
        })
    }

    async fn submit(&self, calls: Vec<MoveCall>, kind: JobKind) -> Result<JsonValue> {
        let txn = ChainTransaction {
            calls,
            gas_budget: self.config.gas_budget,
        };
        let receipt = self.gateway.submit(txn, kind.as_str()).await?;
        Ok(serde_json::to_value(receipt)?)
    }
}

/// Handler for mint jobs.
pub struct MintHandler {
    env: Arc<ChainEnv>,
}

impl MintHandler {
    pub fn new(env: Arc<ChainEnv>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl JobHandler for MintHandler {
    fn kind(&self) -> JobKind {
        JobKind::Mint
    }

    async fn execute(&self, ctx: JobContext) -> Result<JsonValue> {
        let amount = TokenAmount::parse(ctx.payload().get("amount"))?;
        let recipient = ctx
            .str_field("recipient")
            .map(str::to_owned)
            .or_else(|| self.env.config().signer_address.clone())
            .ok_or_else(|| {
                Error::InvalidInput("recipient address missing for mint transaction".into())
            })?;

        if self.env.dry_run() {
            return Ok(self.env.mock_result(
                JobKind::Mint,
                json!({"amount": amount, "recipient": recipient}),
            ));
        }

        let call = MoveCall {
            target: self.env.config().target("mint")?,
            arguments: vec![
                CallArg::Object(self.env.treasury()?),
                CallArg::Pure(json!(amount.as_str())),
                CallArg::Pure(json!(recipient)),
            ],
        };
        self.env.submit(vec![call], JobKind::Mint).await
    }
}

/// Handler for burn jobs.
pub struct BurnHandler {
    env: Arc<ChainEnv>,
}

impl BurnHandler {
    pub fn new(env: Arc<ChainEnv>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl JobHandler for BurnHandler {
    fn kind(&self) -> JobKind {
        JobKind::Burn
    }

    async fn execute(&self, ctx: JobContext) -> Result<JsonValue> {
        let coin_id = ctx
            .str_field("coinId")
            .ok_or_else(|| Error::InvalidInput("coinId is required for burn transactions".into()))?
            .to_string();

        if self.env.dry_run() {
            return Ok(self
                .env
                .mock_result(JobKind::Burn, json!({"coinId": coin_id})));
        }

        let call = MoveCall {
            target: self.env.config().target("burn")?,
            arguments: vec![
                CallArg::Object(self.env.treasury()?),
                CallArg::Object(coin_id),
            ],
        };
        self.env.submit(vec![call], JobKind::Burn).await
    }
}

/// Handler for distribute jobs: one transaction, one mint call per entry.
pub struct DistributeHandler {
    env: Arc<ChainEnv>,
}

impl DistributeHandler {
    pub fn new(env: Arc<ChainEnv>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl JobHandler for DistributeHandler {
    fn kind(&self) -> JobKind {
        JobKind::Distribute
    }

    async fn execute(&self, ctx: JobContext) -> Result<JsonValue> {
        let entries = ctx
            .payload()
            .get("distributions")
            .and_then(|value| value.as_array())
            .filter(|entries| !entries.is_empty())
            .ok_or_else(|| Error::InvalidInput("distributions array is required".into()))?;

        // Validate every entry before building anything.
        let mut normalized: Vec<(String, TokenAmount)> = Vec::with_capacity(entries.len());
        for entry in entries {
            let to = entry
                .get("to")
                .and_then(|value| value.as_str())
                .ok_or_else(|| {
                    Error::InvalidInput(
                        "each distribution entry requires a recipient address".into(),
                    )
                })?;
            let amount = TokenAmount::parse(entry.get("amount"))?;
            normalized.push((to.to_string(), amount));
        }

        if self.env.dry_run() {
            let echoed: Vec<JsonValue> = normalized
                .iter()
                .map(|(to, amount)| json!({"to": to, "amount": amount}))
                .collect();
            return Ok(self
                .env
                .mock_result(JobKind::Distribute, json!({"distributions": echoed})));
        }

        let target = self.env.config().target("mint")?;
        let treasury = self.env.treasury()?;
        let calls = normalized
            .into_iter()
            .map(|(to, amount)| MoveCall {
                target: target.clone(),
                arguments: vec![
                    CallArg::Object(treasury.clone()),
                    CallArg::Pure(json!(amount.as_str())),
                    CallArg::Pure(json!(to)),
                ],
            })
            .collect();
        self.env.submit(calls, JobKind::Distribute).await
    }
}

/// Handler for freeze/unfreeze jobs.
pub struct FreezeWalletHandler {
    env: Arc<ChainEnv>,
}

impl FreezeWalletHandler {
    pub fn new(env: Arc<ChainEnv>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl JobHandler for FreezeWalletHandler {
    fn kind(&self) -> JobKind {
        JobKind::FreezeWallet
    }

    async fn execute(&self, ctx: JobContext) -> Result<JsonValue> {
        let address = ctx
            .str_field("address")
            .ok_or_else(|| {
                Error::InvalidInput("wallet address is required for freeze operations".into())
            })?
            .to_string();
        let freeze = ctx
            .payload()
            .get("freeze")
            .and_then(|value| value.as_bool())
            .unwrap_or(true);

        let config = self.env.config();
        let (Some(admin_cap), Some(registry)) =
            (config.admin_cap_id.clone(), config.registry_id.clone())
        else {
            return Err(Error::Config(
                "admin cap and registry ids are required for freeze operations".into(),
            ));
        };

        if self.env.dry_run() {
            return Ok(self.env.mock_result(
                JobKind::FreezeWallet,
                json!({"address": address, "freeze": freeze}),
            ));
        }

        let call = MoveCall {
            target: config.target("set_wallet_freeze")?,
            arguments: vec![
                CallArg::Object(admin_cap),
                CallArg::Object(registry),
                CallArg::Pure(json!(address)),
                CallArg::Pure(json!(freeze)),
            ],
        };
        self.env.submit(vec![call], JobKind::FreezeWallet).await
    }
}

/// Handler for transfer jobs.
///
/// Transfers are outside the retryable set: the executor fails them on
/// the first error instead of re-submitting.
pub struct TransferHandler {
    env: Arc<ChainEnv>,
}

impl TransferHandler {
    pub fn new(env: Arc<ChainEnv>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl JobHandler for TransferHandler {
    fn kind(&self) -> JobKind {
        JobKind::Transfer
    }

    async fn execute(&self, ctx: JobContext) -> Result<JsonValue> {
        let coin_id = ctx
            .str_field("coinId")
            .ok_or_else(|| {
                Error::InvalidInput("coinId is required for transfer transactions".into())
            })?
            .to_string();
        let recipient = ctx
            .str_field("recipient")
            .ok_or_else(|| {
                Error::InvalidInput("recipient address is required for transfer transactions".into())
            })?
            .to_string();

        if self.env.dry_run() {
            return Ok(self.env.mock_result(
                JobKind::Transfer,
                json!({"coinId": coin_id, "recipient": recipient}),
            ));
        }

        let call = MoveCall {
            target: self.env.config().target("transfer")?,
            arguments: vec![CallArg::Object(coin_id), CallArg::Pure(json!(recipient))],
        };
        self.env.submit(vec![call], JobKind::Transfer).await
    }
}
