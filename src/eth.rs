//! `ethers`-backed implementation of the contract ports: abigen
//! bindings over the token and exchange ABIs, a ws provider with the
//! session signer attached, and one forwarding task per event
//! subscription with a bounded reconnect loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::abi::Detokenize;
use ethers::contract::builders::ContractCall;
use ethers::contract::EthEvent;
use ethers::prelude::*;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::contracts::{ChainApi, ExchangeApi, GatewayError, GatewayResult, TokenApi};
use crate::types::{BalanceChange, EventKind, ExchangeEvent, Order, Trade};

mod token_abi {
    use ethers::prelude::abigen;

    abigen!(
        NexToken,
        r#"[
            event Transfer(address indexed from, address indexed to, uint256 value)
            event Approval(address indexed owner, address indexed spender, uint256 value)
            function name() view returns (string)
            function symbol() view returns (string)
            function decimals() view returns (uint8)
            function totalSupply() view returns (uint256)
            function balanceOf(address owner) view returns (uint256)
            function allowance(address owner, address spender) view returns (uint256)
            function transfer(address to, uint256 value) returns (bool)
            function transferFrom(address from, address to, uint256 value) returns (bool)
            function approve(address spender, uint256 value) returns (bool)
        ]"#
    );
}

mod exchange_abi {
    use ethers::prelude::abigen;

    abigen!(
        NexExchange,
        r#"[
            event Deposit(address token, address user, uint256 amount, uint256 balance)
            event Withdraw(address token, address user, uint256 amount, uint256 balance)
            event Order(uint256 id, address user, address tokenGet, uint256 amountGet, address tokenGive, uint256 amountGive, uint256 timestamp)
            event Cancel(uint256 id, address user, address tokenGet, uint256 amountGet, address tokenGive, uint256 amountGive, uint256 timestamp)
            event Trade(uint256 id, address user, address tokenGet, uint256 amountGet, address tokenGive, uint256 amountGive, address userFill, uint256 timestamp)
            function balanceOf(address token, address user) view returns (uint256)
            function depositEther() payable
            function withdrawEther(uint256 amount)
            function depositToken(address token, uint256 amount)
            function withdrawToken(address token, uint256 amount)
            function makeOrder(address tokenGet, uint256 amountGet, address tokenGive, uint256 amountGive)
            function cancelOrder(uint256 id)
            function fillOrder(uint256 id)
        ]"#
    );
}

use exchange_abi::{
    CancelFilter, DepositFilter, NexExchange, OrderFilter, TradeFilter, WithdrawFilter,
};
use token_abi::NexToken;

type Client = SignerMiddleware<Provider<Ws>, LocalWallet>;

impl From<OrderFilter> for Order {
    fn from(ev: OrderFilter) -> Self {
        Order {
            id: ev.id,
            user: ev.user,
            token_get: ev.token_get,
            amount_get: ev.amount_get,
            token_give: ev.token_give,
            amount_give: ev.amount_give,
            timestamp: ev.timestamp.as_u64(),
        }
    }
}

impl From<CancelFilter> for Order {
    fn from(ev: CancelFilter) -> Self {
        Order {
            id: ev.id,
            user: ev.user,
            token_get: ev.token_get,
            amount_get: ev.amount_get,
            token_give: ev.token_give,
            amount_give: ev.amount_give,
            timestamp: ev.timestamp.as_u64(),
        }
    }
}

impl From<TradeFilter> for Trade {
    fn from(ev: TradeFilter) -> Self {
        Trade {
            order: Order {
                id: ev.id,
                user: ev.user,
                token_get: ev.token_get,
                amount_get: ev.amount_get,
                token_give: ev.token_give,
                amount_give: ev.amount_give,
                timestamp: ev.timestamp.as_u64(),
            },
            user_fill: ev.user_fill,
        }
    }
}

impl From<DepositFilter> for BalanceChange {
    fn from(ev: DepositFilter) -> Self {
        BalanceChange {
            token: ev.token,
            user: ev.user,
            amount: ev.amount,
            balance: ev.balance,
        }
    }
}

impl From<WithdrawFilter> for BalanceChange {
    fn from(ev: WithdrawFilter) -> Self {
        BalanceChange {
            token: ev.token,
            user: ev.user,
            amount: ev.amount,
            balance: ev.balance,
        }
    }
}

fn provider_err<E: std::fmt::Display>(e: E) -> GatewayError {
    GatewayError::Provider(e.to_string())
}

fn rejected<E: std::fmt::Display>(e: E) -> GatewayError {
    GatewayError::Rejected(e.to_string())
}

/// One gateway serves all three ports over a shared ws connection.
pub struct EthGateway {
    client: Arc<Client>,
    token: NexToken<Client>,
    exchange: NexExchange<Client>,
    chain_id: u64,
}

impl EthGateway {
    /// Connect, attach the signer, and verify both deployments exist on
    /// this chain. Missing code at either address is the "switch
    /// network" condition, not a crash.
    pub async fn connect(config: &Config) -> GatewayResult<Self> {
        let provider = Provider::<Ws>::connect(&config.ws_url)
            .await
            .map_err(provider_err)?;
        let chain_id = provider
            .get_chainid()
            .await
            .map_err(provider_err)?
            .as_u64();

        let wallet = config
            .private_key
            .parse::<LocalWallet>()
            .map_err(|e| GatewayError::Provider(format!("invalid private key: {e}")))?
            .with_chain_id(chain_id);
        let client = Arc::new(SignerMiddleware::new(provider, wallet));

        ensure_deployed(&client, config.token_address, chain_id).await?;
        ensure_deployed(&client, config.exchange_address, chain_id).await?;

        info!("Connected to chain {} via {}", chain_id, config.ws_url);

        Ok(Self {
            token: NexToken::new(config.token_address, client.clone()),
            exchange: NexExchange::new(config.exchange_address, client.clone()),
            client,
            chain_id,
        })
    }

    /// The signer identity all writes are issued from.
    pub fn account(&self) -> Address {
        self.client.signer().address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

async fn ensure_deployed(
    client: &Arc<Client>,
    address: Address,
    chain_id: u64,
) -> GatewayResult<()> {
    let code = client
        .get_code(address, None)
        .await
        .map_err(provider_err)?;
    if code.as_ref().is_empty() {
        return Err(GatewayError::NotDeployed { address, chain_id });
    }
    Ok(())
}

async fn submit<D: Detokenize>(call: ContractCall<Client, D>) -> GatewayResult<TxHash> {
    let pending = call.send().await.map_err(rejected)?;
    Ok(*pending)
}

/// Forward one event kind from the chain into a channel for the life of
/// the session, resubscribing on stream failure.
fn spawn_listener<D, F>(
    exchange: NexExchange<Client>,
    kind: EventKind,
    tx: mpsc::Sender<ExchangeEvent>,
    convert: F,
) where
    D: EthEvent + Send + 'static,
    F: Fn(D) -> ExchangeEvent + Send + 'static,
{
    tokio::spawn(async move {
        let mut failures = 0u32;
        loop {
            let filter = exchange.event::<D>();
            match filter.subscribe().await {
                Ok(mut stream) => {
                    debug!("{} subscription established", kind.as_str());
                    failures = 0;
                    while let Some(item) = stream.next().await {
                        match item {
                            Ok(ev) => {
                                if tx.send(convert(ev)).await.is_err() {
                                    // Receiver dropped: session over
                                    return;
                                }
                            }
                            Err(e) => {
                                warn!("{} stream error: {}", kind.as_str(), e);
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("{} subscribe failed: {}", kind.as_str(), e);
                }
            }

            failures += 1;
            if failures > 10 {
                warn!("{} resubscribing too often, backing off", kind.as_str());
                tokio::time::sleep(Duration::from_secs(30)).await;
                failures = 0;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    });
}

#[async_trait]
impl ChainApi for EthGateway {
    async fn ether_balance(&self, account: Address) -> GatewayResult<U256> {
        self.client
            .get_balance(account, None)
            .await
            .map_err(provider_err)
    }
}

#[async_trait]
impl TokenApi for EthGateway {
    fn address(&self) -> Address {
        self.token.address()
    }

    async fn name(&self) -> GatewayResult<String> {
        self.token.name().call().await.map_err(provider_err)
    }

    async fn symbol(&self) -> GatewayResult<String> {
        self.token.symbol().call().await.map_err(provider_err)
    }

    async fn decimals(&self) -> GatewayResult<u8> {
        self.token.decimals().call().await.map_err(provider_err)
    }

    async fn total_supply(&self) -> GatewayResult<U256> {
        self.token.total_supply().call().await.map_err(provider_err)
    }

    async fn balance_of(&self, account: Address) -> GatewayResult<U256> {
        self.token
            .balance_of(account)
            .call()
            .await
            .map_err(provider_err)
    }

    async fn allowance(&self, owner: Address, spender: Address) -> GatewayResult<U256> {
        self.token
            .allowance(owner, spender)
            .call()
            .await
            .map_err(provider_err)
    }

    async fn approve(&self, spender: Address, amount: U256) -> GatewayResult<TxHash> {
        submit(self.token.approve(spender, amount)).await
    }

    async fn transfer(&self, to: Address, amount: U256) -> GatewayResult<TxHash> {
        submit(self.token.transfer(to, amount)).await
    }

    async fn transfer_from(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> GatewayResult<TxHash> {
        submit(self.token.transfer_from(from, to, amount)).await
    }
}

#[async_trait]
impl ExchangeApi for EthGateway {
    fn address(&self) -> Address {
        self.exchange.address()
    }

    async fn balance_of(&self, token: Address, user: Address) -> GatewayResult<U256> {
        self.exchange
            .balance_of(token, user)
            .call()
            .await
            .map_err(provider_err)
    }

    async fn past_cancels(&self) -> GatewayResult<Vec<Order>> {
        let events = self
            .exchange
            .event::<CancelFilter>()
            .from_block(0u64)
            .query()
            .await
            .map_err(provider_err)?;
        Ok(events.into_iter().map(Order::from).collect())
    }

    async fn past_trades(&self) -> GatewayResult<Vec<Trade>> {
        let events = self
            .exchange
            .event::<TradeFilter>()
            .from_block(0u64)
            .query()
            .await
            .map_err(provider_err)?;
        Ok(events.into_iter().map(Trade::from).collect())
    }

    async fn past_orders(&self) -> GatewayResult<Vec<Order>> {
        let events = self
            .exchange
            .event::<OrderFilter>()
            .from_block(0u64)
            .query()
            .await
            .map_err(provider_err)?;
        Ok(events.into_iter().map(Order::from).collect())
    }

    async fn subscribe(&self, kind: EventKind) -> GatewayResult<mpsc::Receiver<ExchangeEvent>> {
        let (tx, rx) = mpsc::channel(1024);
        let exchange = self.exchange.clone();
        match kind {
            EventKind::Cancel => spawn_listener::<CancelFilter, _>(exchange, kind, tx, |ev| {
                ExchangeEvent::Cancelled(ev.into())
            }),
            EventKind::Trade => spawn_listener::<TradeFilter, _>(exchange, kind, tx, |ev| {
                ExchangeEvent::Filled(ev.into())
            }),
            EventKind::Order => spawn_listener::<OrderFilter, _>(exchange, kind, tx, |ev| {
                ExchangeEvent::Placed(ev.into())
            }),
            EventKind::Deposit => spawn_listener::<DepositFilter, _>(exchange, kind, tx, |ev| {
                ExchangeEvent::Deposited(ev.into())
            }),
            EventKind::Withdraw => spawn_listener::<WithdrawFilter, _>(exchange, kind, tx, |ev| {
                ExchangeEvent::Withdrawn(ev.into())
            }),
        }
        Ok(rx)
    }

    async fn deposit_ether(&self, amount: U256) -> GatewayResult<TxHash> {
        submit(self.exchange.deposit_ether().value(amount)).await
    }

    async fn withdraw_ether(&self, amount: U256) -> GatewayResult<TxHash> {
        submit(self.exchange.withdraw_ether(amount)).await
    }

    async fn deposit_token(&self, token: Address, amount: U256) -> GatewayResult<TxHash> {
        submit(self.exchange.deposit_token(token, amount)).await
    }

    async fn withdraw_token(&self, token: Address, amount: U256) -> GatewayResult<TxHash> {
        submit(self.exchange.withdraw_token(token, amount)).await
    }

    async fn make_order(
        &self,
        token_get: Address,
        amount_get: U256,
        token_give: Address,
        amount_give: U256,
    ) -> GatewayResult<TxHash> {
        submit(
            self.exchange
                .make_order(token_get, amount_get, token_give, amount_give),
        )
        .await
    }

    async fn cancel_order(&self, id: U256) -> GatewayResult<TxHash> {
        submit(self.exchange.cancel_order(id)).await
    }

    async fn fill_order(&self, id: U256) -> GatewayResult<TxHash> {
        submit(self.exchange.fill_order(id)).await
    }
}
