use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::types::{EventKind, ExchangeEvent, Order, Trade};

/// Errors crossing the contract boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No contract code at the configured address on the connected chain.
    /// The fix is on the user's side: switch networks.
    #[error("no contract deployed at {address} on chain {chain_id}")]
    NotDeployed { address: Address, chain_id: u64 },

    #[error("provider error: {0}")]
    Provider(String),

    /// The node refused the transaction at submission time. No event will
    /// ever arrive for it.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("event subscription failed: {0}")]
    Subscription(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Read access to the chain itself, outside any contract.
#[async_trait]
pub trait ChainApi: Send + Sync {
    /// Wallet balance in native currency.
    async fn ether_balance(&self, account: Address) -> GatewayResult<U256>;
}

/// The ERC-20 token contract surface the client relies on.
#[async_trait]
pub trait TokenApi: Send + Sync {
    fn address(&self) -> Address;

    async fn name(&self) -> GatewayResult<String>;
    async fn symbol(&self) -> GatewayResult<String>;
    async fn decimals(&self) -> GatewayResult<u8>;
    async fn total_supply(&self) -> GatewayResult<U256>;
    async fn balance_of(&self, account: Address) -> GatewayResult<U256>;
    async fn allowance(&self, owner: Address, spender: Address) -> GatewayResult<U256>;

    // Writes resolve once the transaction is accepted into the pending
    // pool; the returned hash is the only immediate acknowledgement.
    async fn approve(&self, spender: Address, amount: U256) -> GatewayResult<TxHash>;
    async fn transfer(&self, to: Address, amount: U256) -> GatewayResult<TxHash>;
    async fn transfer_from(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> GatewayResult<TxHash>;
}

/// The exchange contract surface: balances, historical event streams,
/// live subscriptions and the transaction-issuing calls.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    fn address(&self) -> Address;

    /// Exchange-held balance of `token` for `user`. The native-currency
    /// sentinel address queries the ether balance.
    async fn balance_of(&self, token: Address, user: Address) -> GatewayResult<U256>;

    // Historical event streams, genesis to latest, in chain emission order.
    async fn past_cancels(&self) -> GatewayResult<Vec<Order>>;
    async fn past_trades(&self) -> GatewayResult<Vec<Trade>>;
    async fn past_orders(&self) -> GatewayResult<Vec<Order>>;

    /// Long-lived subscription to one event kind. Events arrive in
    /// emission order within a kind; no ordering across kinds.
    async fn subscribe(&self, kind: EventKind) -> GatewayResult<mpsc::Receiver<ExchangeEvent>>;

    async fn deposit_ether(&self, amount: U256) -> GatewayResult<TxHash>;
    async fn withdraw_ether(&self, amount: U256) -> GatewayResult<TxHash>;
    async fn deposit_token(&self, token: Address, amount: U256) -> GatewayResult<TxHash>;
    async fn withdraw_token(&self, token: Address, amount: U256) -> GatewayResult<TxHash>;
    async fn make_order(
        &self,
        token_get: Address,
        amount_get: U256,
        token_give: Address,
        amount_give: U256,
    ) -> GatewayResult<TxHash>;
    async fn cancel_order(&self, id: U256) -> GatewayResult<TxHash>;
    async fn fill_order(&self, id: U256) -> GatewayResult<TxHash>;
}
