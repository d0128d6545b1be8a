//! In-memory fixtures shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::contracts::{ChainApi, ExchangeApi, GatewayError, GatewayResult, TokenApi};
use crate::types::{EventKind, ExchangeEvent, Order, Trade};
use crate::units::{DECIMALS, ETHER_ADDRESS};

pub fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

pub fn token_addr() -> Address {
    addr(0xEE)
}

pub fn wei(n: u64) -> U256 {
    U256::from(n) * U256::from(DECIMALS)
}

/// A buy order by addr(0xA1): gives `ether` ETH for `tokens` NEX.
pub fn buy_order_at(id: u64, ether: u64, tokens: u64, ts: u64) -> Order {
    Order {
        id: U256::from(id),
        user: addr(0xA1),
        token_get: token_addr(),
        amount_get: wei(tokens),
        token_give: ETHER_ADDRESS,
        amount_give: wei(ether),
        timestamp: ts,
    }
}

/// A sell order by addr(0xA1): gives `tokens` NEX for `ether` ETH.
pub fn sell_order_at(id: u64, ether: u64, tokens: u64, ts: u64) -> Order {
    Order {
        id: U256::from(id),
        user: addr(0xA1),
        token_get: ETHER_ADDRESS,
        amount_get: wei(ether),
        token_give: token_addr(),
        amount_give: wei(tokens),
        timestamp: ts,
    }
}

pub fn order(id: u64, ether: u64, tokens: u64) -> Order {
    buy_order_at(id, ether, tokens, 1_700_000_000 + id)
}

pub fn trade_with(id: u64, ether: u64, tokens: u64, ts: u64) -> Trade {
    Trade {
        order: buy_order_at(id, ether, tokens, ts),
        user_fill: addr(0xF1),
    }
}

pub fn trade(id: u64, ether: u64, tokens: u64) -> Trade {
    trade_with(id, ether, tokens, 1_700_000_000 + id)
}

/// In-memory gateway implementing all three contract ports. Historical
/// streams and balances are seeded directly; live events are pushed
/// through the senders handed out by `subscribe`.
#[derive(Default)]
pub struct FakeGateway {
    pub cancels: Mutex<Vec<Order>>,
    pub trades: Mutex<Vec<Trade>>,
    pub orders: Mutex<Vec<Order>>,

    pub wallet_ether: Mutex<HashMap<Address, U256>>,
    pub wallet_token: Mutex<HashMap<Address, U256>>,
    /// (token, user) -> exchange-held balance
    pub exchange_balances: Mutex<HashMap<(Address, Address), U256>>,

    /// Method names that should fail with `Rejected`/`Provider`.
    pub failing: Mutex<HashSet<&'static str>>,
    /// Write calls in submission order, for sequencing assertions.
    pub calls: Mutex<Vec<String>>,

    pub taps: Mutex<HashMap<EventKind, mpsc::Sender<ExchangeEvent>>>,
    next_hash: AtomicU64,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, method: &'static str) {
        self.failing.lock().insert(method);
    }

    pub fn set_wallet_ether(&self, account: Address, amount: U256) {
        self.wallet_ether.lock().insert(account, amount);
    }

    pub fn set_wallet_token(&self, account: Address, amount: U256) {
        self.wallet_token.lock().insert(account, amount);
    }

    pub fn set_exchange_balance(&self, token: Address, user: Address, amount: U256) {
        self.exchange_balances.lock().insert((token, user), amount);
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Sender for a kind previously subscribed to.
    pub fn tap(&self, kind: EventKind) -> mpsc::Sender<ExchangeEvent> {
        self.taps
            .lock()
            .get(&kind)
            .cloned()
            .expect("no subscriber for event kind")
    }

    fn write(&self, name: &'static str, detail: String) -> GatewayResult<TxHash> {
        if self.failing.lock().contains(name) {
            return Err(GatewayError::Rejected(format!("{name} rejected by node")));
        }
        self.calls.lock().push(detail);
        let n = self.next_hash.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(TxHash::from_low_u64_be(n))
    }
}

#[async_trait]
impl ChainApi for FakeGateway {
    async fn ether_balance(&self, account: Address) -> GatewayResult<U256> {
        Ok(self
            .wallet_ether
            .lock()
            .get(&account)
            .copied()
            .unwrap_or_default())
    }
}

#[async_trait]
impl TokenApi for FakeGateway {
    fn address(&self) -> Address {
        token_addr()
    }

    async fn name(&self) -> GatewayResult<String> {
        Ok("NEX Token".to_string())
    }

    async fn symbol(&self) -> GatewayResult<String> {
        Ok("NEX".to_string())
    }

    async fn decimals(&self) -> GatewayResult<u8> {
        Ok(18)
    }

    async fn total_supply(&self) -> GatewayResult<U256> {
        Ok(wei(1_000_000))
    }

    async fn balance_of(&self, account: Address) -> GatewayResult<U256> {
        Ok(self
            .wallet_token
            .lock()
            .get(&account)
            .copied()
            .unwrap_or_default())
    }

    async fn allowance(&self, _owner: Address, _spender: Address) -> GatewayResult<U256> {
        Ok(U256::zero())
    }

    async fn approve(&self, spender: Address, amount: U256) -> GatewayResult<TxHash> {
        self.write("approve", format!("approve {spender:?} {amount}"))
    }

    async fn transfer(&self, to: Address, amount: U256) -> GatewayResult<TxHash> {
        self.write("transfer", format!("transfer {to:?} {amount}"))
    }

    async fn transfer_from(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> GatewayResult<TxHash> {
        self.write("transfer_from", format!("transfer_from {from:?} {to:?} {amount}"))
    }
}

#[async_trait]
impl ExchangeApi for FakeGateway {
    fn address(&self) -> Address {
        addr(0x5E)
    }

    async fn balance_of(&self, token: Address, user: Address) -> GatewayResult<U256> {
        Ok(self
            .exchange_balances
            .lock()
            .get(&(token, user))
            .copied()
            .unwrap_or_default())
    }

    async fn past_cancels(&self) -> GatewayResult<Vec<Order>> {
        if self.failing.lock().contains("past_cancels") {
            return Err(GatewayError::Provider("past_cancels unavailable".into()));
        }
        Ok(self.cancels.lock().clone())
    }

    async fn past_trades(&self) -> GatewayResult<Vec<Trade>> {
        if self.failing.lock().contains("past_trades") {
            return Err(GatewayError::Provider("past_trades unavailable".into()));
        }
        Ok(self.trades.lock().clone())
    }

    async fn past_orders(&self) -> GatewayResult<Vec<Order>> {
        if self.failing.lock().contains("past_orders") {
            return Err(GatewayError::Provider("past_orders unavailable".into()));
        }
        Ok(self.orders.lock().clone())
    }

    async fn subscribe(&self, kind: EventKind) -> GatewayResult<mpsc::Receiver<ExchangeEvent>> {
        let (tx, rx) = mpsc::channel(64);
        self.taps.lock().insert(kind, tx);
        Ok(rx)
    }

    async fn deposit_ether(&self, amount: U256) -> GatewayResult<TxHash> {
        self.write("deposit_ether", format!("deposit_ether {amount}"))
    }

    async fn withdraw_ether(&self, amount: U256) -> GatewayResult<TxHash> {
        self.write("withdraw_ether", format!("withdraw_ether {amount}"))
    }

    async fn deposit_token(&self, token: Address, amount: U256) -> GatewayResult<TxHash> {
        self.write("deposit_token", format!("deposit_token {token:?} {amount}"))
    }

    async fn withdraw_token(&self, token: Address, amount: U256) -> GatewayResult<TxHash> {
        self.write("withdraw_token", format!("withdraw_token {token:?} {amount}"))
    }

    async fn make_order(
        &self,
        token_get: Address,
        amount_get: U256,
        token_give: Address,
        amount_give: U256,
    ) -> GatewayResult<TxHash> {
        self.write(
            "make_order",
            format!("make_order get {token_get:?} {amount_get} give {token_give:?} {amount_give}"),
        )
    }

    async fn cancel_order(&self, id: U256) -> GatewayResult<TxHash> {
        self.write("cancel_order", format!("cancel_order {id}"))
    }

    async fn fill_order(&self, id: U256) -> GatewayResult<TxHash> {
        self.write("fill_order", format!("fill_order {id}"))
    }
}
