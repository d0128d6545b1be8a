use ethers::types::{Address, U256};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::debug;

use crate::types::{Order, Trade};

/// One historical event stream plus its loaded flag. `loaded` flips true
/// only once the backing fetch has resolved; live events append to `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLog<T> {
    pub loaded: bool,
    pub data: Vec<T>,
}

impl<T> Default for EventLog<T> {
    fn default() -> Self {
        Self {
            loaded: false,
            data: Vec::new(),
        }
    }
}

/// New-order form state for one side. `making` is the in-flight flag set
/// between submission and the Order event coming back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderForm {
    pub making: bool,
    pub amount: Option<Decimal>,
    pub price: Option<Decimal>,
}

/// The single application state. Mutated only through `reduce`; observers
/// take whole-state snapshots keyed by a version counter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub account: Option<Address>,
    pub token_loaded: bool,
    pub exchange_loaded: bool,

    // Balance snapshots, latest value only
    pub wallet_ether: Option<U256>,
    pub wallet_token: Option<U256>,
    pub exchange_ether: Option<U256>,
    pub exchange_token: Option<U256>,
    pub balances_loading: bool,

    // Append-only event-derived collections
    pub cancelled_orders: EventLog<Order>,
    pub filled_orders: EventLog<Trade>,
    pub all_orders: EventLog<Order>,

    // In-flight transaction flags
    pub order_cancelling: bool,
    pub order_filling: bool,
    pub buy_order: OrderForm,
    pub sell_order: OrderForm,

    // Deposit/withdraw form amounts, display units
    pub ether_deposit_amount: Option<Decimal>,
    pub ether_withdraw_amount: Option<Decimal>,
    pub token_deposit_amount: Option<Decimal>,
    pub token_withdraw_amount: Option<Decimal>,
}

/// The closed set of state transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AccountLoaded(Address),
    TokenLoaded,
    ExchangeLoaded,

    WalletEtherBalanceLoaded(U256),
    WalletTokenBalanceLoaded(U256),
    ExchangeEtherBalanceLoaded(U256),
    ExchangeTokenBalanceLoaded(U256),
    BalancesLoading,
    BalancesLoaded,

    CancelledOrdersLoaded(Vec<Order>),
    FilledOrdersLoaded(Vec<Trade>),
    AllOrdersLoaded(Vec<Order>),

    OrderCancelling,
    OrderCancelled(Order),
    OrderFilling,
    OrderFilled(Trade),
    BuyOrderMaking,
    SellOrderMaking,
    OrderMade(Order),

    BuyOrderAmountChanged(Decimal),
    BuyOrderPriceChanged(Decimal),
    SellOrderAmountChanged(Decimal),
    SellOrderPriceChanged(Decimal),
    EtherDepositAmountChanged(Decimal),
    EtherWithdrawAmountChanged(Decimal),
    TokenDepositAmountChanged(Decimal),
    TokenWithdrawAmountChanged(Decimal),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::AccountLoaded(_) => "account_loaded",
            Action::TokenLoaded => "token_loaded",
            Action::ExchangeLoaded => "exchange_loaded",
            Action::WalletEtherBalanceLoaded(_) => "wallet_ether_balance_loaded",
            Action::WalletTokenBalanceLoaded(_) => "wallet_token_balance_loaded",
            Action::ExchangeEtherBalanceLoaded(_) => "exchange_ether_balance_loaded",
            Action::ExchangeTokenBalanceLoaded(_) => "exchange_token_balance_loaded",
            Action::BalancesLoading => "balances_loading",
            Action::BalancesLoaded => "balances_loaded",
            Action::CancelledOrdersLoaded(_) => "cancelled_orders_loaded",
            Action::FilledOrdersLoaded(_) => "filled_orders_loaded",
            Action::AllOrdersLoaded(_) => "all_orders_loaded",
            Action::OrderCancelling => "order_cancelling",
            Action::OrderCancelled(_) => "order_cancelled",
            Action::OrderFilling => "order_filling",
            Action::OrderFilled(_) => "order_filled",
            Action::BuyOrderMaking => "buy_order_making",
            Action::SellOrderMaking => "sell_order_making",
            Action::OrderMade(_) => "order_made",
            Action::BuyOrderAmountChanged(_) => "buy_order_amount_changed",
            Action::BuyOrderPriceChanged(_) => "buy_order_price_changed",
            Action::SellOrderAmountChanged(_) => "sell_order_amount_changed",
            Action::SellOrderPriceChanged(_) => "sell_order_price_changed",
            Action::EtherDepositAmountChanged(_) => "ether_deposit_amount_changed",
            Action::EtherWithdrawAmountChanged(_) => "ether_withdraw_amount_changed",
            Action::TokenDepositAmountChanged(_) => "token_deposit_amount_changed",
            Action::TokenWithdrawAmountChanged(_) => "token_withdraw_amount_changed",
        }
    }
}

/// Apply one transition. Each arm is a single synchronous state update,
/// so transitions never partially interleave.
pub fn reduce(state: &mut AppState, action: Action) {
    match action {
        Action::AccountLoaded(account) => state.account = Some(account),
        Action::TokenLoaded => state.token_loaded = true,
        Action::ExchangeLoaded => state.exchange_loaded = true,

        Action::WalletEtherBalanceLoaded(b) => state.wallet_ether = Some(b),
        Action::WalletTokenBalanceLoaded(b) => state.wallet_token = Some(b),
        Action::ExchangeEtherBalanceLoaded(b) => state.exchange_ether = Some(b),
        Action::ExchangeTokenBalanceLoaded(b) => state.exchange_token = Some(b),
        Action::BalancesLoading => state.balances_loading = true,
        Action::BalancesLoaded => state.balances_loading = false,

        Action::CancelledOrdersLoaded(orders) => {
            state.cancelled_orders = EventLog { loaded: true, data: orders };
        }
        Action::FilledOrdersLoaded(trades) => {
            state.filled_orders = EventLog { loaded: true, data: trades };
        }
        Action::AllOrdersLoaded(orders) => {
            state.all_orders = EventLog { loaded: true, data: orders };
        }

        Action::OrderCancelling => state.order_cancelling = true,
        Action::OrderCancelled(order) => {
            state.order_cancelling = false;
            state.cancelled_orders.data.push(order);
        }
        Action::OrderFilling => state.order_filling = true,
        Action::OrderFilled(trade) => {
            state.order_filling = false;
            // The same fill can arrive twice across reconnects
            let seen = state
                .filled_orders
                .data
                .iter()
                .any(|t| t.order.id == trade.order.id);
            if !seen {
                state.filled_orders.data.push(trade);
            }
        }
        Action::BuyOrderMaking => state.buy_order.making = true,
        Action::SellOrderMaking => state.sell_order.making = true,
        Action::OrderMade(order) => {
            state.buy_order.making = false;
            state.sell_order.making = false;
            let seen = state.all_orders.data.iter().any(|o| o.id == order.id);
            if !seen {
                state.all_orders.data.push(order);
            }
        }

        Action::BuyOrderAmountChanged(amount) => state.buy_order.amount = Some(amount),
        Action::BuyOrderPriceChanged(price) => state.buy_order.price = Some(price),
        Action::SellOrderAmountChanged(amount) => state.sell_order.amount = Some(amount),
        Action::SellOrderPriceChanged(price) => state.sell_order.price = Some(price),
        Action::EtherDepositAmountChanged(a) => state.ether_deposit_amount = Some(a),
        Action::EtherWithdrawAmountChanged(a) => state.ether_withdraw_amount = Some(a),
        Action::TokenDepositAmountChanged(a) => state.token_deposit_amount = Some(a),
        Action::TokenWithdrawAmountChanged(a) => state.token_withdraw_amount = Some(a),
    }
}

/// Shared state container. All mutation goes through `dispatch`; readers
/// take snapshots and can wait on the version channel for changes.
pub struct Store {
    state: RwLock<AppState>,
    version: watch::Sender<u64>,
}

impl Store {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: RwLock::new(AppState::default()),
            version,
        }
    }

    pub fn dispatch(&self, action: Action) {
        debug!("dispatch {}", action.name());
        {
            let mut state = self.state.write();
            reduce(&mut state, action);
        }
        self.version.send_modify(|v| *v += 1);
    }

    pub fn snapshot(&self) -> AppState {
        self.state.read().clone()
    }

    /// Version channel for change notification; receivers re-derive views
    /// from a fresh snapshot on each bump.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
