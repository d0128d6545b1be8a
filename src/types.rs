use ethers::types::{Address, U256};
use serde::Serialize;

/// A limit order observed on the exchange contract. Immutable once seen;
/// `id` is contract-assigned and unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: U256,
    pub user: Address,
    pub token_get: Address,
    pub amount_get: U256,
    pub token_give: Address,
    pub amount_give: U256,
    /// Unix seconds, as emitted by the contract.
    pub timestamp: u64,
}

/// A filled order: the original order plus the counterparty that filled it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trade {
    pub order: Order,
    pub user_fill: Address,
}

/// Deposit/Withdraw event payload. `balance` is the user's exchange
/// balance for `token` after the transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceChange {
    pub token: Address,
    pub user: Address,
    pub amount: U256,
    pub balance: U256,
}

/// Exchange contract event kinds, one live listener each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Cancel,
    Trade,
    Order,
    Deposit,
    Withdraw,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Cancel,
        EventKind::Trade,
        EventKind::Order,
        EventKind::Deposit,
        EventKind::Withdraw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Cancel => "Cancel",
            EventKind::Trade => "Trade",
            EventKind::Order => "Order",
            EventKind::Deposit => "Deposit",
            EventKind::Withdraw => "Withdraw",
        }
    }
}

/// A decoded exchange contract event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeEvent {
    Cancelled(Order),
    Filled(Trade),
    Placed(Order),
    Deposited(BalanceChange),
    Withdrawn(BalanceChange),
}

impl ExchangeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ExchangeEvent::Cancelled(_) => EventKind::Cancel,
            ExchangeEvent::Filled(_) => EventKind::Trade,
            ExchangeEvent::Placed(_) => EventKind::Order,
            ExchangeEvent::Deposited(_) => EventKind::Deposit,
            ExchangeEvent::Withdrawn(_) => EventKind::Withdraw,
        }
    }
}

/// Order side from the maker's point of view: a buy gives ether for
/// tokens, a sell gives tokens for ether.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }

    /// Net effect on the viewer's token holdings.
    pub fn sign(&self) -> char {
        match self {
            Side::Buy => '+',
            Side::Sell => '-',
        }
    }
}

/// Display color class, matching the UI convention for up/down moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceClass {
    Green,
    Red,
}

impl PriceClass {
    /// CSS class the view layer attaches to the price cell.
    pub fn css_class(&self) -> &'static str {
        match self {
            PriceClass::Green => "success",
            PriceClass::Red => "danger",
        }
    }
}

impl From<Side> for PriceClass {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => PriceClass::Green,
            Side::Sell => PriceClass::Red,
        }
    }
}
