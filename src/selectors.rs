//! Pure views over an [`AppState`] snapshot. Recomputed on every state
//! version; nothing here mutates or performs I/O.

use std::cmp::Ordering;
use std::collections::HashSet;

use ethers::types::U256;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::decorate::{
    decorate_book_order, decorate_filled_orders, decorate_my_trade, BookOrder, MyTrade, TapeTrade,
};
use crate::store::AppState;
use crate::types::{Order, Side, Trade};
use crate::units::format_balance;

pub fn contracts_loaded(state: &AppState) -> bool {
    state.token_loaded && state.exchange_loaded
}

pub fn filled_orders_loaded(state: &AppState) -> bool {
    state.filled_orders.loaded
}

pub fn price_chart_loaded(state: &AppState) -> bool {
    state.filled_orders.loaded
}

/// The order book needs all three historical streams before the open set
/// is meaningful.
pub fn order_book_loaded(state: &AppState) -> bool {
    state.cancelled_orders.loaded && state.filled_orders.loaded && state.all_orders.loaded
}

pub fn my_open_orders_loaded(state: &AppState) -> bool {
    order_book_loaded(state)
}

pub fn my_filled_orders_loaded(state: &AppState) -> bool {
    state.filled_orders.loaded
}

/// Orders neither filled nor cancelled, by id membership.
pub fn open_orders(state: &AppState) -> Vec<Order> {
    let filled: HashSet<U256> = state
        .filled_orders
        .data
        .iter()
        .map(|t| t.order.id)
        .collect();
    let cancelled: HashSet<U256> = state.cancelled_orders.data.iter().map(|o| o.id).collect();

    state
        .all_orders
        .data
        .iter()
        .filter(|o| !filled.contains(&o.id) && !cancelled.contains(&o.id))
        .cloned()
        .collect()
}

/// Descending by price; unpriceable orders sink to the bottom.
fn price_desc(a: &BookOrder, b: &BookOrder) -> Ordering {
    match (a.token_price, b.token_price) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderBookView {
    pub buy_orders: Vec<BookOrder>,
    pub sell_orders: Vec<BookOrder>,
}

pub fn order_book(state: &AppState) -> OrderBookView {
    let mut view = OrderBookView::default();
    for order in open_orders(state) {
        let decorated = decorate_book_order(&order);
        match decorated.side {
            Side::Buy => view.buy_orders.push(decorated),
            Side::Sell => view.sell_orders.push(decorated),
        }
    }
    view.buy_orders.sort_by(price_desc);
    view.sell_orders.sort_by(price_desc);
    view
}

/// The trade tape, most recent first. Price classes are computed on the
/// ascending pass before the display re-sort.
pub fn filled_orders(state: &AppState) -> Vec<TapeTrade> {
    let mut trades = state.filled_orders.data.clone();
    trades.sort_by_key(|t| t.order.timestamp);
    let mut tape = decorate_filled_orders(&trades);
    tape.sort_by(|a, b| b.trade.order.timestamp.cmp(&a.trade.order.timestamp));
    tape
}

/// The session account's open orders, newest first.
pub fn my_open_orders(state: &AppState) -> Vec<BookOrder> {
    let Some(account) = state.account else {
        return Vec::new();
    };
    let mut mine: Vec<BookOrder> = open_orders(state)
        .iter()
        .filter(|o| o.user == account)
        .map(decorate_book_order)
        .collect();
    mine.sort_by(|a, b| b.order.timestamp.cmp(&a.order.timestamp));
    mine
}

/// Fills where the session account was maker or filler, oldest first.
pub fn my_filled_orders(state: &AppState) -> Vec<MyTrade> {
    let Some(account) = state.account else {
        return Vec::new();
    };
    let mut trades: Vec<Trade> = state
        .filled_orders
        .data
        .iter()
        .filter(|t| t.order.user == account || t.user_fill == account)
        .cloned()
        .collect();
    trades.sort_by_key(|t| t.order.timestamp);
    trades
        .iter()
        .map(|t| decorate_my_trade(t, account))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceDirection {
    Up,
    Down,
}

/// One hour of trading, bucketed by the hour containing the trades.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    /// Unix seconds of the bucket's hour start.
    pub hour: u64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceChartView {
    pub last_price: Option<Decimal>,
    /// Compares the two most recent trades overall, not bucket-local.
    pub direction: PriceDirection,
    pub series: Vec<Candle>,
}

pub fn price_chart(state: &AppState) -> PriceChartView {
    let mut trades = state.filled_orders.data.clone();
    trades.sort_by_key(|t| t.order.timestamp);
    let tape = decorate_filled_orders(&trades);

    let last_price = tape.last().and_then(|t| t.token_price);
    let second_last = if tape.len() >= 2 {
        tape[tape.len() - 2].token_price
    } else {
        None
    }
    .unwrap_or(Decimal::ZERO);
    let direction = if last_price.unwrap_or(Decimal::ZERO) >= second_last {
        PriceDirection::Up
    } else {
        PriceDirection::Down
    };

    // Ascending input keeps each hour's trades contiguous
    let mut series: Vec<Candle> = Vec::new();
    for t in &tape {
        let Some(price) = t.token_price else {
            // Unpriceable trades cannot chart
            continue;
        };
        let hour = t.trade.order.timestamp - t.trade.order.timestamp % 3600;
        match series.last_mut() {
            Some(candle) if candle.hour == hour => {
                candle.high = candle.high.max(price);
                candle.low = candle.low.min(price);
                candle.close = price;
            }
            _ => series.push(Candle {
                hour,
                open: price,
                high: price,
                low: price,
                close: price,
            }),
        }
    }

    PriceChartView {
        last_price,
        direction,
        series,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalancesView {
    pub loading: bool,
    pub wallet_ether: Option<Decimal>,
    pub wallet_token: Option<Decimal>,
    pub exchange_ether: Option<Decimal>,
    pub exchange_token: Option<Decimal>,
}

pub fn balances(state: &AppState) -> BalancesView {
    BalancesView {
        loading: state.balances_loading,
        wallet_ether: state.wallet_ether.and_then(format_balance),
        wallet_token: state.wallet_token.and_then(format_balance),
        exchange_ether: state.exchange_ether.and_then(format_balance),
        exchange_token: state.exchange_token.and_then(format_balance),
    }
}

/// The new-order form hides while either side's submission is in flight.
pub fn show_order_form(state: &AppState) -> bool {
    !state.buy_order.making && !state.sell_order.making
}
