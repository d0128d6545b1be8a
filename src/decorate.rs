use chrono::{TimeZone, Utc};
use ethers::types::{Address, U256};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::types::{Order, PriceClass, Side, Trade};
use crate::units::{to_display_units, ETHER_ADDRESS};

/// Price precision for display, ether per token.
const PRICE_DP: u32 = 5;

/// Which side of the order is native currency decides the side label:
/// giving ether for tokens is a buy.
pub fn order_side(order: &Order) -> Side {
    if order.token_give == ETHER_ADDRESS {
        Side::Buy
    } else {
        Side::Sell
    }
}

/// Ether-per-token price from the raw amounts. The ratio is scale-free,
/// so it equals the display-unit price. A zero token amount is a
/// degenerate order and prices as `None` rather than panicking.
fn token_price(ether_raw: U256, token_raw: U256) -> Option<Decimal> {
    if token_raw.is_zero() {
        return None;
    }
    let e = Decimal::from_str_exact(&ether_raw.to_string()).ok()?;
    let t = Decimal::from_str_exact(&token_raw.to_string()).ok()?;
    Some((e / t).round_dp_with_strategy(PRICE_DP, RoundingStrategy::MidpointAwayFromZero))
}

fn format_timestamp(ts: u64) -> String {
    match Utc.timestamp_opt(ts as i64, 0).single() {
        Some(dt) => dt.format("%H:%M:%S %m/%d").to_string(),
        None => ts.to_string(),
    }
}

/// Shared derived amounts: (ether display, token display, price).
fn amounts(order: &Order) -> (Option<Decimal>, Option<Decimal>, Option<Decimal>) {
    let (ether_raw, token_raw) = if order.token_give == ETHER_ADDRESS {
        (order.amount_give, order.amount_get)
    } else {
        (order.amount_get, order.amount_give)
    };
    (
        to_display_units(ether_raw),
        to_display_units(token_raw),
        token_price(ether_raw, token_raw),
    )
}

/// A trade decorated for the trade tape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TapeTrade {
    pub trade: Trade,
    pub ether_amount: Option<Decimal>,
    pub token_amount: Option<Decimal>,
    pub token_price: Option<Decimal>,
    pub formatted_timestamp: String,
    /// Green when the price held or rose against the previous trade.
    pub price_class: PriceClass,
}

/// Decorate trades for the tape. Input must already be in
/// timestamp-ascending order; the price class of each trade is a
/// sequential fold against the immediately preceding decorated trade.
pub fn decorate_filled_orders(trades: &[Trade]) -> Vec<TapeTrade> {
    let mut out: Vec<TapeTrade> = Vec::with_capacity(trades.len());
    for trade in trades {
        let (ether_amount, token_amount, price) = amounts(&trade.order);
        let price_class = match out.last() {
            None => PriceClass::Green,
            Some(prev) => match (prev.token_price, price) {
                (Some(p), Some(c)) if p <= c => PriceClass::Green,
                _ => PriceClass::Red,
            },
        };
        out.push(TapeTrade {
            trade: trade.clone(),
            ether_amount,
            token_amount,
            token_price: price,
            formatted_timestamp: format_timestamp(trade.order.timestamp),
            price_class,
        });
    }
    out
}

/// An open order decorated for the order book or the my-orders table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookOrder {
    pub order: Order,
    pub ether_amount: Option<Decimal>,
    pub token_amount: Option<Decimal>,
    pub token_price: Option<Decimal>,
    pub formatted_timestamp: String,
    pub side: Side,
    pub side_class: PriceClass,
    /// What a counterparty would do to fill this order.
    pub fill_action: Side,
}

pub fn decorate_book_order(order: &Order) -> BookOrder {
    let (ether_amount, token_amount, token_price) = amounts(order);
    let side = order_side(order);
    BookOrder {
        order: order.clone(),
        ether_amount,
        token_amount,
        token_price,
        formatted_timestamp: format_timestamp(order.timestamp),
        side,
        side_class: side.into(),
        fill_action: side.opposite(),
    }
}

/// A filled order decorated from one account's perspective.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MyTrade {
    pub trade: Trade,
    pub ether_amount: Option<Decimal>,
    pub token_amount: Option<Decimal>,
    pub token_price: Option<Decimal>,
    pub formatted_timestamp: String,
    pub side: Side,
    pub side_class: PriceClass,
    /// '+' when the viewer gained tokens, '-' when they gave them up.
    pub sign: char,
}

pub fn decorate_my_trade(trade: &Trade, account: Address) -> MyTrade {
    let (ether_amount, token_amount, token_price) = amounts(&trade.order);
    let maker_side = order_side(&trade.order);
    // The filler took the other side of the maker's order
    let side = if trade.order.user == account {
        maker_side
    } else {
        maker_side.opposite()
    };
    MyTrade {
        trade: trade.clone(),
        ether_amount,
        token_amount,
        token_price,
        formatted_timestamp: format_timestamp(trade.order.timestamp),
        side,
        side_class: side.into(),
        sign: side.sign(),
    }
}
