//! User-initiated writes. Each operation converts display units to raw
//! units, submits through the gateway, and sets the matching in-flight
//! flag once the transaction reaches the pending pool. Completion is
//! only ever observed through the live event that clears the flag; a
//! submission error surfaces an alert and leaves the flag as it was.

use anyhow::{anyhow, Result};
use ethers::types::{TxHash, U256};
use rust_decimal::Decimal;

use crate::alerts::AlertClient;
use crate::contracts::{ExchangeApi, TokenApi};
use crate::store::{Action, Store};
use crate::units::{to_wei, ETHER_ADDRESS};

fn as_wei(amount: Decimal) -> Result<U256> {
    to_wei(amount).ok_or_else(|| anyhow!("amount {amount} has no raw representation"))
}

pub async fn deposit_ether(
    exchange: &dyn ExchangeApi,
    store: &Store,
    alerts: &AlertClient,
    amount: Decimal,
) -> Result<TxHash> {
    let wei = as_wei(amount)?;
    match exchange.deposit_ether(wei).await {
        Ok(hash) => {
            store.dispatch(Action::BalancesLoading);
            Ok(hash)
        }
        Err(e) => {
            alerts.transaction_error("Ether deposit", &e).await;
            Err(e.into())
        }
    }
}

pub async fn withdraw_ether(
    exchange: &dyn ExchangeApi,
    store: &Store,
    alerts: &AlertClient,
    amount: Decimal,
) -> Result<TxHash> {
    let wei = as_wei(amount)?;
    match exchange.withdraw_ether(wei).await {
        Ok(hash) => {
            store.dispatch(Action::BalancesLoading);
            Ok(hash)
        }
        Err(e) => {
            alerts.transaction_error("Ether withdrawal", &e).await;
            Err(e.into())
        }
    }
}

/// Two sequential transactions: the deposit goes out only after the
/// approval reaches the pending pool. A failed approval aborts the flow
/// before any deposit is attempted.
pub async fn deposit_token(
    exchange: &dyn ExchangeApi,
    token: &dyn TokenApi,
    store: &Store,
    alerts: &AlertClient,
    amount: Decimal,
) -> Result<TxHash> {
    let wei = as_wei(amount)?;

    if let Err(e) = token.approve(exchange.address(), wei).await {
        alerts.transaction_error("Token approval", &e).await;
        return Err(e.into());
    }

    match exchange.deposit_token(token.address(), wei).await {
        Ok(hash) => {
            store.dispatch(Action::BalancesLoading);
            Ok(hash)
        }
        Err(e) => {
            alerts.transaction_error("Token deposit", &e).await;
            Err(e.into())
        }
    }
}

pub async fn withdraw_token(
    exchange: &dyn ExchangeApi,
    token: &dyn TokenApi,
    store: &Store,
    alerts: &AlertClient,
    amount: Decimal,
) -> Result<TxHash> {
    let wei = as_wei(amount)?;
    match exchange.withdraw_token(token.address(), wei).await {
        Ok(hash) => {
            store.dispatch(Action::BalancesLoading);
            Ok(hash)
        }
        Err(e) => {
            alerts.transaction_error("Token withdrawal", &e).await;
            Err(e.into())
        }
    }
}

/// Buy `amount` tokens at `price` ether each: get tokens, give ether.
pub async fn make_buy_order(
    exchange: &dyn ExchangeApi,
    token: &dyn TokenApi,
    store: &Store,
    alerts: &AlertClient,
    amount: Decimal,
    price: Decimal,
) -> Result<TxHash> {
    let amount_get = as_wei(amount)?;
    let amount_give = as_wei(amount * price)?;
    match exchange
        .make_order(token.address(), amount_get, ETHER_ADDRESS, amount_give)
        .await
    {
        Ok(hash) => {
            store.dispatch(Action::BuyOrderMaking);
            Ok(hash)
        }
        Err(e) => {
            alerts.transaction_error("Buy order", &e).await;
            Err(e.into())
        }
    }
}

/// Sell `amount` tokens at `price` ether each: get ether, give tokens.
pub async fn make_sell_order(
    exchange: &dyn ExchangeApi,
    token: &dyn TokenApi,
    store: &Store,
    alerts: &AlertClient,
    amount: Decimal,
    price: Decimal,
) -> Result<TxHash> {
    let amount_get = as_wei(amount * price)?;
    let amount_give = as_wei(amount)?;
    match exchange
        .make_order(ETHER_ADDRESS, amount_get, token.address(), amount_give)
        .await
    {
        Ok(hash) => {
            store.dispatch(Action::SellOrderMaking);
            Ok(hash)
        }
        Err(e) => {
            alerts.transaction_error("Sell order", &e).await;
            Err(e.into())
        }
    }
}

pub async fn cancel_order(
    exchange: &dyn ExchangeApi,
    store: &Store,
    alerts: &AlertClient,
    id: U256,
) -> Result<TxHash> {
    match exchange.cancel_order(id).await {
        Ok(hash) => {
            store.dispatch(Action::OrderCancelling);
            Ok(hash)
        }
        Err(e) => {
            alerts.transaction_error("Order cancel", &e).await;
            Err(e.into())
        }
    }
}

pub async fn fill_order(
    exchange: &dyn ExchangeApi,
    store: &Store,
    alerts: &AlertClient,
    id: U256,
) -> Result<TxHash> {
    match exchange.fill_order(id).await {
        Ok(hash) => {
            store.dispatch(Action::OrderFilling);
            Ok(hash)
        }
        Err(e) => {
            alerts.transaction_error("Order fill", &e).await;
            Err(e.into())
        }
    }
}
