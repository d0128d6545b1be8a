use std::sync::Arc;

use anyhow::Result;
use ethers::types::Address;
use tokio::task::JoinHandle;
use tracing::info;

use crate::alerts::AlertClient;
use crate::contracts::{ChainApi, ExchangeApi, TokenApi};
use crate::retry::FetchPolicy;
use crate::store::{Action, Store};
use crate::units::ETHER_ADDRESS;

/// Fetch the three historical event streams and publish each to the
/// store the moment it resolves. The fetches are independent tasks with
/// no join barrier, so the order book's loaded flag flips only once the
/// slowest stream lands. A stream that exhausts its retry budget reports
/// a degraded state and leaves its loaded flag false.
pub fn spawn_order_history_load(
    exchange: Arc<dyn ExchangeApi>,
    store: Arc<Store>,
    alerts: Arc<AlertClient>,
    policy: FetchPolicy,
) -> Vec<JoinHandle<()>> {
    let cancels = {
        let exchange = exchange.clone();
        let store = store.clone();
        let alerts = alerts.clone();
        tokio::spawn(async move {
            match policy
                .run("cancelled orders fetch", || exchange.past_cancels())
                .await
            {
                Ok(orders) => {
                    info!("Loaded {} cancelled orders", orders.len());
                    store.dispatch(Action::CancelledOrdersLoaded(orders));
                }
                Err(e) => alerts.fetch_degraded("Cancelled orders", &e).await,
            }
        })
    };

    let trades = {
        let exchange = exchange.clone();
        let store = store.clone();
        let alerts = alerts.clone();
        tokio::spawn(async move {
            match policy
                .run("filled orders fetch", || exchange.past_trades())
                .await
            {
                Ok(trades) => {
                    info!("Loaded {} filled orders", trades.len());
                    store.dispatch(Action::FilledOrdersLoaded(trades));
                }
                Err(e) => alerts.fetch_degraded("Filled orders", &e).await,
            }
        })
    };

    let orders = tokio::spawn(async move {
        match policy.run("order log fetch", || exchange.past_orders()).await {
            Ok(orders) => {
                info!("Loaded {} orders", orders.len());
                store.dispatch(Action::AllOrdersLoaded(orders));
            }
            Err(e) => alerts.fetch_degraded("Orders", &e).await,
        }
    });

    vec![cancels, trades, orders]
}

/// Reload the four balance snapshots for `account`: wallet ether, wallet
/// token, exchange ether, exchange token. Each value overwrites the
/// previous snapshot; the loading flag clears only after all four land.
pub async fn load_balances(
    chain: &dyn ChainApi,
    token: &dyn TokenApi,
    exchange: &dyn ExchangeApi,
    store: &Store,
    account: Address,
    policy: FetchPolicy,
) -> Result<()> {
    let wallet_ether = policy
        .run("wallet ether balance", || chain.ether_balance(account))
        .await?;
    store.dispatch(Action::WalletEtherBalanceLoaded(wallet_ether));

    let wallet_token = policy
        .run("wallet token balance", || token.balance_of(account))
        .await?;
    store.dispatch(Action::WalletTokenBalanceLoaded(wallet_token));

    let exchange_ether = policy
        .run("exchange ether balance", || {
            exchange.balance_of(ETHER_ADDRESS, account)
        })
        .await?;
    store.dispatch(Action::ExchangeEtherBalanceLoaded(exchange_ether));

    let exchange_token = policy
        .run("exchange token balance", || {
            exchange.balance_of(token.address(), account)
        })
        .await?;
    store.dispatch(Action::ExchangeTokenBalanceLoaded(exchange_token));

    store.dispatch(Action::BalancesLoaded);
    Ok(())
}
