use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::alerts::AlertClient;
use crate::contracts::{ChainApi, ExchangeApi, GatewayResult, TokenApi};
use crate::reconcile::load_balances;
use crate::retry::FetchPolicy;
use crate::store::{Action, Store};
use crate::types::{EventKind, ExchangeEvent};

/// Handles shared by the listeners. They share the store and the gateway
/// ports and nothing else.
#[derive(Clone)]
pub struct EventContext {
    pub chain: Arc<dyn ChainApi>,
    pub token: Arc<dyn TokenApi>,
    pub exchange: Arc<dyn ExchangeApi>,
    pub store: Arc<Store>,
    pub alerts: Arc<AlertClient>,
    pub policy: FetchPolicy,
}

/// Spawn one listener per exchange event kind. Each is an isolated task
/// draining its own channel into store transitions for the life of the
/// session; teardown is dropping the tasks with the process.
pub async fn subscribe_to_events(ctx: &EventContext) -> GatewayResult<Vec<JoinHandle<()>>> {
    let mut handles = Vec::with_capacity(EventKind::ALL.len());
    for kind in EventKind::ALL {
        let mut rx = ctx.exchange.subscribe(kind).await?;
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handle_event(&ctx, event).await;
            }
            warn!("{} subscription closed", kind.as_str());
        }));
    }
    Ok(handles)
}

/// Apply one live event to the store.
pub async fn handle_event(ctx: &EventContext, event: ExchangeEvent) {
    match event {
        ExchangeEvent::Cancelled(order) => {
            info!("Order {} cancelled", order.id);
            ctx.store.dispatch(Action::OrderCancelled(order));
        }
        ExchangeEvent::Filled(trade) => {
            info!("Order {} filled by {:?}", trade.order.id, trade.user_fill);
            refresh_balances(ctx).await;
            ctx.store.dispatch(Action::OrderFilled(trade));
        }
        ExchangeEvent::Placed(order) => {
            info!("Order {} placed by {:?}", order.id, order.user);
            ctx.store.dispatch(Action::OrderMade(order));
        }
        ExchangeEvent::Deposited(change) => {
            info!(
                "Deposit of {} for {:?} (token {:?})",
                change.amount, change.user, change.token
            );
            refresh_balances(ctx).await;
        }
        ExchangeEvent::Withdrawn(change) => {
            info!(
                "Withdrawal of {} for {:?} (token {:?})",
                change.amount, change.user, change.token
            );
            refresh_balances(ctx).await;
        }
    }
}

/// Funds moved; reload the session account's four balance snapshots.
/// Refreshes triggered by racing event kinds may interleave; the last
/// one to complete wins.
async fn refresh_balances(ctx: &EventContext) {
    let Some(account) = ctx.store.snapshot().account else {
        return;
    };
    if let Err(e) = load_balances(
        ctx.chain.as_ref(),
        ctx.token.as_ref(),
        ctx.exchange.as_ref(),
        &ctx.store,
        account,
        ctx.policy,
    )
    .await
    {
        ctx.alerts.fetch_degraded("Balance refresh", &e).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{addr, order, trade, wei, FakeGateway};
    use crate::types::{BalanceChange, EventKind};
    use std::time::Duration;

    fn context(gateway: Arc<FakeGateway>, store: Arc<Store>) -> EventContext {
        EventContext {
            chain: gateway.clone(),
            token: gateway.clone(),
            exchange: gateway,
            store,
            alerts: Arc::new(AlertClient::new(None)),
            policy: FetchPolicy::new(1, 5),
        }
    }

    #[tokio::test]
    async fn test_cancel_event_appends_and_clears_flag() {
        let gateway = Arc::new(FakeGateway::new());
        let store = Arc::new(Store::new());
        store.dispatch(Action::OrderCancelling);
        let ctx = context(gateway, store.clone());

        handle_event(&ctx, ExchangeEvent::Cancelled(order(4, 1, 100))).await;

        let state = store.snapshot();
        assert!(!state.order_cancelling);
        assert_eq!(state.cancelled_orders.data.len(), 1);
    }

    #[tokio::test]
    async fn test_trade_event_refreshes_balances_then_appends() {
        let account = addr(0xA1);
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_wallet_ether(account, wei(9));

        let store = Arc::new(Store::new());
        store.dispatch(Action::AccountLoaded(account));
        store.dispatch(Action::OrderFilling);
        store.dispatch(Action::BalancesLoading);
        let ctx = context(gateway, store.clone());

        handle_event(&ctx, ExchangeEvent::Filled(trade(4, 1, 100))).await;

        let state = store.snapshot();
        assert!(!state.order_filling);
        assert!(!state.balances_loading);
        assert_eq!(state.wallet_ether, Some(wei(9)));
        assert_eq!(state.filled_orders.data.len(), 1);
    }

    #[tokio::test]
    async fn test_deposit_event_touches_only_balances() {
        let account = addr(0xA1);
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_wallet_ether(account, wei(2));

        let store = Arc::new(Store::new());
        store.dispatch(Action::AccountLoaded(account));
        store.dispatch(Action::BalancesLoading);
        let ctx = context(gateway, store.clone());

        handle_event(
            &ctx,
            ExchangeEvent::Deposited(BalanceChange {
                token: crate::units::ETHER_ADDRESS,
                user: account,
                amount: wei(2),
                balance: wei(2),
            }),
        )
        .await;

        let state = store.snapshot();
        assert!(!state.balances_loading);
        assert_eq!(state.wallet_ether, Some(wei(2)));
        assert!(state.all_orders.data.is_empty());
        assert!(state.filled_orders.data.is_empty());
    }

    #[tokio::test]
    async fn test_order_event_appends_and_clears_making() {
        let gateway = Arc::new(FakeGateway::new());
        let store = Arc::new(Store::new());
        store.dispatch(Action::BuyOrderMaking);
        let ctx = context(gateway, store.clone());

        handle_event(&ctx, ExchangeEvent::Placed(order(9, 1, 100))).await;

        let state = store.snapshot();
        assert!(!state.buy_order.making);
        assert_eq!(state.all_orders.data.len(), 1);
    }

    #[tokio::test]
    async fn test_listener_tasks_drain_their_channels() {
        let gateway = Arc::new(FakeGateway::new());
        let store = Arc::new(Store::new());
        let ctx = context(gateway.clone(), store.clone());

        let _handles = subscribe_to_events(&ctx).await.unwrap();

        gateway
            .tap(EventKind::Cancel)
            .send(ExchangeEvent::Cancelled(order(1, 1, 100)))
            .await
            .unwrap();
        gateway
            .tap(EventKind::Order)
            .send(ExchangeEvent::Placed(order(2, 1, 100)))
            .await
            .unwrap();

        // Listeners run on their own tasks; poll until both land
        for _ in 0..100 {
            let state = store.snapshot();
            if !state.cancelled_orders.data.is_empty() && !state.all_orders.data.is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("events were not applied to the store");
    }
}
