use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rust_decimal::Decimal;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

use nex_terminal::alerts::AlertClient;
use nex_terminal::config::Config;
use nex_terminal::contracts::{ChainApi, ExchangeApi, GatewayError, TokenApi};
use nex_terminal::eth::EthGateway;
use nex_terminal::events::{subscribe_to_events, EventContext};
use nex_terminal::reconcile::{load_balances, spawn_order_history_load};
use nex_terminal::retry::FetchPolicy;
use nex_terminal::selectors;
use nex_terminal::store::{Action, Store};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(match config.log_level.as_str() {
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("NEX terminal starting");
    info!("Provider: {}", config.ws_url);
    info!("Exchange: {:?}", config.exchange_address);

    let alerts = Arc::new(AlertClient::new(config.discord_webhook.clone()));
    let store = Arc::new(Store::new());
    let policy = FetchPolicy::new(config.fetch_attempts, config.fetch_timeout_secs);

    match EthGateway::connect(&config).await {
        Ok(gateway) => {
            let account = gateway.account();
            let gateway = Arc::new(gateway);
            let chain: Arc<dyn ChainApi> = gateway.clone();
            let token: Arc<dyn TokenApi> = gateway.clone();
            let exchange: Arc<dyn ExchangeApi> = gateway.clone();

            store.dispatch(Action::AccountLoaded(account));
            store.dispatch(Action::TokenLoaded);
            store.dispatch(Action::ExchangeLoaded);
            alerts.session_started(account).await;

            if let Ok(symbol) = token.symbol().await {
                info!("Token: {}", symbol);
            }

            if let Err(e) = load_balances(
                chain.as_ref(),
                token.as_ref(),
                exchange.as_ref(),
                &store,
                account,
                policy,
            )
            .await
            {
                alerts.fetch_degraded("Balances", &e).await;
            }

            spawn_order_history_load(exchange.clone(), store.clone(), alerts.clone(), policy);

            let ctx = EventContext {
                chain,
                token,
                exchange,
                store: store.clone(),
                alerts: alerts.clone(),
                policy,
            };
            match subscribe_to_events(&ctx).await {
                Ok(handles) => info!("Subscribed to {} event streams", handles.len()),
                Err(e) => alerts.fetch_degraded("Event subscriptions", &e).await,
            }
        }
        Err(GatewayError::NotDeployed { chain_id, .. }) => {
            // Stay up and keep rendering not-loaded views; the user can
            // restart once they are on the right network
            alerts.network_mismatch(chain_id).await;
        }
        Err(e) => {
            error!("Failed to connect: {}", e);
            return Err(e.into());
        }
    }

    run_summary_loop(store, Duration::from_secs(config.summary_interval_secs)).await;
    Ok(())
}

/// Render the derived views to the log on every state change and at
/// least once per interval.
async fn run_summary_loop(store: Arc<Store>, interval: Duration) {
    let mut version = store.subscribe();
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = version.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
        render_summary(&store);
    }
}

fn fmt_amount(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
}

fn render_summary(store: &Store) {
    let state = store.snapshot();

    if !selectors::contracts_loaded(&state) {
        info!("Contracts not loaded; nothing to show yet");
        return;
    }

    let balances = selectors::balances(&state);
    if balances.loading {
        info!("Balances  loading...");
    } else {
        info!(
            "Balances  wallet ETH {} / NEX {} | exchange ETH {} / NEX {}",
            fmt_amount(balances.wallet_ether),
            fmt_amount(balances.wallet_token),
            fmt_amount(balances.exchange_ether),
            fmt_amount(balances.exchange_token),
        );
    }

    if selectors::order_book_loaded(&state) {
        let book = selectors::order_book(&state);
        let best_bid = book.buy_orders.first().and_then(|o| o.token_price);
        let best_ask = book.sell_orders.last().and_then(|o| o.token_price);
        info!(
            "Book      {} bids / {} asks | best bid {} | best ask {}",
            book.buy_orders.len(),
            book.sell_orders.len(),
            fmt_amount(best_bid),
            fmt_amount(best_ask),
        );

        let mine = selectors::my_open_orders(&state);
        if !mine.is_empty() {
            info!("My orders {} open", mine.len());
        }
    } else {
        info!("Book      loading...");
    }

    if selectors::price_chart_loaded(&state) {
        let chart = selectors::price_chart(&state);
        let tape = selectors::filled_orders(&state);
        info!(
            "Trades    {} total | last {} ({:?})",
            tape.len(),
            fmt_amount(chart.last_price),
            chart.direction,
        );
        // Chart consumers can scrape the candle series from debug logs
        if let Ok(series) = serde_json::to_string(&chart.series) {
            debug!("Candles: {}", series);
        }
    } else {
        info!("Trades    loading...");
    }
}
