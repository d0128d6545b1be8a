/// Live terminal client for the NEX/ETH on-chain token exchange.
///
/// The crate mirrors exchange state out of the contract event log: a
/// historical backfill reconciles the open-order set, long-lived
/// subscriptions keep it current, and pure selectors derive the order
/// book, trade tape, price chart and balance views from a single store.
/// Writes (deposits, withdrawals, orders) are submitted through the same
/// contract gateway and tracked until their events come back.
pub mod alerts;
pub mod config;
pub mod contracts;
pub mod decorate;
pub mod eth;
pub mod events;
pub mod ops;
pub mod reconcile;
pub mod retry;
pub mod selectors;
pub mod store;
pub mod types;
pub mod units;

#[cfg(test)]
pub(crate) mod testutil;
