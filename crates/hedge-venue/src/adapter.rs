//! The uniform venue capability set.
//!
//! Concrete venue SDKs — REST calls, authentication, WebSocket framing —
//! are out of scope for this workspace. Every implementation of this trait
//! is an external collaborator specified only at this interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

use hedge_core::{FundingObservation, OrderRef, OrderSide, PositionInfo, Rate, Symbol};

use crate::error::AdapterResult;
use crate::stream::StreamHandle;

/// Uniform view over a single exchange's perpetual-futures API.
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    /// The venue's canonical identifier, e.g. `"binance"`.
    fn venue_id(&self) -> hedge_core::VenueId;

    /// All tradable perpetual symbols' current funding rates.
    async fn fetch_funding_rates(&self) -> AdapterResult<Vec<FundingObservation>>;

    async fn get_funding_rate(&self, symbol: &Symbol) -> AdapterResult<Rate>;

    /// Arithmetic mean of historical funding rates at or after `since`;
    /// zero if no observations exist in that window.
    async fn get_avg_funding_rate(
        &self,
        symbol: &Symbol,
        since: DateTime<Utc>,
    ) -> AdapterResult<Rate>;

    async fn get_mark_price(&self, symbol: &Symbol) -> AdapterResult<Decimal>;

    /// Only non-zero positions.
    async fn get_positions(&self) -> AdapterResult<HashMap<Symbol, PositionInfo>>;

    async fn get_total_balance(&self) -> AdapterResult<Decimal>;

    async fn get_available_balance(&self) -> AdapterResult<Decimal>;

    async fn create_market_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        qty: Decimal,
    ) -> AdapterResult<OrderRef>;

    /// If `side`/`qty` are omitted, closes the full live position; otherwise
    /// submits an opposite market order of the given quantity.
    async fn close_position(
        &self,
        symbol: &Symbol,
        side: Option<OrderSide>,
        qty: Option<Decimal>,
    ) -> AdapterResult<OrderRef>;

    /// Transfers `amount` of `asset` to another venue's account. May fail
    /// with `Unsupported` — not every venue pair has a transfer path.
    async fn transfer_to(
        &self,
        other: &dyn VenueAdapter,
        amount: Decimal,
        asset: &str,
    ) -> AdapterResult<()>;

    /// Subscribes to push-based funding/ticker/position updates. The
    /// returned handle owns the reconnect loop; callbacks are delivered
    /// sequentially per stream.
    async fn subscribe_stream(&self) -> AdapterResult<StreamHandle>;
}
