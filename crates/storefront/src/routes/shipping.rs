//! Shipping route handlers.
//!
//! Listing quotes stores the computed set in the session. Confirming a
//! method accepts one from that set, at the price it was shown, only while
//! the set was priced for the order's shipment address and total. Otherwise
//! the order is quoted again first.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, instrument};

use shipquote_core::{
    AddressId, CountryId, Destination, OrderId, QuoteRow, QuoteSet, ShippingMethodId,
    ShippingRequest, SubdivisionId, select_quote,
};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::models::{Order, session_keys};
use crate::services::quote_session;
use crate::state::AppState;

/// Query parameters for the quote listing.
///
/// Everything arrives as text so malformed ids can be reported as a
/// bad request instead of a generic extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct AvailableMethodsQuery {
    pub address: Option<String>,
    pub country: Option<String>,
    pub subdivision: Option<String>,
    pub zip: Option<String>,
    pub street: Option<String>,
    pub street2: Option<String>,
    pub city: Option<String>,
}

/// Where the quote request ships to, before any database lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationInput {
    /// A stored address, which must belong to the requester.
    Address(AddressId),
    /// Fields given directly in the query.
    Explicit(Destination),
}

impl AvailableMethodsQuery {
    /// Validate the query into a destination input.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if an id is missing or not numeric.
    pub fn destination(&self) -> Result<DestinationInput> {
        if let Some(address) = non_blank(self.address.as_deref()) {
            let id = parse_id::<AddressId>("address", Some(address))?;
            return Ok(DestinationInput::Address(id));
        }

        let country = parse_id::<CountryId>("country", self.country.as_deref())?;
        let subdivision = parse_id::<SubdivisionId>("subdivision", self.subdivision.as_deref())?;

        let mut destination = Destination::new(country).with_subdivision(subdivision);
        if let Some(zip) = non_blank(self.zip.as_deref()) {
            destination = destination.with_postal_code(zip);
        }
        destination.street = non_blank(self.street.as_deref()).map(str::to_owned);
        destination.street2 = non_blank(self.street2.as_deref()).map(str::to_owned);
        destination.city = non_blank(self.city.as_deref()).map(str::to_owned);

        Ok(DestinationInput::Explicit(destination))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_id<T: std::str::FromStr>(name: &str, value: Option<&str>) -> Result<T> {
    let value = non_blank(value).ok_or_else(|| AppError::BadRequest(format!("missing {name}")))?;
    value
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid {name}")))
}

/// Response body for the quote listing.
#[derive(Debug, Serialize)]
pub struct QuoteListResponse {
    pub result: Vec<QuoteRow>,
}

/// Request body for confirming a shipping method.
#[derive(Debug, Deserialize)]
pub struct SelectShippingRequest {
    pub shipping_method: ShippingMethodId,
}

/// Response body after the shipping line was written.
#[derive(Debug, Serialize)]
pub struct SelectShippingResponse {
    pub order: OrderId,
    pub shipping_method: ShippingMethodId,
    pub description: String,
    pub amount: Decimal,
}

/// The session's open order, if any.
async fn session_order(state: &AppState, session: &Session) -> Result<Option<Order>> {
    let Some(order_id) = session.get::<OrderId>(session_keys::ORDER_ID).await? else {
        return Ok(None);
    };
    Ok(state.store().order(order_id).await?)
}

/// Quote `destination` for this instance's website and cache the result.
async fn quote_and_store(
    state: &AppState,
    session: &Session,
    auth: &OptionalAuth,
    destination: Destination,
    order_total: Decimal,
) -> Result<QuoteSet> {
    let mut request =
        ShippingRequest::new(destination.clone(), state.config().website, order_total);
    if auth.is_guest() {
        request = request.as_guest();
    }

    let quotes = state.shipping().quote(&request).await?;
    let set = QuoteSet::new(quotes, destination, order_total, Utc::now());
    quote_session::store(session, &set).await?;
    Ok(set)
}

/// List the shipping methods available for a destination.
///
/// GET /shipping/available_methods
#[instrument(skip(state, session, auth, query))]
pub async fn available_methods(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Query(query): Query<AvailableMethodsQuery>,
) -> Result<Json<QuoteListResponse>> {
    let destination = match query.destination()? {
        DestinationInput::Explicit(destination) => destination,
        DestinationInput::Address(address) => {
            let Some(user) = &auth.0 else {
                return Err(AppError::Forbidden("address not accessible".to_string()));
            };
            state
                .store()
                .owned_address(user.id, address)
                .await?
                .ok_or_else(|| AppError::Forbidden("address not accessible".to_string()))?
                .to_destination()
        }
    };

    let order_total = session_order(&state, &session)
        .await?
        .map_or(Decimal::ZERO, |order| order.total);

    let set = quote_and_store(&state, &session, &auth, destination, order_total).await?;

    Ok(Json(QuoteListResponse {
        result: set.to_result_rows(),
    }))
}

/// Confirm a shipping method for the session's order.
///
/// POST /checkout/shipping
#[instrument(skip(state, session, auth, body), fields(method_id = %body.shipping_method))]
pub async fn select_shipping(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Json(body): Json<SelectShippingRequest>,
) -> Result<Json<SelectShippingResponse>> {
    let order = session_order(&state, &session)
        .await?
        .ok_or_else(|| AppError::BadRequest("no open order".to_string()))?;

    let foreign_owner = order
        .user
        .is_some_and(|owner| auth.0.as_ref().is_none_or(|user| user.id != owner));
    if foreign_owner || order.website != state.config().website {
        return Err(AppError::Forbidden("order not accessible".to_string()));
    }
    if !order.is_editable() {
        return Err(AppError::BadRequest("order can no longer be changed".to_string()));
    }

    let destination = shipment_destination(&state, &order).await?;
    let now = Utc::now();
    let ttl = state.config().shipping.quote_ttl;
    let cached =
        quote_session::load_valid(&session, &destination, order.total, now, ttl).await?;
    let set = match cached {
        Some(set) => set,
        None => quote_and_store(&state, &session, &auth, destination, order.total).await?,
    };

    let line = select_quote(&set.quotes, body.shipping_method)?;
    state
        .store()
        .upsert_shipping_line(order.id, &line)
        .await?;

    info!(order = %order.id, amount = %line.unit_price, "Shipping line set");
    add_breadcrumb(
        "checkout",
        "Shipping method selected",
        Some(&[("method_id", &line.method_id.to_string())]),
    );

    Ok(Json(SelectShippingResponse {
        order: order.id,
        shipping_method: line.method_id,
        description: line.description,
        amount: line.unit_price,
    }))
}

/// Where the order ships to. Quotes are only ever confirmed against this.
async fn shipment_destination(state: &AppState, order: &Order) -> Result<Destination> {
    let missing = || AppError::BadRequest("order has no shipment address".to_string());
    let address = order.shipment_address.ok_or_else(missing)?;
    Ok(state
        .store()
        .address(address)
        .await?
        .ok_or_else(missing)?
        .to_destination())
}
