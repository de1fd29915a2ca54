//! Checkout and settlement.
//!
//! An order opens a hosted-checkout session under a freshly minted
//! transaction id and stores a `pending` payment. The gateway later calls one
//! of the callbacks; a success or IPN callback is only trusted after the
//! `val_id` it carries has been confirmed server-to-server, and the record
//! reaches `paid` through a single conditional update.

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    Extension, Form, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{validated, EmailQuery, InsertResult, UpdateResult};
use crate::auth::{ensure_owner, Claims};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::gateway::{is_intent_id, CheckoutRequest, Contact, ValidatedPayment};
use crate::models::{
    Booking, CardPaymentPayload, Hotel, OrderRequest, Payment, PaymentIntentRequest, PaymentState,
};
use crate::state::AppState;
use crate::store::StoreError;

const DEFAULT_CITY: &str = "Dhaka";
const DEFAULT_COUNTRY: &str = "Bangladesh";
const DEFAULT_PHONE: &str = "01711111111";
const CARD_CURRENCY: &str = "usd";
const AMOUNT_TOLERANCE: f64 = 0.01;

/// Fields the gateway posts to the success/fail/cancel/IPN endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct GatewayCallback {
    pub val_id: Option<String>,
    pub tran_id: Option<String>,
    pub status: Option<String>,
}

/// Fresh per checkout attempt; never shared between requests.
fn mint_transaction_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

async fn load_booking(state: &AppState, booking_id: Uuid) -> Result<(Booking, Hotel), AppError> {
    state
        .with_store(move |store| {
            let booking = store
                .get_booking(booking_id)?
                .ok_or_else(|| StoreError::NotFound("booking".into()))?;
            let hotel = store
                .get_hotel(booking.product_id)?
                .ok_or_else(|| StoreError::NotFound("hotel".into()))?;
            Ok((booking, hotel))
        })
        .await
}

fn checkout_request(
    config: &AppConfig,
    tran_id: &str,
    currency: &str,
    booking: &Booking,
    hotel: &Hotel,
    order: &OrderRequest,
) -> CheckoutRequest {
    let server = config.server_url.trim_end_matches('/');
    let contact = Contact {
        name: order.name.clone().unwrap_or_else(|| order.email.clone()),
        email: order.email.clone(),
        phone: order
            .phone
            .clone()
            .unwrap_or_else(|| DEFAULT_PHONE.to_string()),
        address: order.address.clone(),
        city: DEFAULT_CITY.to_string(),
        postcode: order.post_code.clone(),
        country: DEFAULT_COUNTRY.to_string(),
    };

    CheckoutRequest {
        total_amount: booking.total_price(),
        currency: currency.to_string(),
        tran_id: tran_id.to_string(),
        success_url: format!("{}/payment/success/{}", server, tran_id),
        fail_url: format!("{}/payment/fail/{}", server, tran_id),
        cancel_url: format!("{}/payment/cancel/{}", server, tran_id),
        ipn_url: format!("{}/payment/ipn", server),
        product_name: hotel.name.clone(),
        product_category: "hotel".to_string(),
        customer: contact.clone(),
        shipping: contact,
    }
}

/// `POST /hotel/order`
pub async fn create_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(order): Json<OrderRequest>,
) -> Result<Json<Value>, AppError> {
    let order = validated(order)?;
    ensure_owner(&claims, &order.email)?;

    let (booking, hotel) = load_booking(&state, order.product_id).await?;
    ensure_owner(&claims, &booking.email)?;

    let tran_id = mint_transaction_id();
    let currency = order
        .currency
        .clone()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| state.config.currency.clone());
    let request = checkout_request(&state.config, &tran_id, &currency, &booking, &hotel, &order);

    let session = state.checkout.open_session(&request).await?;
    log::info!(
        "Checkout {} opened for booking {} ({:.2} {})",
        tran_id,
        booking.id,
        request.total_amount,
        currency
    );

    let payment = Payment::for_booking(tran_id, &booking, &hotel, &currency);
    state
        .with_store(move |store| store.insert_payment(payment))
        .await?;

    Ok(Json(json!({ "url": session.gateway_url })))
}

fn check_validation(payment: &Payment, validated: &ValidatedPayment) -> Result<(), AppError> {
    if !validated.is_valid() {
        return Err(AppError::PaymentRejected(format!(
            "gateway reports {}",
            validated.status
        )));
    }
    if validated.tran_id != payment.transaction_id {
        return Err(AppError::PaymentRejected("transaction id mismatch".into()));
    }
    if !validated.currency.eq_ignore_ascii_case(&payment.currency) {
        return Err(AppError::PaymentRejected("currency mismatch".into()));
    }
    match validated.amount_value() {
        Some(amount) if (amount - payment.total_price).abs() < AMOUNT_TOLERANCE => Ok(()),
        _ => Err(AppError::PaymentRejected("amount mismatch".into())),
    }
}

/// Validates `val_id` with the gateway and marks the payment paid.
/// Returns the payment and whether this call changed it.
///
/// A failed or cancelled payment can still be confirmed: those callbacks are
/// not verified, so only the gateway's validation decides about `paid`.
async fn confirm_payment(
    state: &AppState,
    tran_id: &str,
    val_id: &str,
) -> Result<(Payment, bool), AppError> {
    let lookup = tran_id.to_string();
    let payment = state
        .with_store(move |store| store.find_payment(&lookup))
        .await?
        .ok_or_else(|| AppError::NotFound("payment".into()))?;

    if payment.state == PaymentState::Paid {
        return Ok((payment, false));
    }

    let validation = state.checkout.validate(val_id).await?;
    if let Err(e) = check_validation(&payment, &validation) {
        log::warn!("Rejected confirmation for {}: {}", tran_id, e);
        return Err(e);
    }

    let tran = tran_id.to_string();
    let val = val_id.to_string();
    let settled = state
        .with_store(move |store| store.mark_paid(&tran, val))
        .await?;

    match settled {
        Some(paid) => {
            log::info!("Payment {} marked paid (was {})", tran_id, payment.state);
            Ok((paid, true))
        }
        // Another callback confirmed it between the lookup and the update.
        None => Ok((payment, false)),
    }
}

fn client_redirect(state: &AppState, outcome: &str, tran_id: &str) -> Redirect {
    Redirect::to(&format!(
        "{}/payment/{}/{}",
        state.config.client_url.trim_end_matches('/'),
        outcome,
        tran_id
    ))
}

/// `POST /payment/success/:tranId`
pub async fn payment_success(
    State(state): State<AppState>,
    Path(tran_id): Path<String>,
    Form(callback): Form<GatewayCallback>,
) -> Result<Redirect, AppError> {
    if callback.tran_id.as_deref().is_some_and(|t| t != tran_id) {
        return Err(AppError::BadRequest("transaction id mismatch".into()));
    }
    let val_id = callback
        .val_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing val_id".into()))?;

    confirm_payment(&state, &tran_id, &val_id).await?;
    Ok(client_redirect(&state, "success", &tran_id))
}

/// `POST /payment/ipn`: the gateway's server-to-server notice.
pub async fn payment_ipn(
    State(state): State<AppState>,
    Form(callback): Form<GatewayCallback>,
) -> Result<Json<UpdateResult>, AppError> {
    let tran_id = callback
        .tran_id
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing tran_id".into()))?;
    let val_id = callback
        .val_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing val_id".into()))?;

    let (_, modified) = confirm_payment(&state, &tran_id, &val_id).await?;
    Ok(Json(UpdateResult::new(usize::from(modified))))
}

async fn close_payment(
    state: &AppState,
    tran_id: String,
    outcome: PaymentState,
) -> Result<(), AppError> {
    let lookup = tran_id.clone();
    let settled = state
        .with_store(move |store| {
            if store.find_payment(&lookup)?.is_none() {
                return Err(StoreError::NotFound("payment".into()));
            }
            store.settle_payment(&lookup, outcome, None)
        })
        .await?;
    if settled.is_some() {
        log::info!("Payment {} marked {}", tran_id, outcome);
    }
    Ok(())
}

/// `POST /payment/fail/:tranId`
pub async fn payment_fail(
    State(state): State<AppState>,
    Path(tran_id): Path<String>,
) -> Result<Redirect, AppError> {
    close_payment(&state, tran_id.clone(), PaymentState::Failed).await?;
    Ok(client_redirect(&state, "fail", &tran_id))
}

/// `POST /payment/cancel/:tranId`
pub async fn payment_cancel(
    State(state): State<AppState>,
    Path(tran_id): Path<String>,
) -> Result<Redirect, AppError> {
    close_payment(&state, tran_id.clone(), PaymentState::Cancelled).await?;
    Ok(client_redirect(&state, "cancel", &tran_id))
}

/// `GET /payment?email=`, newest first.
pub async fn list_payments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let Some(email) = query.email else {
        return Ok(Json(Vec::new()));
    };
    ensure_owner(&claims, &email)?;

    let payments = state
        .with_store(move |store| store.list_payments(&email))
        .await?;
    Ok(Json(payments))
}

/// `POST /create-payment-intent`
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(request): Json<PaymentIntentRequest>,
) -> Result<Json<Value>, AppError> {
    let request = validated(request)?;
    let intent = state
        .cards()?
        .create_intent(to_minor_units(request.price), CARD_CURRENCY)
        .await?;
    let client_secret = intent
        .client_secret
        .ok_or_else(|| AppError::Internal("payment intent without client secret".into()))?;
    Ok(Json(json!({ "clientSecret": client_secret })))
}

/// `POST /payment`: records a card payment once its intent has succeeded.
pub async fn record_card_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CardPaymentPayload>,
) -> Result<Json<InsertResult>, AppError> {
    let payload = validated(payload)?;
    ensure_owner(&claims, &payload.email)?;
    if !is_intent_id(&payload.transaction_id) {
        return Err(AppError::BadRequest(
            "transactionId is not a payment intent id".into(),
        ));
    }

    let (booking, hotel) = load_booking(&state, payload.booking_id).await?;
    ensure_owner(&claims, &booking.email)?;

    let intent = state.cards()?.retrieve_intent(&payload.transaction_id).await?;
    if intent.id != payload.transaction_id {
        return Err(AppError::PaymentRejected(format!(
            "gateway returned intent {} for {}",
            intent.id, payload.transaction_id
        )));
    }
    if !intent.succeeded() {
        return Err(AppError::PaymentRejected(format!(
            "payment intent is {}",
            intent.status
        )));
    }
    if intent.amount != to_minor_units(booking.total_price()) {
        return Err(AppError::PaymentRejected("amount mismatch".into()));
    }

    let mut payment = Payment::for_booking(intent.id, &booking, &hotel, &intent.currency);
    payment.state = PaymentState::Paid;
    payment.paid_status = true;
    let id = payment.id;
    let transaction_id = payment.transaction_id.clone();

    state
        .with_store(move |store| store.insert_payment(payment))
        .await?;

    log::info!("Recorded card payment {}", transaction_id);
    Ok(Json(InsertResult::new(id)))
}
