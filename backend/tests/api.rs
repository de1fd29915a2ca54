use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{NaiveDate, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use happy_trip::auth::create_token;
use happy_trip::config::AppConfig;
use happy_trip::gateway::{
    CardGateway, CheckoutGateway, CheckoutRequest, CheckoutSession, GatewayError, PaymentIntent,
    ValidatedPayment,
};
use happy_trip::models::{Booking, Hotel, HotelPayload, HotelStatus, PaymentState, Place};
use happy_trip::routes;
use happy_trip::store::{MemoryStore, Store};
use happy_trip::AppState;

const SECRET: &str = "test-secret";
const CLIENT_URL: &str = "https://client.test";

/// Records every session it opens and validates against the latest one.
#[derive(Default)]
struct StubCheckout {
    opened: Mutex<Vec<CheckoutRequest>>,
    validations: Mutex<usize>,
    amount_override: Mutex<Option<String>>,
}

impl StubCheckout {
    fn opened(&self) -> Vec<CheckoutRequest> {
        self.opened.lock().unwrap().clone()
    }

    fn validations(&self) -> usize {
        *self.validations.lock().unwrap()
    }
}

#[async_trait]
impl CheckoutGateway for StubCheckout {
    async fn open_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, GatewayError> {
        self.opened.lock().unwrap().push(request.clone());
        Ok(CheckoutSession {
            gateway_url: format!("https://gateway.test/checkout/{}", request.tran_id),
            session_key: Some("S1".into()),
        })
    }

    async fn validate(&self, val_id: &str) -> Result<ValidatedPayment, GatewayError> {
        *self.validations.lock().unwrap() += 1;
        let last = self
            .opened
            .lock()
            .unwrap()
            .last()
            .cloned()
            .ok_or_else(|| GatewayError::Declined("no session".into()))?;
        let amount = self
            .amount_override
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| format!("{:.2}", last.total_amount));
        Ok(ValidatedPayment {
            status: "VALID".into(),
            tran_id: last.tran_id,
            val_id: val_id.to_string(),
            amount,
            currency: last.currency,
        })
    }
}

/// Serves intents registered with [`StubCards::add`] and records creations.
#[derive(Default)]
struct StubCards {
    intents: Mutex<HashMap<String, PaymentIntent>>,
    created: Mutex<Vec<(i64, String)>>,
    lookups: Mutex<usize>,
}

impl StubCards {
    /// Registers the intent returned when `key` is retrieved.
    fn add(&self, key: &str, id: &str, amount: i64, status: &str) {
        let intent = PaymentIntent {
            object: "payment_intent".into(),
            id: id.into(),
            client_secret: None,
            amount,
            currency: "usd".into(),
            status: status.into(),
        };
        self.intents.lock().unwrap().insert(key.into(), intent);
    }

    fn created(&self) -> Vec<(i64, String)> {
        self.created.lock().unwrap().clone()
    }

    fn lookups(&self) -> usize {
        *self.lookups.lock().unwrap()
    }
}

#[async_trait]
impl CardGateway for StubCards {
    async fn create_intent(&self, amount: i64, currency: &str) -> Result<PaymentIntent, GatewayError> {
        self.created
            .lock()
            .unwrap()
            .push((amount, currency.to_string()));
        Ok(PaymentIntent {
            object: "payment_intent".into(),
            id: "pi_new".into(),
            client_secret: Some("pi_new_secret_1".into()),
            amount,
            currency: currency.into(),
            status: "requires_payment_method".into(),
        })
    }

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        *self.lookups.lock().unwrap() += 1;
        self.intents
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::Status {
                status: 404,
                body: "no such payment_intent".into(),
            })
    }
}

struct Harness {
    app: Router,
    store: Arc<MemoryStore>,
    checkout: Arc<StubCheckout>,
    cards: Arc<StubCards>,
}

fn config() -> AppConfig {
    AppConfig {
        database_url: "memory://".into(),
        db_pool_size: 1,
        access_token_secret: SECRET.into(),
        store_id: "trip123".into(),
        store_password: "pw".into(),
        is_live: false,
        server_url: "http://localhost:5000".into(),
        client_url: CLIENT_URL.into(),
        payment_secret_key: None,
        currency: "BDT".into(),
        port: 5000,
    }
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let checkout = Arc::new(StubCheckout::default());
    let cards = Arc::new(StubCards::default());
    let state = AppState::new(
        config(),
        store.clone(),
        checkout.clone(),
        Some(cards.clone() as Arc<dyn CardGateway>),
    );
    Harness {
        app: routes::app(state),
        store,
        checkout,
        cards,
    }
}

fn bearer(email: &str) -> String {
    format!("Bearer {}", create_token(email, SECRET).unwrap())
}

fn hotel(name: &str, location: &str, status: HotelStatus, rooms: i32) -> Hotel {
    let mut hotel = Hotel::listed_by(
        "owner@x.com",
        HotelPayload {
            name: name.into(),
            location: location.into(),
            image: None,
            description: None,
            price: 50.0,
            available_room: rooms,
        },
    );
    hotel.status = status;
    hotel
}

fn booking(email: &str, hotel: &Hotel, days: i32) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        email: email.into(),
        product_id: hotel.id,
        name: hotel.name.clone(),
        price: hotel.price,
        booking_days: days,
        booking_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        address: "Road 1".into(),
        post_code: "1207".into(),
        created_at: Utc::now(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| json!(String::from_utf8_lossy(&bytes)))
    };
    (status, body)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(email) = token {
        builder = builder.header(header::AUTHORIZATION, bearer(email));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(email) = token {
        builder = builder.header(header::AUTHORIZATION, bearer(email));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn post_form(uri: &str, form: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

fn patch(uri: &str) -> Request<Body> {
    Request::patch(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::delete(uri).body(Body::empty()).unwrap()
}

/// Places an order for `booking` and returns the minted transaction id.
async fn place_order(h: &Harness, booking: &Booking) -> String {
    let (status, body) = send(
        &h.app,
        post_json(
            "/hotel/order",
            Some(&booking.email),
            json!({
                "productId": booking.id,
                "email": booking.email,
                "address": "Road 1",
                "postCode": "1207"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "order failed: {body}");

    let tran_id = h.checkout.opened().last().unwrap().tran_id.clone();
    assert_eq!(
        body["url"],
        json!(format!("https://gateway.test/checkout/{}", tran_id))
    );
    tran_id
}

fn seeded_booking(h: &Harness, email: &str, days: i32) -> Booking {
    let hotel = hotel("Sea Pearl", "Cox's Bazar", HotelStatus::Approved, 3);
    let booking = booking(email, &hotel, days);
    h.store.insert_hotel(hotel).unwrap();
    h.store.insert_booking(booking.clone()).unwrap();
    booking
}

#[tokio::test]
async fn root_reports_liveness() {
    let h = harness();
    let (status, body) = send(&h.app, get("/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("Trip is going on"));
}

#[tokio::test]
async fn seeded_places_are_listed_and_fetched() {
    let place = Place {
        id: Uuid::new_v4(),
        name: "Sundarbans".into(),
        location: "Khulna".into(),
        image: None,
        description: None,
    };
    let store = Arc::new(MemoryStore::with_places(vec![place.clone()]));
    let state = AppState::new(config(), store, Arc::new(StubCheckout::default()), None);
    let app = routes::app(state);

    let (status, body) = send(&app, get("/place", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], json!("Sundarbans"));

    let (status, body) = send(&app, get(&format!("/place/{}", place.id), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_id"], json!(place.id));

    let (status, _) = send(&app, get(&format!("/place/{}", Uuid::new_v4()), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn protected_routes_check_token_and_owner() {
    let h = harness();

    let (status, body) = send(&h.app, get("/bookings?email=a@x.com", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], json!("unauthorized access"));

    let (status, _) = send(&h.app, get("/bookings?email=b@x.com", Some("a@x.com"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&h.app, get("/bookings?email=a@x.com", Some("a@x.com"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let bad = Request::get("/payment?email=a@x.com")
        .header(header::AUTHORIZATION, "Bearer not-a-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&h.app, bad).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn issued_token_opens_protected_routes() {
    let h = harness();
    let (status, body) = send(&h.app, post_json("/jwt", None, json!({ "email": "a@x.com" }))).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let request = Request::get("/selected?email=a@x.com")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn duplicate_user_is_reported_not_inserted() {
    let h = harness();
    let user = json!({ "name": "Rahim", "email": "a@x.com", "photoURL": "https://img.test/a.png" });

    let (status, body) = send(&h.app, post_json("/users", None, user.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["acknowledged"], json!(true));

    let (status, body) = send(&h.app, post_json("/users", None, user)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "User Already Exists!" }));
    assert_eq!(h.store.list_users().unwrap().len(), 1);
}

#[tokio::test]
async fn admin_check_reflects_role() {
    let h = harness();
    send(&h.app, post_json("/users", None, json!({ "email": "a@x.com" }))).await;
    let id = h.store.find_user_by_email("a@x.com").unwrap().unwrap().id;

    let (_, body) = send(&h.app, get("/users/admin/a@x.com", Some("a@x.com"))).await;
    assert_eq!(body, json!({ "admin": false }));

    let (status, body) = send(&h.app, patch(&format!("/users/admin/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["modifiedCount"], json!(1));

    let (_, body) = send(&h.app, get("/users/admin/a@x.com", Some("a@x.com"))).await;
    assert_eq!(body, json!({ "admin": true }));

    let (status, _) = send(&h.app, get("/users/admin/a@x.com", Some("b@x.com"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn search_matches_approved_hotels_ignoring_case() {
    let h = harness();
    h.store
        .insert_hotel(hotel("Sea Pearl", "Cox's Bazar", HotelStatus::Approved, 2))
        .unwrap();
    h.store
        .insert_hotel(hotel("Pearl Inn", "Sylhet", HotelStatus::Pending, 2))
        .unwrap();
    h.store
        .insert_hotel(hotel("Hill View", "Bandarban", HotelStatus::Approved, 2))
        .unwrap();

    let (status, body) = send(&h.app, get("/search/PEARL", None)).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Sea Pearl"]);

    let (_, body) = send(&h.app, get("/search/bandar", None)).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(&h.app, get("/search/%20pearl", None)).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], json!("Sea Pearl"));

    let (_, body) = send(&h.app, get("/search/%20", None)).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Sea Pearl", "Hill View"]);

    let (_, body) = send(&h.app, get("/hotel", None)).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn new_listing_waits_for_approval() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        post_json(
            "/addedhotel",
            Some("owner@x.com"),
            json!({ "name": "Sea Pearl", "location": "Cox's Bazar", "price": 80.0, "availableRoom": 4 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["insertedId"].as_str().unwrap().to_string();

    let (_, listed) = send(&h.app, get("/hotel", None)).await;
    assert_eq!(listed, json!([]));

    let (status, _) = send(&h.app, patch(&format!("/addedhotell/approve/{}", id))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, listed) = send(&h.app, get("/hotel", None)).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["email"], json!("owner@x.com"));
    assert_eq!(listed[0]["status"], json!("approved"));
}

#[tokio::test]
async fn reserving_moves_one_room_until_none_left() {
    let h = harness();
    let listed = hotel("Sea Pearl", "Cox's Bazar", HotelStatus::Approved, 1);
    let id = listed.id;
    h.store.insert_hotel(listed).unwrap();

    let (status, body) = send(&h.app, patch(&format!("/bookings/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["modifiedCount"], json!(1));

    let after = h.store.get_hotel(id).unwrap().unwrap();
    assert_eq!(after.booked, 1);
    assert_eq!(after.available_room, 0);

    let (status, _) = send(&h.app, patch(&format!("/bookings/{}", id))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(h.store.get_hotel(id).unwrap().unwrap().booked, 1);

    let (status, _) = send(&h.app, patch(&format!("/bookings/{}", Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn booking_requires_existing_hotel() {
    let h = harness();
    let (status, _) = send(
        &h.app,
        post_json(
            "/bookings",
            None,
            json!({
                "email": "a@x.com",
                "productId": Uuid::new_v4(),
                "name": "Ghost Inn",
                "price": 10.0,
                "bookingDate": "2024-07-01",
                "address": "Road 1",
                "postCode": "1207"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn confirmed_payment_is_marked_paid_once() {
    let h = harness();
    let booking = seeded_booking(&h, "a@x.com", 3);
    let tran_id = place_order(&h, &booking).await;

    let pending = h.store.find_payment(&tran_id).unwrap().unwrap();
    assert_eq!(pending.state, PaymentState::Pending);
    assert!(!pending.paid_status);
    assert_eq!(pending.total_price, 150.0);
    assert_eq!(h.checkout.opened()[0].total_amount, 150.0);

    let uri = format!("/payment/success/{}", tran_id);
    let form = format!("val_id=V1&tran_id={}", tran_id);
    let response = h.app.clone().oneshot(post_form(&uri, &form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[header::LOCATION],
        format!("{}/payment/success/{}", CLIENT_URL, tran_id).as_str()
    );

    let paid = h.store.find_payment(&tran_id).unwrap().unwrap();
    assert_eq!(paid.state, PaymentState::Paid);
    assert!(paid.paid_status);
    assert_eq!(paid.validation_id.as_deref(), Some("V1"));

    let (status, _) = send(&h.app, post_form(&uri, "val_id=V2")).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(h.checkout.validations(), 1);
    let again = h.store.find_payment(&tran_id).unwrap().unwrap();
    assert_eq!(again.validation_id.as_deref(), Some("V1"));

    let (status, body) = send(&h.app, get("/payment?email=a@x.com", Some("a@x.com"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["transactionId"], json!(tran_id));
    assert_eq!(body[0]["paidStatus"], json!(true));
}

#[tokio::test]
async fn every_order_gets_its_own_transaction() {
    let h = harness();
    let booking = seeded_booking(&h, "a@x.com", 1);

    let first = place_order(&h, &booking).await;
    let second = place_order(&h, &booking).await;
    assert_ne!(first, second);
    assert_eq!(h.store.list_payments("a@x.com").unwrap().len(), 2);
}

#[tokio::test]
async fn order_for_missing_booking_contacts_no_gateway() {
    let h = harness();
    let (status, _) = send(
        &h.app,
        post_json(
            "/hotel/order",
            Some("a@x.com"),
            json!({
                "productId": Uuid::new_v4(),
                "email": "a@x.com",
                "address": "Road 1",
                "postCode": "1207"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(h.checkout.opened().is_empty());
}

#[tokio::test]
async fn order_for_someone_elses_email_is_forbidden() {
    let h = harness();
    let booking = seeded_booking(&h, "a@x.com", 1);
    let (status, _) = send(
        &h.app,
        post_json(
            "/hotel/order",
            Some("b@x.com"),
            json!({
                "productId": booking.id,
                "email": "a@x.com",
                "address": "Road 1",
                "postCode": "1207"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(h.checkout.opened().is_empty());
}

#[tokio::test]
async fn callback_with_other_transaction_is_rejected() {
    let h = harness();
    let booking = seeded_booking(&h, "a@x.com", 1);
    let tran_id = place_order(&h, &booking).await;

    let (status, _) = send(
        &h.app,
        post_form(&format!("/payment/success/{}", tran_id), "val_id=V1&tran_id=other"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&h.app, post_form("/payment/success/unknown", "val_id=V1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert!(!h.store.find_payment(&tran_id).unwrap().unwrap().paid_status);
}

#[tokio::test]
async fn validation_disagreeing_on_amount_leaves_payment_pending() {
    let h = harness();
    let booking = seeded_booking(&h, "a@x.com", 2);
    let tran_id = place_order(&h, &booking).await;
    *h.checkout.amount_override.lock().unwrap() = Some("1.00".into());

    let (status, _) = send(
        &h.app,
        post_form(&format!("/payment/success/{}", tran_id), "val_id=V1"),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    let payment = h.store.find_payment(&tran_id).unwrap().unwrap();
    assert_eq!(payment.state, PaymentState::Pending);
    assert!(!payment.paid_status);
}

#[tokio::test]
async fn ipn_settles_like_success() {
    let h = harness();
    let booking = seeded_booking(&h, "a@x.com", 1);
    let tran_id = place_order(&h, &booking).await;

    let form = format!("val_id=V1&tran_id={}&status=VALID", tran_id);
    let (status, body) = send(&h.app, post_form("/payment/ipn", &form)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["modifiedCount"], json!(1));

    let (_, body) = send(&h.app, post_form("/payment/ipn", &form)).await;
    assert_eq!(body["modifiedCount"], json!(0));
}

#[tokio::test]
async fn validated_success_overrides_unverified_failure() {
    let h = harness();
    let booking = seeded_booking(&h, "a@x.com", 1);
    let tran_id = place_order(&h, &booking).await;

    let response = h
        .app
        .clone()
        .oneshot(post_form(&format!("/payment/fail/{}", tran_id), ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[header::LOCATION],
        format!("{}/payment/fail/{}", CLIENT_URL, tran_id).as_str()
    );
    assert_eq!(
        h.store.find_payment(&tran_id).unwrap().unwrap().state,
        PaymentState::Failed
    );

    let (status, _) = send(
        &h.app,
        post_form(&format!("/payment/success/{}", tran_id), "val_id=V1"),
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(h.checkout.validations(), 1);
    let paid = h.store.find_payment(&tran_id).unwrap().unwrap();
    assert_eq!(paid.state, PaymentState::Paid);
    assert!(paid.paid_status);

    let (status, _) = send(&h.app, post_form(&format!("/payment/cancel/{}", tran_id), "")).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(
        h.store.find_payment(&tran_id).unwrap().unwrap().state,
        PaymentState::Paid
    );

    let (status, _) = send(&h.app, post_form("/payment/cancel/unknown", "")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_payment_stays_failed_without_validation() {
    let h = harness();
    let booking = seeded_booking(&h, "a@x.com", 1);
    let tran_id = place_order(&h, &booking).await;
    send(&h.app, post_form(&format!("/payment/fail/{}", tran_id), "")).await;
    *h.checkout.amount_override.lock().unwrap() = Some("0.01".into());

    let (status, _) = send(
        &h.app,
        post_form(&format!("/payment/success/{}", tran_id), "val_id=V1"),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(
        h.store.find_payment(&tran_id).unwrap().unwrap().state,
        PaymentState::Failed
    );
}

#[tokio::test]
async fn card_routes_need_a_configured_key() {
    let state = AppState::new(
        config(),
        Arc::new(MemoryStore::new()),
        Arc::new(StubCheckout::default()),
        None,
    );
    let app = routes::app(state);

    let (status, _) = send(
        &app,
        post_json("/create-payment-intent", Some("a@x.com"), json!({ "price": 12.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(
        &app,
        post_json("/create-payment-intent", None, json!({ "price": 12.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn card_intent_is_created_in_minor_units() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        post_json("/create-payment-intent", Some("a@x.com"), json!({ "price": 12.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "clientSecret": "pi_new_secret_1" }));
    assert_eq!(h.cards.created(), vec![(1250, "usd".to_string())]);

    let (status, _) = send(
        &h.app,
        post_json("/create-payment-intent", Some("a@x.com"), json!({ "price": 0.1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.cards.created().len(), 1);
}

fn card_payment(token: &str, transaction_id: &str, email: &str, booking: &Booking) -> Request<Body> {
    post_json(
        "/payment",
        Some(token),
        json!({
            "transactionId": transaction_id,
            "email": email,
            "bookingId": booking.id
        }),
    )
}

#[tokio::test]
async fn succeeded_card_payment_is_recorded_once() {
    let h = harness();
    let booking = seeded_booking(&h, "a@x.com", 2);
    h.cards.add("pi_ok", "pi_ok", 10_000, "succeeded");

    let (status, body) = send(&h.app, card_payment("a@x.com", "pi_ok", "a@x.com", &booking)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["acknowledged"], json!(true));

    let stored = h.store.find_payment("pi_ok").unwrap().unwrap();
    assert_eq!(stored.state, PaymentState::Paid);
    assert!(stored.paid_status);
    assert_eq!(stored.booking_id, booking.id);
    assert_eq!(stored.total_price, 100.0);

    let (_, listed) = send(&h.app, get("/payment?email=a@x.com", Some("a@x.com"))).await;
    assert_eq!(listed[0]["transactionId"], json!("pi_ok"));
    assert_eq!(listed[0]["paidStatus"], json!(true));

    let (status, _) = send(&h.app, card_payment("a@x.com", "pi_ok", "a@x.com", &booking)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(h.store.list_payments("a@x.com").unwrap().len(), 1);
}

#[tokio::test]
async fn card_payment_needs_its_own_succeeded_intent() {
    let h = harness();
    let booking = seeded_booking(&h, "a@x.com", 2);
    h.cards.add("pi_pending", "pi_pending", 10_000, "requires_payment_method");
    h.cards.add("pi_short", "pi_short", 9_999, "succeeded");
    h.cards.add("pi_alias", "pi_other", 10_000, "succeeded");

    let cases = [
        ("pi_pending", StatusCode::PAYMENT_REQUIRED),
        ("pi_short", StatusCode::PAYMENT_REQUIRED),
        ("pi_alias", StatusCode::PAYMENT_REQUIRED),
        ("pi_unknown", StatusCode::BAD_GATEWAY),
    ];
    for (intent, expected) in cases {
        let (status, body) = send(&h.app, card_payment("a@x.com", intent, "a@x.com", &booking)).await;
        assert_eq!(status, expected, "{intent}: {body}");
    }
    assert_eq!(h.cards.lookups(), 4);

    let (status, _) = send(
        &h.app,
        card_payment("a@x.com", "../charges/ch_1", "a@x.com", &booking),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.cards.lookups(), 4);

    assert!(h.store.list_payments("a@x.com").unwrap().is_empty());
}

#[tokio::test]
async fn card_payment_is_limited_to_own_bookings() {
    let h = harness();
    let booking = seeded_booking(&h, "a@x.com", 1);
    h.cards.add("pi_ok", "pi_ok", 5_000, "succeeded");

    let (status, _) = send(&h.app, card_payment("b@x.com", "pi_ok", "a@x.com", &booking)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&h.app, card_payment("b@x.com", "pi_ok", "b@x.com", &booking)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(h.cards.lookups(), 0);
    assert!(h.store.find_payment("pi_ok").unwrap().is_none());
}

#[tokio::test]
async fn collection_routes_report_write_results() {
    let h = harness();
    let listed = hotel("Sea Pearl", "Cox's Bazar", HotelStatus::Pending, 2);
    let hotel_id = listed.id;
    h.store.insert_hotel(listed.clone()).unwrap();
    let stay = booking("a@x.com", &listed, 2);
    h.store.insert_booking(stay.clone()).unwrap();
    send(&h.app, post_json("/users", None, json!({ "email": "a@x.com" }))).await;
    let user_id = h.store.find_user_by_email("a@x.com").unwrap().unwrap().id;

    let (status, body) = send(
        &h.app,
        post_json(
            "/selected",
            None,
            json!({ "email": "a@x.com", "itemId": hotel_id, "name": "Sea Pearl" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let selection_id = body["insertedId"].as_str().unwrap().to_string();
    let (_, selected) = send(&h.app, get("/selected?email=a@x.com", Some("a@x.com"))).await;
    assert_eq!(selected.as_array().unwrap().len(), 1);

    let cases: Vec<(Request<Body>, &str, Value)> = vec![
        (get(&format!("/bookings/{}", stay.id), None), "/_id", json!(stay.id)),
        (get("/addedhotel?email=owner@x.com", None), "/0/_id", json!(hotel_id)),
        (get("/addedhotel?email=other@x.com", None), "", json!([])),
        (get("/addedhotell", None), "/0/status", json!("pending")),
        (patch(&format!("/addedhotell/deny/{}", hotel_id)), "/modifiedCount", json!(1)),
        (get("/addedhotell", None), "/0/status", json!("denied")),
        (delete(&format!("/selected/{}", selection_id)), "/deletedCount", json!(1)),
        (delete(&format!("/selected/{}", selection_id)), "/deletedCount", json!(0)),
        (delete(&format!("/bookings/{}", stay.id)), "/deletedCount", json!(1)),
        (delete(&format!("/addedhotel/{}", hotel_id)), "/deletedCount", json!(1)),
        (delete(&format!("/users/admin/{}", user_id)), "/deletedCount", json!(1)),
        (get("/addedhotell", None), "", json!([])),
    ];
    for (request, pointer, expected) in cases {
        let label = format!("{} {}", request.method(), request.uri());
        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK, "{label}: {body}");
        assert_eq!(body.pointer(pointer), Some(&expected), "{label}: {body}");
    }

    let (status, _) = send(&h.app, get(&format!("/bookings/{}", stay.id), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(h.store.list_users().unwrap().is_empty());
    assert!(h.store.list_selections("a@x.com").unwrap().is_empty());
}
