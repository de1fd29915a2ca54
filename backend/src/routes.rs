use std::time::Instant;

use axum::{
    extract::Request,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::auth::authenticate;
use crate::handlers::{bookings, hotels, payments, places, selections, token, users};
use crate::state::AppState;

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    log::info!(
        "{} {} -> {} in {:?}",
        method,
        path,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

/// Builds the full router. Methods chained before a `route_layer` call need a
/// bearer token; methods chained after it are public.
pub fn app(state: AppState) -> Router {
    let auth = || middleware::from_fn_with_state(state.clone(), authenticate);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let router = Router::new()
        .route("/", get(|| async { "Trip is going on" }))
        .route("/jwt", post(token::issue_token))
        // users
        .route(
            "/users",
            get(users::list_users)
                .route_layer(auth())
                .post(users::create_user),
        )
        .route(
            "/users/admin/:id",
            get(users::check_admin)
                .route_layer(auth())
                .delete(users::delete_user)
                .patch(users::make_admin),
        )
        // places
        .route("/place", get(places::list_places))
        .route("/place/:id", get(places::get_place))
        // selections
        .route(
            "/selected",
            get(selections::list_selections)
                .route_layer(auth())
                .post(selections::create_selection),
        )
        .route("/selected/:id", delete(selections::delete_selection))
        // hotels
        .route("/hotel", get(hotels::list_approved))
        .route("/hotel/:id", get(hotels::get_hotel))
        .route("/search/:text", get(hotels::search))
        .route(
            "/addedhotel",
            post(hotels::create_hotel)
                .route_layer(auth())
                .get(hotels::list_owned),
        )
        .route("/addedhotel/:id", delete(hotels::delete_hotel))
        .route("/addedhotell", get(hotels::list_all))
        .route("/addedhotell/approve/:id", patch(hotels::approve))
        .route("/addedhotell/deny/:id", patch(hotels::deny))
        // bookings
        .route(
            "/bookings",
            get(bookings::list_bookings)
                .route_layer(auth())
                .post(bookings::create_booking),
        )
        .route(
            "/bookings/:id",
            get(bookings::get_booking)
                .delete(bookings::delete_booking)
                .patch(bookings::reserve_room),
        )
        // checkout
        .route(
            "/hotel/order",
            post(payments::create_order).route_layer(auth()),
        )
        .route("/payment/success/:tran_id", post(payments::payment_success))
        .route("/payment/fail/:tran_id", post(payments::payment_fail))
        .route("/payment/cancel/:tran_id", post(payments::payment_cancel))
        .route("/payment/ipn", post(payments::payment_ipn))
        .route(
            "/payment",
            get(payments::list_payments)
                .post(payments::record_card_payment)
                .route_layer(auth()),
        )
        .route(
            "/create-payment-intent",
            post(payments::create_payment_intent).route_layer(auth()),
        )
        .layer(cors)
        .layer(middleware::from_fn(log_request));

    router.with_state(state)
}
