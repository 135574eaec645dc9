//! # API REST
//!
//! REST API implementation for Mandal.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, API key header)
//!
//! Uses `api-shared` for request/response types and `mandal-core` for all business logic.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    validate_api_key, CatalogEntryRes, CreateOrderRes, CustomerReq, ErrorRes, EventRes,
    HealthRes, HealthService, ListCatalogRes, ListOrdersRes, OrderItemReq, OrderReq,
    PaymentLinkReq, PaymentLinkRes, ReceiptRes, ReceiptTotalsRes, StoredOrderItemRes,
    StoredOrderRes, UpcomingEventsRes, API_KEY_HEADER,
};
use mandal_core::catalog::Catalog;
use mandal_core::checkout::{CheckoutError, CheckoutErrorKind, CheckoutService};
use mandal_core::events::EventCalendar;
use mandal_core::messaging::{LogOnlySender, SmsSender, TwilioSender};
use mandal_core::payment::{parse_amount, PaymentRequest, UpiLinkBuilder, DEFAULT_QR_SIZE};
use mandal_core::repositories::file::FileOrderRepository;
use mandal_core::repositories::OrderRepository;
use mandal_core::{CoreConfig, MandalError, ShardableUuid};

/// Largest QR code edge a client may ask for, in pixels.
const MAX_QR_SIZE: u32 = 1024;

type ApiError = (StatusCode, Json<ErrorRes>);
type ApiResult<T> = Result<T, ApiError>;

/// Application state shared by all request handlers.
///
/// Everything here is resolved once at startup; handlers never read the environment.
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<CoreConfig>,
    links: Arc<UpiLinkBuilder>,
    catalog: Arc<Catalog>,
    events: Arc<EventCalendar>,
    checkout: Arc<CheckoutService>,
    api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        cfg: Arc<CoreConfig>,
        catalog: Catalog,
        events: EventCalendar,
        repo: Arc<dyn OrderRepository>,
        sms: Arc<dyn SmsSender>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            links: Arc::new(UpiLinkBuilder::new(cfg.payment().clone())),
            catalog: Arc::new(catalog),
            events: Arc::new(events),
            checkout: Arc::new(CheckoutService::new(cfg.clone(), repo, sms)),
            api_key: api_key.filter(|k| !k.is_empty()).map(Arc::from),
            cfg,
        }
    }

    /// Wires the production adapters: file order storage, the events file (if configured)
    /// and the SMS provider (or a log-only sender when none is configured).
    ///
    /// # Errors
    ///
    /// Returns an error if the events file cannot be loaded or the SMS client cannot be built.
    pub fn from_config(cfg: Arc<CoreConfig>, api_key: Option<String>) -> anyhow::Result<Self> {
        let events = match cfg.events_file() {
            Some(path) => EventCalendar::load(path)?,
            None => {
                tracing::warn!("MANDAL_EVENTS_FILE not set, no events will be listed");
                EventCalendar::default()
            }
        };

        let sms: Arc<dyn SmsSender> = match cfg.sms() {
            Some(sms_cfg) => Arc::new(TwilioSender::new(sms_cfg)?),
            None => {
                tracing::warn!("TWILIO_* not set, receipt messages will only be logged");
                Arc::new(LogOnlySender)
            }
        };

        if api_key.as_deref().is_none_or(str::is_empty) {
            tracing::warn!("API_KEY not set, order endpoints are open");
        }

        let repo = Arc::new(FileOrderRepository::from_config(&cfg));
        Ok(Self::new(
            cfg,
            Catalog::festival_photos(),
            events,
            repo,
            sms,
            api_key,
        ))
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        payment_link,
        list_catalog,
        get_catalog_entry,
        upcoming_events,
        preview_receipt,
        create_order,
        list_orders,
        order_receipt,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        PaymentLinkReq,
        PaymentLinkRes,
        CatalogEntryRes,
        ListCatalogRes,
        EventRes,
        UpcomingEventsRes,
        CustomerReq,
        OrderItemReq,
        OrderReq,
        ReceiptTotalsRes,
        ReceiptRes,
        StoredOrderRes,
        StoredOrderItemRes,
        CreateOrderRes,
        ListOrdersRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI at `/swagger-ui`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/payments/link", post(payment_link))
        .route("/catalog", get(list_catalog))
        .route("/catalog/:id", get(get_catalog_entry))
        .route("/events/upcoming", get(upcoming_events))
        .route("/receipts", post(preview_receipt))
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/:id/receipt", get(order_receipt))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorRes::new(message)))
}

fn internal_error(context: &str, e: impl std::fmt::Display) -> ApiError {
    tracing::error!("{context}: {e}");
    error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
}

/// Maps core errors to statuses: bad input 400, unknown order 404, duplicate items 409,
/// anything else 500.
fn core_error(context: &str, e: MandalError) -> ApiError {
    match e {
        MandalError::InvalidInput(_)
        | MandalError::Payment(_)
        | MandalError::Text(_)
        | MandalError::Uuid(_)
        | MandalError::InvalidPhoneNumber(_)
        | MandalError::LastOrderItem
        | MandalError::OrderItemOutOfBounds(_) => error(StatusCode::BAD_REQUEST, e.to_string()),
        MandalError::OrderNotFound(_) => error(StatusCode::NOT_FOUND, e.to_string()),
        MandalError::OrderItemsAlreadyStored(_) => error(StatusCode::CONFLICT, e.to_string()),
        other => internal_error(context, other),
    }
}

fn checkout_error(e: CheckoutError) -> ApiError {
    let (status, kind) = match (&e, e.kind()) {
        (CheckoutError::SubmissionInProgress, _) => (StatusCode::CONFLICT, "validation"),
        (_, CheckoutErrorKind::Validation) => (StatusCode::BAD_REQUEST, "validation"),
        (_, CheckoutErrorKind::NetworkOrApi) => (StatusCode::BAD_GATEWAY, "network_or_api"),
        (_, CheckoutErrorKind::Unexpected) => (StatusCode::INTERNAL_SERVER_ERROR, "unexpected"),
    };
    if status.is_server_error() {
        tracing::error!("checkout failed: {e}");
    }
    (
        status,
        Json(ErrorRes {
            error: e.user_message(),
            kind: Some(kind.into()),
        }),
    )
}

fn require_api_key(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    validate_api_key(state.api_key.as_deref(), provided)
        .map_err(|e| error(StatusCode::UNAUTHORIZED, e.to_string()))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/payments/link",
    request_body = PaymentLinkReq,
    responses(
        (status = 200, description = "UPI deep link", body = PaymentLinkRes),
        (status = 400, description = "Amount, payee or note rejected", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Build a UPI payment link, optionally with an SVG QR code
///
/// The payee defaults to the configured mandal account. Validation happens before any
/// formatting or rendering.
#[axum::debug_handler]
async fn payment_link(
    State(state): State<AppState>,
    Json(req): Json<PaymentLinkReq>,
) -> ApiResult<Json<PaymentLinkRes>> {
    let amount =
        parse_amount(&req.amount).map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let config = state.links.config();
    let request = PaymentRequest {
        amount,
        payee_id: req
            .payee_id
            .unwrap_or_else(|| config.payee_id().to_owned()),
        payee_name: req
            .payee_name
            .or_else(|| config.payee_name().map(str::to_owned)),
        note: req.note,
    };
    let link = state
        .links
        .build(&request)
        .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let qr_size = req
        .include_qr
        .then(|| req.qr_size.unwrap_or(DEFAULT_QR_SIZE).clamp(1, MAX_QR_SIZE));
    let res = PaymentLinkRes::new(&link, qr_size).map_err(|e| core_error("QR render error", e))?;

    Ok(Json(res))
}

/// Catalog search parameters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CatalogQuery {
    /// Case-insensitive text matched against name and description.
    q: Option<String>,
    /// Exact category, case-insensitive.
    category: Option<String>,
}

#[utoipa::path(
    get,
    path = "/catalog",
    params(CatalogQuery),
    responses(
        (status = 200, description = "Matching catalog entries in catalog order", body = ListCatalogRes)
    )
)]
/// Search the photo catalog
#[axum::debug_handler]
async fn list_catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Json<ListCatalogRes> {
    let entries = state
        .catalog
        .search(query.q.as_deref().unwrap_or(""), query.category.as_deref())
        .into_iter()
        .map(CatalogEntryRes::from)
        .collect();
    Json(ListCatalogRes { entries })
}

#[utoipa::path(
    get,
    path = "/catalog/{id}",
    params(("id" = String, Path, description = "Catalog entry id")),
    responses(
        (status = 200, description = "Catalog entry", body = CatalogEntryRes),
        (status = 404, description = "No such entry", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_catalog_entry(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<CatalogEntryRes>> {
    state
        .catalog
        .get(&id)
        .map(|entry| Json(CatalogEntryRes::from(entry)))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("catalog entry not found: {id}")))
}

#[utoipa::path(
    get,
    path = "/events/upcoming",
    responses(
        (status = 200, description = "Events dated now or later, earliest first", body = UpcomingEventsRes)
    )
)]
/// List upcoming events
///
/// An empty list means there are no upcoming events.
#[axum::debug_handler]
async fn upcoming_events(State(state): State<AppState>) -> Json<UpcomingEventsRes> {
    let events = state
        .events
        .upcoming(Utc::now())
        .into_iter()
        .map(EventRes::from)
        .collect();
    Json(UpcomingEventsRes { events })
}

#[utoipa::path(
    post,
    path = "/receipts",
    request_body = OrderReq,
    responses(
        (status = 200, description = "Receipt preview; nothing is stored", body = ReceiptRes),
        (status = 400, description = "Invalid order", body = ErrorRes)
    )
)]
/// Compute and render a receipt without storing the order
#[axum::debug_handler]
async fn preview_receipt(
    State(state): State<AppState>,
    Json(req): Json<OrderReq>,
) -> ApiResult<Json<ReceiptRes>> {
    let order = req
        .into_order()
        .map_err(|e| core_error("receipt preview", e))?;
    let generator = state.checkout.receipts();
    let receipt = generator
        .generate(&order, Utc::now())
        .map_err(|e| core_error("receipt preview", e))?;
    let document = generator.render(&receipt);
    Ok(Json(ReceiptRes::new(&receipt, &document)))
}

#[utoipa::path(
    post,
    path = "/orders",
    request_body = OrderReq,
    params(("x-api-key" = Option<String>, Header, description = "Required when API_KEY is configured")),
    responses(
        (status = 201, description = "Order stored and receipt message sent", body = CreateOrderRes),
        (status = 400, description = "Invalid order or phone number", body = ErrorRes),
        (status = 401, description = "Missing or invalid API key", body = ErrorRes),
        (status = 409, description = "Another order is being submitted", body = ErrorRes),
        (status = 502, description = "Order stored but the messaging API failed", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Submit an order: compute the receipt, store the order and text the customer
#[axum::debug_handler]
async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<OrderReq>,
) -> ApiResult<(StatusCode, Json<CreateOrderRes>)> {
    require_api_key(&state, &headers)?;
    let order = req.into_order().map_err(|e| core_error("create order", e))?;

    let outcome = state.checkout.submit(&order).await.map_err(checkout_error)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderRes {
            order: StoredOrderRes::from(&outcome.saved.order),
            items: outcome
                .saved
                .items
                .iter()
                .map(StoredOrderItemRes::from)
                .collect(),
            receipt_url: outcome.receipt_url,
            sms_sid: outcome.sms.sid,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/orders",
    params(("x-api-key" = Option<String>, Header, description = "Required when API_KEY is configured")),
    responses(
        (status = 200, description = "Stored orders, oldest first", body = ListOrdersRes),
        (status = 401, description = "Missing or invalid API key", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ListOrdersRes>> {
    require_api_key(&state, &headers)?;
    let orders = state
        .checkout
        .repository()
        .list_orders()
        .map_err(|e| core_error("list orders", e))?;
    Ok(Json(ListOrdersRes {
        orders: orders.iter().map(StoredOrderRes::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/orders/{id}/receipt",
    params(("id" = String, Path, description = "Order id (32 lowercase hex characters)")),
    responses(
        (status = 200, description = "Receipt of a stored order", body = ReceiptRes),
        (status = 400, description = "Malformed order id", body = ErrorRes),
        (status = 404, description = "No such order", body = ErrorRes)
    )
)]
/// Receipt of a stored order; this is the link sent to customers by SMS
#[axum::debug_handler]
async fn order_receipt(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<ReceiptRes>> {
    let id = ShardableUuid::parse(&id).map_err(|e| core_error("order receipt", e.into()))?;
    let repo = state.checkout.repository();
    let order = repo.get_order(&id).map_err(|e| core_error("order receipt", e))?;
    let items = repo
        .order_items(&id)
        .map_err(|e| core_error("order receipt", e))?;
    let receipt = order
        .to_receipt(&items)
        .map_err(|e| internal_error("stored order no longer valid", e))?;
    let document = state.checkout.receipts().render(&receipt);
    Ok(Json(ReceiptRes::new(&receipt, &document)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use mandal_core::messaging::{SmsError, SmsMessage, SmsReceipt};
    use mandal_core::repositories::memory::InMemoryOrderRepository;
    use serde_json::{json, Value};
    use tokio::sync::Notify;
    use tower::ServiceExt;

    struct FailingSender;

    #[async_trait]
    impl SmsSender for FailingSender {
        async fn send(&self, _message: &SmsMessage) -> Result<SmsReceipt, SmsError> {
            Err(SmsError::Network("connection refused".into()))
        }
    }

    /// Holds sends to one number until notified; everything else goes through.
    struct HoldingSender {
        number: &'static str,
        hold: Arc<Notify>,
    }

    #[async_trait]
    impl SmsSender for HoldingSender {
        async fn send(&self, message: &SmsMessage) -> Result<SmsReceipt, SmsError> {
            if message.to.as_str() == self.number {
                self.hold.notified().await;
            }
            Ok(SmsReceipt::default())
        }
    }

    const EVENTS_YAML: &str = "
- id: past
  title: Visarjan 2020
  description: Procession
  date: 2020-09-01T16:00:00Z
  location: River ghat
- id: future
  title: Visarjan 2099
  description: Procession
  date: 2099-09-01T16:00:00Z
  location: River ghat
";

    fn state_with(sms: Arc<dyn SmsSender>, api_key: Option<&str>) -> AppState {
        let cfg = Arc::new(
            CoreConfig::from_lookup(|key| match key {
                "UPI_PAYEE_ID" => Some("ganesh.mandal@okbank".to_owned()),
                "UPI_PAYEE_NAME" => Some("Ganesh Mandal".to_owned()),
                "RECEIPT_BASE_URL" => Some("https://mandal.example/orders".to_owned()),
                _ => None,
            })
            .unwrap(),
        );
        AppState::new(
            cfg,
            Catalog::festival_photos(),
            EventCalendar::parse(EVENTS_YAML).unwrap(),
            Arc::new(InMemoryOrderRepository::new()),
            sms,
            api_key.map(str::to_owned),
        )
    }

    fn app() -> Router {
        router(state_with(Arc::new(LogOnlySender), None))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn order_body(phone: &str) -> Value {
        json!({
            "customer": {
                "name": "Asha Patil",
                "email": "asha@example.org",
                "phone": phone,
                "address": "12 Temple Street, Khatav"
            },
            "items": [{"description": "Modak box", "quantity": 2, "unit_price": "10.00"}]
        })
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = send(app(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn payment_link_uses_configured_payee() {
        let (status, body) = send(
            app(),
            post_json("/payments/link", json!({"amount": "501", "include_qr": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["uri"],
            "upi://pay?pa=ganesh.mandal@okbank&pn=Ganesh%20Mandal&am=501.00&cu=INR"
        );
        assert!(body["qr_svg"].as_str().unwrap().contains("<svg"));
        assert!(body["qr_data_uri"]
            .as_str()
            .unwrap()
            .starts_with("data:image/svg+xml;base64,"));
    }

    #[tokio::test]
    async fn payment_link_rejects_large_amount() {
        let (status, body) =
            send(app(), post_json("/payments/link", json!({"amount": "100000.01"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("amount too large"));
    }

    #[tokio::test]
    async fn payment_link_rejects_payee_without_at() {
        let (status, body) = send(
            app(),
            post_json("/payments/link", json!({"amount": "10", "payee_id": "mandal"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("payee id"));
    }

    #[tokio::test]
    async fn catalog_search_and_lookup() {
        let (status, body) = send(app(), get("/catalog?q=YEAR%202024")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entries"].as_array().unwrap().len(), 3);

        let (_, body) = send(app(), get("/catalog?category=electronics")).await;
        assert_eq!(body["entries"].as_array().unwrap().len(), 2);

        let (status, body) = send(app(), get("/catalog/2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["price"], "199.99");

        let (status, _) = send(app(), get("/catalog/404")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upcoming_events_excludes_past() {
        let (status, body) = send(app(), get("/events/upcoming")).await;
        assert_eq!(status, StatusCode::OK);
        let events = body["events"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["id"], "future");
        assert!(events[0]["image_url"].as_str().unwrap().starts_with("https://"));
    }

    #[tokio::test]
    async fn receipt_preview_computes_totals() {
        let (status, body) = send(app(), post_json("/receipts", order_body("5551234567"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totals"]["subtotal"], "20.00");
        assert_eq!(body["totals"]["tax"], "2.00");
        assert_eq!(body["totals"]["total"], "22.00");
        assert!(body["pages"][0].as_str().unwrap().contains("INVOICE"));
    }

    #[tokio::test]
    async fn receipt_preview_rejects_empty_items() {
        let mut order = order_body("5551234567");
        order["items"] = json!([]);
        let (status, _) = send(app(), post_json("/receipts", order)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn order_flow_stores_and_serves_receipt() {
        let app = app();
        let (status, body) = send(app.clone(), post_json("/orders", order_body("(555) 123-4567"))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["order"]["id"].as_str().unwrap().to_owned();
        assert_eq!(
            body["receipt_url"],
            format!("https://mandal.example/orders/{id}/receipt")
        );
        assert_eq!(body["items"].as_array().unwrap().len(), 1);

        let (status, body) = send(app.clone(), get("/orders")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["orders"].as_array().unwrap().len(), 1);

        let (status, body) = send(app.clone(), get(&format!("/orders/{id}/receipt"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totals"]["total"], "22.00");

        let (status, _) = send(app.clone(), get("/orders/not-an-id/receipt")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(app, get(&format!("/orders/{}/receipt", ShardableUuid::new()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn order_with_bad_phone_is_validation_error() {
        let (status, body) = send(app(), post_json("/orders", order_body("12345"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation");
    }

    #[tokio::test]
    async fn messaging_failure_is_bad_gateway() {
        let app = router(state_with(Arc::new(FailingSender), None));
        let (status, body) = send(app, post_json("/orders", order_body("5551234567"))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "network_or_api");
    }

    #[tokio::test]
    async fn oversized_unit_price_is_bad_request() {
        let mut order = order_body("5551234567");
        order["items"][0]["unit_price"] = json!("79228162514264337593543950335");

        let (status, body) = send(app(), post_json("/receipts", order.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("exceeds the maximum"));

        let (status, _) = send(app(), post_json("/orders", order)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn only_duplicate_submissions_from_one_phone_conflict() {
        let hold = Arc::new(Notify::new());
        let state = state_with(
            Arc::new(HoldingSender {
                number: "+15551234567",
                hold: hold.clone(),
            }),
            None,
        );
        let app = router(state.clone());

        let first = tokio::spawn(send(
            app.clone(),
            post_json("/orders", order_body("5551234567")),
        ));
        while !state.checkout.is_submitting("5551234567") {
            tokio::task::yield_now().await;
        }

        let (status, _) = send(app.clone(), post_json("/orders", order_body("5559876543"))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) =
            send(app.clone(), post_json("/orders", order_body("(555) 123-4567"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "validation");

        hold.notify_one();
        let (status, _) = first.await.unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = send(app, get("/orders")).await;
        assert_eq!(body["orders"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn orders_require_api_key_when_configured() {
        let app = router(state_with(Arc::new(LogOnlySender), Some("s3cret")));

        let (status, _) = send(app.clone(), get("/orders")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/orders")
            .header(API_KEY_HEADER, "s3cret")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(app, post_json("/orders", order_body("5551234567"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
