//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use checkout_engine::{
    db_types::LedgerId,
    order_objects::{ClientConfirmation, CreateOrderRequest, ReconciliationResult, ShippingUpdate},
    traits::{OrderLedger, PaymentGateway},
    CheckoutApi,
    CheckoutError,
    OrderQueryApi,
    ReconciliationApi,
};
use log::*;

use crate::{
    data_objects::{AdminNote, ConfirmationResponse, JsonResponse},
    errors::ServerError,
};

/// The header carrying the hex HMAC of the raw webhook body.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(create_order => Post "/checkout/order" impl OrderLedger, PaymentGateway);
/// Route handler for order creation
///
/// Records a pending order in the ledger and creates the matching order on the payment gateway. The response carries
/// what the storefront needs to open the gateway's payment widget.
///
/// A `503` means the gateway could not be reached. The pending ledger entry is left behind and the storefront may
/// simply try again, which creates a fresh entry.
pub async fn create_order<B, G>(
    body: web::Json<CreateOrderRequest>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderLedger,
    G: PaymentGateway,
{
    let CreateOrderRequest { amount, cart_snapshot } = body.into_inner();
    debug!("💻️ POST create order for {amount} ({} items)", cart_snapshot.items.len());
    let created = api.create_order(&amount, cart_snapshot).await?;
    Ok(HttpResponse::Ok().json(created))
}

route!(confirm_payment => Post "/checkout/confirm" impl OrderLedger, PaymentGateway);
/// Route handler for the client payment confirmation
///
/// The storefront forwards the gateway's signed confirmation here once the payment widget reports success. The captured
/// amount is checked with the gateway before the order is marked paid. A repeated confirmation, or one that arrives
/// after the webhook already settled the order, still answers `ok`.
pub async fn confirm_payment<B, G>(
    body: web::Json<ClientConfirmation>,
    api: web::Data<ReconciliationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderLedger,
    G: PaymentGateway,
{
    let confirmation = body.into_inner();
    debug!("💻️ POST payment confirmation for gateway order {}", confirmation.gateway_order_id);
    let ledger_id = match api.confirm_client_payment(confirmation).await {
        Ok(result) => result.ledger_id().cloned().ok_or_else(|| {
            error!("💻️ Client confirmation did not resolve to an order. {result:?}");
            ServerError::BackendError("Confirmation did not resolve to an order".into())
        })?,
        Err(CheckoutError::AlreadyProcessed(order)) => order.id,
        Err(e) => return Err(e.into()),
    };
    Ok(HttpResponse::Ok().json(ConfirmationResponse::ok(ledger_id)))
}

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(gateway_webhook => Post "/gateway" impl OrderLedger, PaymentGateway);
/// Route handler for payment gateway webhooks
///
/// The signature is checked against the body exactly as it arrived, so the body is taken as raw bytes.
///
/// The gateway redelivers anything that is not acknowledged with a `200`. Once the signature is valid, only a store
/// failure is reported as an error, since that is the only case where a retry can succeed. Everything else is
/// acknowledged, with `success: false` when the event could not be applied.
pub async fn gateway_webhook<B, G>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderLedger,
    G: PaymentGateway,
{
    trace!("💻️ Received webhook ({} bytes)", body.len());
    let signature = req
        .headers()
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("💻️ Webhook without a {WEBHOOK_SIGNATURE_HEADER} header");
            ServerError::RejectedWebhook(format!("Missing {WEBHOOK_SIGNATURE_HEADER} header"))
        })?;
    let reply = match api.process_webhook(body.as_ref(), signature).await {
        Ok(ReconciliationResult::Applied(order)) => {
            JsonResponse::success(format!("Order {} is now {}", order.id, order.status))
        },
        Ok(ReconciliationResult::AlreadyProcessed(order)) => {
            JsonResponse::success(format!("Order {} was already processed", order.id))
        },
        Ok(ReconciliationResult::Ignored(event)) => JsonResponse::success(format!("Ignored {event} event")),
        Err(CheckoutError::AlreadyProcessed(order)) => {
            JsonResponse::success(format!("Order {} was already processed", order.id))
        },
        Err(e @ CheckoutError::SignatureInvalid(_)) | Err(e @ CheckoutError::DatabaseError(_)) => {
            return Err(e.into());
        },
        Err(e) => {
            warn!("💻️ Webhook acknowledged without effect. {e}");
            JsonResponse::failure(e)
        },
    };
    Ok(HttpResponse::Ok().json(reply))
}

//----------------------------------------------   Tracking  ----------------------------------------------------
route!(track_order => Get "/track/{ledger_id}" impl OrderLedger);
/// Route handler for the storefront's order-tracking page
pub async fn track_order<B: OrderLedger>(
    path: web::Path<LedgerId>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET tracking for {id}");
    let tracking = api.tracking(&id).await?;
    Ok(HttpResponse::Ok().json(tracking))
}

//----------------------------------------------   Back office  ----------------------------------------------------
route!(order_by_id => Get "/order/{ledger_id}" impl OrderLedger);
/// The full order, including the payment record and status history
pub async fn order_by_id<B: OrderLedger>(
    path: web::Path<LedgerId>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET order {id}");
    let detail = api.order_detail(&id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

route!(update_shipping => Patch "/order/{ledger_id}/shipping" impl OrderLedger);
/// Sets the shipping progress label. The order status is not affected.
pub async fn update_shipping<B: OrderLedger>(
    path: web::Path<LedgerId>,
    body: web::Json<ShippingUpdate>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ PATCH shipping status for {id}");
    let order = api.update_shipping_status(&id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(fulfil_order => Post "/order/{ledger_id}/fulfil" impl OrderLedger, PaymentGateway);
pub async fn fulfil_order<B, G>(
    path: web::Path<LedgerId>,
    body: Option<web::Json<AdminNote>>,
    api: web::Data<ReconciliationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderLedger,
    G: PaymentGateway,
{
    let id = path.into_inner();
    let note = body.and_then(|b| b.into_inner().note);
    info!("💻️ POST fulfil order {id}");
    let order = api.fulfil_order(&id, note).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/order/{ledger_id}/cancel" impl OrderLedger, PaymentGateway);
pub async fn cancel_order<B, G>(
    path: web::Path<LedgerId>,
    body: Option<web::Json<AdminNote>>,
    api: web::Data<ReconciliationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderLedger,
    G: PaymentGateway,
{
    let id = path.into_inner();
    let note = body.and_then(|b| b.into_inner().note);
    info!("💻️ POST cancel order {id}");
    let order = api.cancel_order(&id, note).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(flagged_orders => Get "/orders/flagged" impl OrderLedger);
/// Orders held for manual review after an amount mismatch
pub async fn flagged_orders<B: OrderLedger>(api: web::Data<OrderQueryApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET flagged orders");
    let orders = api.flagged_orders().await?;
    Ok(HttpResponse::Ok().json(orders))
}
