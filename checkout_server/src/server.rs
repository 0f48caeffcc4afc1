use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use checkout_engine::{
    events::{EventHandlers, EventHooks, EventProducers, OrderFlaggedEvent},
    fulfilment::FulfilmentDispatcher,
    CheckoutApi,
    OrderQueryApi,
    ReconciliationApi,
    SqliteDatabase,
};
use futures::future::{ok, Either};
use log::{error, info, warn};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::{GatewayClient, SmtpMailer},
    middleware::AdminAuthMiddlewareFactory,
    routes::{
        health,
        CancelOrderRoute,
        ConfirmPaymentRoute,
        CreateOrderRoute,
        FlaggedOrdersRoute,
        FulfilOrderRoute,
        GatewayWebhookRoute,
        OrderByIdRoute,
        TrackOrderRoute,
        UpdateShippingRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway =
        GatewayClient::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let hooks = create_event_hooks(&config);
    let handlers = EventHandlers::new(config.event_buffer_size, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Post-payment side effects. These run in their own tasks and never hold up a reconciliation request.
pub fn create_event_hooks(config: &ServerConfig) -> EventHooks {
    let mut hooks = EventHooks::default();
    let mut dispatcher = FulfilmentDispatcher::new(config.fulfilment.clone());
    match config.smtp.as_ref().map(SmtpMailer::new) {
        Some(Ok(mailer)) => dispatcher = dispatcher.with_mailer(Arc::new(mailer)),
        Some(Err(e)) => error!("📬️ Could not configure SMTP. Invoices will not be emailed. {e}"),
        None => {},
    }
    dispatcher.register(&mut hooks);
    hooks.on_order_flagged(|ev: OrderFlaggedEvent| {
        Box::pin(async move {
            warn!(
                "🚩️ Order {} needs manual review: expected {} {} but the gateway captured {}",
                ev.order.id, ev.expected, ev.order.currency, ev.captured
            );
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: GatewayClient,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let checkout_api = CheckoutApi::new(db.clone(), gateway.clone())
            .with_currency(config.currency.clone())
            .with_gateway_timeout(config.gateway_timeout());
        let reconciliation_api = ReconciliationApi::new(
            db.clone(),
            gateway.clone(),
            producers.clone(),
            config.gateway.key_secret.clone(),
            config.webhook_secret.clone(),
        )
        .with_gateway_timeout(config.gateway_timeout());
        let query_api = OrderQueryApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sfc::access_log"))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(reconciliation_api))
            .app_data(web::Data::new(query_api));
        // Back-office routes
        let admin_scope = web::scope("/api")
            .wrap(AdminAuthMiddlewareFactory::new(config.admin_token.clone()))
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdateShippingRoute::<SqliteDatabase>::new())
            .service(FulfilOrderRoute::<SqliteDatabase, GatewayClient>::new())
            .service(CancelOrderRoute::<SqliteDatabase, GatewayClient>::new())
            .service(FlaggedOrdersRoute::<SqliteDatabase>::new());
        let use_x_forwarded_for = config.use_x_forwarded_for;
        let use_forwarded = config.use_forwarded;
        let gateway_whitelist = config.gateway_whitelist.clone();
        let webhook_scope = web::scope("/webhook")
            .wrap_fn(move |req, srv| {
                let peer_ip = get_remote_ip(&req, use_x_forwarded_for, use_forwarded);
                let whitelisted = match (peer_ip, &gateway_whitelist) {
                    (Some(ip), Some(whitelist)) => {
                        info!("Gateway webhook from {ip}");
                        whitelist.contains(&ip)
                    },
                    (_, None) => true,
                    (None, Some(_)) => {
                        warn!("No IP address found in gateway remote peer request, denying access.");
                        false
                    },
                };
                if whitelisted {
                    Either::Left(srv.call(req))
                } else {
                    Either::Right(ok(req.error_response(ServerError::ForbiddenPeer)))
                }
            })
            .service(GatewayWebhookRoute::<SqliteDatabase, GatewayClient>::new());
        app.service(health)
            .service(CreateOrderRoute::<SqliteDatabase, GatewayClient>::new())
            .service(ConfirmPaymentRoute::<SqliteDatabase, GatewayClient>::new())
            .service(TrackOrderRoute::<SqliteDatabase>::new())
            .service(webhook_scope)
            .service(admin_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
