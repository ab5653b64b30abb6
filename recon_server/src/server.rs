use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use futures::future::BoxFuture;
use log::*;
use recon_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    ReconciliationApi,
    RewardsApi,
    SqliteDatabase,
    TransactionsApi,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::provider::ProviderStatusSource,
    middleware::{HmacMiddlewareFactory, IdentityMiddlewareFactory},
    poll_worker::start_poll_worker,
    routes::{
        health,
        MyBalanceRoute,
        MyRewardsHistoryRoute,
        MyRewardsSummaryRoute,
        MyTransactionsRoute,
        MyWithdrawalsRoute,
        PaycrestWebhookRoute,
        PollOrderRoute,
        RecalculateBalanceRoute,
        RegisterOrderRoute,
        RequestWithdrawalRoute,
        UpdateWithdrawalStatusRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_event_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let provider = ProviderStatusSource::new(config.provider.clone())?;
    if config.poll.is_enabled() {
        let api = ReconciliationApi::new(db.clone(), producers.clone());
        // The worker runs for the lifetime of the process
        let _handle = start_poll_worker(api, provider.clone(), config.poll);
    } else {
        warn!("🕰️ The poll worker is disabled. Transactions will only be updated by webhook or manual polls.");
    }
    let srv = create_server_instance(config, db, producers, provider)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    provider: ProviderStatusSource,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let recon_api = ReconciliationApi::new(db.clone(), producers.clone());
        let rewards_api = RewardsApi::new(db.clone()).with_min_withdrawal(config.min_withdrawal);
        let transactions_api = TransactionsApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("recon::access_log"))
            .app_data(web::Data::new(recon_api))
            .app_data(web::Data::new(rewards_api))
            .app_data(web::Data::new(transactions_api))
            .app_data(web::Data::new(provider.clone()));
        // Routes that require an authenticated user
        let api_scope = web::scope("/api")
            .wrap(IdentityMiddlewareFactory::new(config.identity.clone()))
            .service(RegisterOrderRoute::<SqliteDatabase, ProviderStatusSource>::new())
            .service(PollOrderRoute::<SqliteDatabase, ProviderStatusSource>::new())
            .service(MyTransactionsRoute::<SqliteDatabase>::new())
            .service(MyBalanceRoute::<SqliteDatabase>::new())
            .service(MyRewardsSummaryRoute::<SqliteDatabase>::new())
            .service(MyRewardsHistoryRoute::<SqliteDatabase>::new())
            .service(MyWithdrawalsRoute::<SqliteDatabase>::new())
            .service(RequestWithdrawalRoute::<SqliteDatabase>::new())
            .service(UpdateWithdrawalStatusRoute::<SqliteDatabase>::new())
            .service(RecalculateBalanceRoute::<SqliteDatabase>::new());
        let webhook_scope = web::scope("/webhooks")
            .wrap(HmacMiddlewareFactory::new(
                &config.webhook.signature_header,
                config.webhook.secret.clone(),
                config.webhook.signature_checks,
            ))
            .service(PaycrestWebhookRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// Operator notifications. Events are logged. Flagged observations are logged as warnings so that they show up in
/// alerting.
fn create_event_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks
        .on_status_changed(|ev| -> BoxFuture<'static, ()> {
            Box::pin(async move {
                info!("📬️ Order {} ({}) is now {} [{}]", ev.order_id, ev.user_id, ev.to, ev.origin);
            })
        })
        .on_points_credited(|ev| -> BoxFuture<'static, ()> {
            Box::pin(async move {
                info!("📬️ {} earned {} points for order {}", ev.user_id, ev.points, ev.order_id);
            })
        })
        .on_review_required(|ev| -> BoxFuture<'static, ()> {
            Box::pin(async move {
                warn!(
                    "📬️ Order {} needs manual review. Unrecognised status '{}' received via {} at {}",
                    ev.order_id, ev.raw_status, ev.origin, ev.observed_at
                );
            })
        });
    EventHandlers::new(EVENT_BUFFER_SIZE, hooks)
}
