//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (e.g. I/O, database operations,
//! calls to the payment provider) must be expressed as futures or asynchronous functions.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use recon_engine::{
    db_types::OrderId,
    ledger_objects::Pagination,
    traits::{LedgerManagement, OrderStatusProvider, ReconciliationDatabase, TransactionManagement},
    ReconciliationApi,
    ReconciliationError,
    RewardsApi,
    TransactionsApi,
};

use crate::{
    auth::{AuthenticatedUser, Role},
    data_objects::{
        BalanceResponse,
        EntryTypeFilter,
        JsonResponse,
        RegisterOrderRequest,
        WebhookPayload,
        WithdrawalRequest,
        WithdrawalStatusUpdate,
    },
    errors::ServerError,
};

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

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:ty),*])  => {
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
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
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

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(paycrest_webhook => Post "/paycrest" impl ReconciliationDatabase);
/// Route handler for the provider's webhook.
///
/// By the time the request gets here, the HMAC middleware has already checked the signature over the raw body.
///
/// The order id is taken from `data.id`, and the status from `data.status`, falling back to `event`. A body without
/// an order id is rejected with 400. Every other outcome, including a status report for an order we have never heard
/// of, is acknowledged with 200 so that the provider does not keep retrying.
pub async fn paycrest_webhook<B: ReconciliationDatabase>(
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received webhook request");
    let payload = serde_json::from_slice::<WebhookPayload>(body.as_ref()).map_err(|e| {
        warn!("💻️ Could not deserialize webhook payload. {e}");
        ServerError::CouldNotDeserializePayload(e.to_string())
    })?;
    let order_id = payload.order_id().ok_or_else(|| {
        warn!("💻️ Webhook payload did not contain an order id");
        ServerError::ValidationError("The webhook payload does not contain an order id".to_string())
    })?;
    let raw_status = payload.raw_status();
    let raw_body = String::from_utf8_lossy(body.as_ref()).into_owned();
    match api.process_webhook(&order_id, &raw_status, raw_body).await {
        Ok(result) => {
            let message = format!("Order {order_id} status report was {}", result.outcome);
            Ok(HttpResponse::Ok().json(JsonResponse::success(message)))
        },
        Err(ReconciliationError::TransactionNotFound(id)) => {
            Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Order {id} is not known. Ignoring."))))
        },
        Err(e) => Err(e.into()),
    }
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(register_order => Post "/orders" impl ReconciliationDatabase, OrderStatusProvider where requires [Role::Service]);
/// Registers a newly initiated payment order on behalf of a user. Only the service that creates orders with the
/// provider may call this.
///
/// The order is checked against the provider before it is stored, and is rejected if the provider does not know it or
/// reports a different amount. Registering the same order twice for the same user returns the original record.
pub async fn register_order<B: ReconciliationDatabase, P: OrderStatusProvider>(
    caller: AuthenticatedUser,
    body: web::Json<RegisterOrderRequest>,
    api: web::Data<ReconciliationApi<B>>,
    provider: web::Data<P>,
) -> Result<HttpResponse, ServerError> {
    let order = body.into_inner().into_new_transaction()?;
    let owner = order.user_id.clone();
    debug!("💻️ POST register order {} for {owner} by {}", order.order_id, caller.user_id);
    let txn = api.register_verified_order(provider.get_ref(), order).await?;
    if txn.user_id != owner {
        warn!("💻️ Order {} is already registered to {}. Refusing to register it for {owner}", txn.order_id, txn.user_id);
        return Err(ServerError::Conflict(format!("Order {} is already registered to another user", txn.order_id)));
    }
    Ok(HttpResponse::Ok().json(txn))
}

route!(poll_order => Post "/orders/{order_id}/poll" impl ReconciliationDatabase, OrderStatusProvider);
/// Asks the provider for the current status of one order and applies it immediately.
///
/// Users may poll their own orders. Admins may poll any order.
pub async fn poll_order<B: ReconciliationDatabase, P: OrderStatusProvider>(
    user: AuthenticatedUser,
    path: web::Path<String>,
    api: web::Data<ReconciliationApi<B>>,
    provider: web::Data<P>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ POST poll order {order_id} for {}", user.user_id);
    let txn = api
        .db()
        .fetch_transaction(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} does not exist")))?;
    if txn.user_id != user.user_id && !user.is_admin() {
        // Same response as a missing order, so that order ids cannot be probed
        return Err(ServerError::NoRecordFound(format!("Order {order_id} does not exist")));
    }
    let result = api.poll_order(provider.get_ref(), &order_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(my_transactions => Get "/transactions" impl TransactionManagement);
/// All of the authenticated user's transactions, newest first.
pub async fn my_transactions<B: TransactionManagement>(
    user: AuthenticatedUser,
    api: web::Data<TransactionsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET transactions for {}", user.user_id);
    let transactions = api.transactions_for_user(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(transactions))
}

//----------------------------------------------   Rewards  ----------------------------------------------------
route!(my_balance => Get "/rewards/balance" impl LedgerManagement);
/// The user's reward balance. It is recomputed from the ledger on every call.
pub async fn my_balance<B: LedgerManagement>(
    user: AuthenticatedUser,
    api: web::Data<RewardsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET balance for {}", user.user_id);
    let balance = api.balance(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(BalanceResponse { balance }))
}

route!(my_rewards_summary => Get "/rewards/summary" impl LedgerManagement);
pub async fn my_rewards_summary<B: LedgerManagement>(
    user: AuthenticatedUser,
    api: web::Data<RewardsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET rewards summary for {}", user.user_id);
    let summary = api.summary(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(my_rewards_history => Get "/rewards/history" impl LedgerManagement);
/// A page of the user's ledger, newest first. Accepts `page`, `limit` and `type` query parameters.
pub async fn my_rewards_history<B: LedgerManagement>(
    user: AuthenticatedUser,
    pagination: web::Query<Pagination>,
    filter: web::Query<EntryTypeFilter>,
    api: web::Data<RewardsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let pagination = pagination.into_inner();
    debug!("💻️ GET rewards history for {} ({pagination:?})", user.user_id);
    let page = api.history(&user.user_id, filter.entry_type, pagination).await?;
    Ok(HttpResponse::Ok().json(page))
}

route!(my_withdrawals => Get "/rewards/withdrawals" impl LedgerManagement);
pub async fn my_withdrawals<B: LedgerManagement>(
    user: AuthenticatedUser,
    pagination: web::Query<Pagination>,
    api: web::Data<RewardsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET withdrawals for {}", user.user_id);
    let page = api.withdrawals(&user.user_id, pagination.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

route!(request_withdrawal => Post "/rewards/withdraw" impl LedgerManagement);
/// Requests a withdrawal of reward points to a bank account. The points are deducted immediately, and returned if the
/// payout later fails.
pub async fn request_withdrawal<B: LedgerManagement>(
    user: AuthenticatedUser,
    body: web::Json<WithdrawalRequest>,
    api: web::Data<RewardsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let WithdrawalRequest { points, destination } = body.into_inner();
    debug!("💻️ POST withdrawal of {points} for {}", user.user_id);
    let entry = api.request_withdrawal(&user.user_id, points, destination).await.map_err(|e| {
        debug!("💻️ Withdrawal request from {} was rejected. {e}", user.user_id);
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Created().json(entry))
}

route!(update_withdrawal_status => Patch "/rewards/withdrawals/{id}" impl LedgerManagement where requires [Role::Admin]);
/// Admins use this endpoint to mark a pending withdrawal as completed or failed.
pub async fn update_withdrawal_status<B: LedgerManagement>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<WithdrawalStatusUpdate>,
    api: web::Data<RewardsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let status = body.status;
    info!("💻️ PATCH withdrawal #{id} to {status} by {}", user.user_id);
    let entry = api.update_withdrawal_status(id, status).await?;
    Ok(HttpResponse::Ok().json(entry))
}

route!(recalculate_balance => Post "/rewards/recalculate" impl LedgerManagement);
/// Rebuilds the user's cached balance from the ledger and reports whether it had drifted.
pub async fn recalculate_balance<B: LedgerManagement>(
    user: AuthenticatedUser,
    api: web::Data<RewardsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST recalculate balance for {}", user.user_id);
    let correction = api.recalculate(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(correction))
}

