//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate function. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (e.g. I/O, database operations,
//! etc.) must be expressed as futures or asynchronous functions. Password hashing is pushed onto the blocking pool by
//! the engine for the same reason.
//!
//! ## Access
//! Every route under `/api` states which credential mechanisms it accepts (see [`AuthMethod`]). The store integration
//! endpoints (order intake, status changes and notifications) only accept a tenant API key; the operator endpoints
//! accept any credential that resolves to a principal.
use std::time::Duration;

use actix_web::{
    cookie::{Cookie, SameSite},
    get,
    http::header,
    post,
    web,
    HttpRequest,
    HttpResponse,
    Responder,
};
use bytes::Bytes;
use chrono::Utc;
use comanda_engine::{
    db_types::OrderId,
    traits::{MessageSender, MessageUsageManagement, OrderManagement, TenantManagement, UserManagement},
    AuthApi,
    AuthMethod,
    LiveFeedApi,
    MessageQuotaApi,
    NotificationApi,
    NotificationOutcome,
    OrderFlowApi,
    TenantResolver,
    ANY_CREDENTIAL,
};
use futures::{stream, Stream};
use log::*;
use tokio::time::{interval, MissedTickBehavior};

use crate::{
    auth::{Caller, SessionClaims, SessionIssuer, SESSION_COOKIE},
    config::ServerOptions,
    data_objects::{
        ItemsUpdateRequest,
        JsonResponse,
        LoginRequest,
        LoginResponse,
        NewOrderRequest,
        NotifyResponse,
        OutForDeliveryResponse,
        StatusUpdateRequest,
    },
    errors::ServerError,
    helpers::get_remote_ip,
};

/// Store integrations authenticate with their tenant API key.
pub const API_KEY_ONLY: &[AuthMethod] = &[AuthMethod::ApiKey];

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal where accepts $methods:expr) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
            impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new($methods));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($param:ident: $($bound:ident)++),+ where accepts $methods:expr) => {
        paste::paste! { pub struct [<$name:camel Route>]<$($param),+>(core::marker::PhantomData<fn() -> ($($param,)+)>);}
        paste::paste! { impl<$($param),+> [<$name:camel Route>]<$($param),+> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData)
            }
        }}
        paste::paste! { impl<$($param),+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$($param),+>
        where
            $($param: $($bound +)+ 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<$($param),+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new($methods));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($param:ident: $($bound:ident)++),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<$($param),+>(core::marker::PhantomData<fn() -> ($($param,)+)>);}
        paste::paste! { impl<$($param),+> [<$name:camel Route>]<$($param),+> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData)
            }
        }}
        paste::paste! { impl<$($param),+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$($param),+>
        where
            $($param: $($bound +)+ 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<$($param),+>);
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

//----------------------------------------------   Auth  ----------------------------------------------------
route!(login => Post "/auth/login" impl B: UserManagement + TenantManagement);
/// Route handler for operator logins
///
/// Checks the username and password and issues a session token. The token is returned in the body and also set as
/// the `comanda_session` cookie, so that browsers (and the live feed's `EventSource`) pick it up automatically.
pub async fn login<B>(
    req: HttpRequest,
    body: web::Json<LoginRequest>,
    api: web::Data<AuthApi<B>>,
    sessions: web::Data<SessionIssuer>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: UserManagement + TenantManagement,
{
    let LoginRequest { username, password, tenant } = body.into_inner();
    let remote_ip = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown address".to_string());
    trace!("💻️ Login attempt for {username} from {remote_ip}");
    let user = api.login(&username, &password, tenant.as_deref()).await.map_err(|e| {
        info!("💻️ Login for {username} from {remote_ip} failed. {e}");
        e
    })?;
    let token = sessions.issue_token(SessionClaims::from(&user))?;
    let ttl = sessions.ttl();
    let cookie = Cookie::build(SESSION_COOKIE, token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(actix_web::cookie::time::Duration::seconds(ttl.num_seconds()))
        .finish();
    debug!("💻️ User {} ({username}) logged in from {remote_ip}", user.id);
    let response = LoginResponse { token, user, expires_at: Utc::now() + ttl };
    Ok(HttpResponse::Ok().cookie(cookie).json(response))
}

#[post("/auth/logout")]
pub async fn logout() -> impl Responder {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    HttpResponse::Ok().cookie(cookie).json(JsonResponse::success("Logged out"))
}

route!(me => Get "/me" where accepts ANY_CREDENTIAL);
/// Returns the principal the request's credentials resolve to. Handy for checking credentials.
pub async fn me(caller: Caller) -> HttpResponse {
    HttpResponse::Ok().json(caller.into_inner())
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl B: OrderManagement where accepts API_KEY_ONLY);
/// Order intake. The order is recorded for the API key's tenant, gets the next display id of the business day and
/// starts out `pending`.
pub async fn create_order<B: OrderManagement>(
    caller: Caller,
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let tenant_id = caller
        .principal()
        .tenant
        .clone()
        .ok_or_else(|| ServerError::InsufficientPermissions("Orders can only be created for a tenant".into()))?;
    debug!("💻️ POST new order for tenant {tenant_id}");
    let order = api.create_order(body.into_inner().into_new_order(tenant_id)).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(order_by_id => Get "/orders/{id}" impl B: OrderManagement where accepts ANY_CREDENTIAL);
pub async fn order_by_id<B: OrderManagement>(
    caller: Caller,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ GET order {id}");
    let order = api.fetch_order(&id, &caller.principal().scope()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_items => Patch "/orders/{id}/items" impl B: OrderManagement where accepts ANY_CREDENTIAL);
pub async fn update_items<B: OrderManagement>(
    caller: Caller,
    path: web::Path<OrderId>,
    body: web::Json<ItemsUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ PATCH items of order {id}");
    let order = api.update_items(&id, body.into_inner().items, &caller.principal().scope()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(request_print => Patch "/orders/{id}/request-print" impl B: OrderManagement where accepts ANY_CREDENTIAL);
pub async fn request_print<B: OrderManagement>(
    caller: Caller,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ PATCH request print of order {id}");
    let order = api.request_print(&id, &caller.principal().scope()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(clear_print_request => Patch "/orders/{id}/clear-print-request" impl B: OrderManagement where accepts ANY_CREDENTIAL);
pub async fn clear_print_request<B: OrderManagement>(
    caller: Caller,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ PATCH clear print request of order {id}");
    let order = api.clear_print_request(&id, &caller.principal().scope()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(mark_printed => Patch "/orders/{id}/mark-printed" impl B: OrderManagement where accepts ANY_CREDENTIAL);
/// Called by the store's printer once the ticket is out. Moves a `pending` order to `printed`.
pub async fn mark_printed<B: OrderManagement>(
    caller: Caller,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ PATCH mark order {id} as printed");
    let order = api.mark_printed(&id, &caller.principal().scope()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(reprint => Patch "/orders/{id}/reprint" impl B: OrderManagement where accepts ANY_CREDENTIAL);
pub async fn reprint<B: OrderManagement>(
    caller: Caller,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ PATCH reprint order {id}");
    let order = api.reprint(&id, &caller.principal().scope()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_status => Patch "/orders/{id}/status" impl B: OrderManagement where accepts API_KEY_ONLY);
/// Moves an order forward to the given status. Moving it to `out_for_delivery` queues the customer notification;
/// the response does not wait for it.
pub async fn update_status<B: OrderManagement>(
    caller: Caller,
    path: web::Path<OrderId>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let StatusUpdateRequest { status } = body.into_inner();
    debug!("💻️ PATCH status of order {id} to {status}");
    let order = api.update_status(&id, &status, &caller.principal().scope()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(mark_out_for_delivery => Patch "/orders/{id}/mark-out-for-delivery" impl B: OrderManagement where accepts API_KEY_ONLY);
pub async fn mark_out_for_delivery<B: OrderManagement>(
    caller: Caller,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ PATCH mark order {id} out for delivery");
    let result = api.mark_out_for_delivery(&id, &caller.principal().scope()).await?;
    Ok(HttpResponse::Ok().json(OutForDeliveryResponse::from(result)))
}

route!(notify_delivery => Post "/orders/{id}/notify-delivery" impl B: OrderManagement + TenantManagement + MessageUsageManagement, M: MessageSender where accepts API_KEY_ONLY);
/// Sends the "out for delivery" message to the customer right away. Every call sends (and counts) a message.
///
/// Responds with 429 and the plan usage when the tenant's message quota is used up, and with the provider's status
/// when the provider refuses the message.
pub async fn notify_delivery<B, M>(
    caller: Caller,
    path: web::Path<OrderId>,
    orders: web::Data<OrderFlowApi<B>>,
    notifier: web::Data<NotificationApi<B, M>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + TenantManagement + MessageUsageManagement,
    M: MessageSender,
{
    let id = path.into_inner();
    debug!("💻️ POST notify customer of order {id}");
    let order = orders.fetch_order(&id, &caller.principal().scope()).await?;
    let outcome = notifier.send_delivery_notification(&order).await;
    let response = NotifyResponse::from(&outcome);
    match outcome {
        NotificationOutcome::Sent { .. } => Ok(HttpResponse::Ok().json(response)),
        NotificationOutcome::QuotaExceeded(status) => Err(ServerError::QuotaExceeded(status)),
        NotificationOutcome::UpstreamRejected { status, message } => {
            Err(ServerError::UpstreamFailure { status, message })
        },
        NotificationOutcome::NotOutForDelivery { .. } | NotificationOutcome::MissingPhone => {
            Ok(HttpResponse::BadRequest().json(response))
        },
    }
}

//----------------------------------------------   Live feed  ----------------------------------------------------
route!(order_stream => Get "/orders/stream" impl B: OrderManagement + TenantManagement + UserManagement where accepts ANY_CREDENTIAL);
/// The live order feed, as server-sent events.
///
/// A snapshot of the tenant's current orders is pushed as soon as the client connects, and again on every tick of
/// the feed interval until the client goes away. A super-admin without a tenant watches the oldest active tenant.
pub async fn order_stream<B>(
    caller: Caller,
    feed: web::Data<LiveFeedApi<B>>,
    resolver: web::Data<TenantResolver<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + TenantManagement + UserManagement + 'static,
{
    let principal = resolver.with_fallback_tenant(caller.into_inner()).await?;
    let tenant_id = principal
        .tenant
        .ok_or_else(|| ServerError::NoRecordFound("There is no active tenant to show orders for".into()))?;
    info!("💻️ Live feed opened for tenant {tenant_id}");
    let frames = feed_frames(feed, tenant_id, options.feed_interval);
    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(frames))
}

/// The first frame is produced immediately; the rest follow one per `period`. The stream, and its timer, are dropped
/// when the client disconnects.
fn feed_frames<B>(
    feed: web::Data<LiveFeedApi<B>>,
    tenant_id: comanda_engine::db_types::TenantId,
    period: Duration,
) -> impl Stream<Item = Result<Bytes, ServerError>>
where
    B: OrderManagement + 'static,
{
    let mut ticks = interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    stream::unfold((feed, tenant_id, ticks, true), |(feed, tenant_id, mut ticks, first)| async move {
        ticks.tick().await;
        let event = feed.next_event(&tenant_id, Utc::now(), first).await;
        let frame = Bytes::from(event.to_sse_frame());
        Some((Ok(frame), (feed, tenant_id, ticks, false)))
    })
}

//----------------------------------------------   Message usage  ----------------------------------------------------
route!(message_usage => Get "/message-usage" impl B: TenantManagement + MessageUsageManagement where accepts ANY_CREDENTIAL);
/// The message quota usage of the caller's tenant for the current month. Super-admins get a list covering every
/// tenant.
pub async fn message_usage<B>(
    caller: Caller,
    api: web::Data<MessageQuotaApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: TenantManagement + MessageUsageManagement,
{
    match &caller.principal().tenant {
        Some(tenant_id) => {
            trace!("💻️ GET message usage of {tenant_id}");
            let status = api.check_limit(tenant_id).await?;
            Ok(HttpResponse::Ok().json(status))
        },
        None => {
            trace!("💻️ GET message usage of all tenants");
            let all = api.usage_for_all_tenants().await?;
            Ok(HttpResponse::Ok().json(all))
        },
    }
}
