//! HTTP surface of the dashboard service

use crate::error::{DashboardError, Result};
use crate::providers::RequestContext;
use crate::service::{DashboardQuery, DashboardService};
use dashboard_config::ServerSettings;
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

/// Header carrying the caller's entitlement tier, set by the auth layer
pub const TIER_HEADER: &str = "x-dashboard-tier";

/// Cookie holding the caller's preferred display currency
pub const CURRENCY_COOKIE: &str = "currency";

/// Main dashboard server
pub struct DashboardServer {
    settings: ServerSettings,
    service: Arc<DashboardService>,
}

impl DashboardServer {
    pub fn new(settings: ServerSettings, service: Arc<DashboardService>) -> Self {
        Self { settings, service }
    }

    /// Serve until the task is dropped
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.settings.bind_address, self.settings.port)
            .parse()
            .map_err(|e| DashboardError::Configuration {
                message: format!("Invalid bind address: {}", e),
            })?;

        info!("Starting dashboard HTTP server on {}", addr);

        let routes = routes(self.service.clone());
        if self.settings.enable_cors {
            let cors = warp::cors().allow_any_origin().allow_methods(vec!["GET"]);
            warp::serve(routes.with(cors)).run(addr).await;
        } else {
            warp::serve(routes).run(addr).await;
        }

        Ok(())
    }
}

/// All routes with rejection handling and request tracing applied
pub fn routes(
    service: Arc<DashboardService>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health_route = warp::path("health")
        .and(warp::path::end())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    let status_route = warp::path("status").and(warp::path::end()).map(|| {
        warp::reply::json(&serde_json::json!({
            "status": "running",
            "service": "validator-dashboard",
            "version": env!("CARGO_PKG_VERSION")
        }))
    });

    let data = warp::get().and(warp::path("dashboard")).and(warp::path("data"));

    let balance = data
        .clone()
        .and(warp::path("balance"))
        .and(warp::path::end())
        .and(with_request(service.clone()))
        .and_then(handlers::balance);

    let proposals = data
        .clone()
        .and(warp::path("proposals"))
        .and(warp::path::end())
        .and(with_request(service.clone()))
        .and_then(handlers::proposals);

    let validators = data
        .clone()
        .and(warp::path("validators"))
        .and(warp::path::end())
        .and(with_request(service.clone()))
        .and_then(handlers::validators);

    let earnings = data
        .clone()
        .and(warp::path("earnings"))
        .and(warp::path::end())
        .and(with_request(service.clone()))
        .and_then(handlers::earnings);

    let effectiveness = data
        .clone()
        .and(warp::path("effectiveness"))
        .and(warp::path::end())
        .and(with_request(service.clone()))
        .and_then(handlers::effectiveness);

    let proposals_history = data
        .clone()
        .and(warp::path("proposalshistory"))
        .and(warp::path::end())
        .and(with_request(service.clone()))
        .and_then(handlers::proposals_history);

    let summary = data
        .clone()
        .and(warp::path("summary"))
        .and(warp::path::end())
        .and(with_request(service.clone()))
        .and_then(handlers::summary);

    let limit = data
        .and(warp::path("limit"))
        .and(warp::path::end())
        .and(with_request(service.clone()))
        .and_then(handlers::limit);

    let graffitiwall = warp::get()
        .and(warp::path("graffitiwall"))
        .and(warp::path("data"))
        .and(warp::path::end())
        .and(with_request(service))
        .and_then(handlers::graffitiwall);

    health_route
        .or(status_route)
        .or(balance)
        .or(proposals)
        .or(validators)
        .or(earnings)
        .or(effectiveness)
        .or(proposals_history)
        .or(summary)
        .or(limit)
        .or(graffitiwall)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

/// Service handle, request context and query for a data route.
/// The `currency` query parameter wins over the currency cookie.
fn with_request(
    service: Arc<DashboardService>,
) -> impl Filter<Extract = (Arc<DashboardService>, RequestContext, DashboardQuery), Error = Rejection>
       + Clone {
    warp::any()
        .map(move || service.clone())
        .and(warp::header::optional::<String>(TIER_HEADER))
        .and(warp::cookie::optional(CURRENCY_COOKIE))
        .and(warp::query::<DashboardQuery>())
        .map(
            |service: Arc<DashboardService>,
             tier: Option<String>,
             cookie: Option<String>,
             mut query: DashboardQuery| {
                query.currency = query.currency.or(cookie);
                (service, RequestContext::new(tier), query)
            },
        )
        .untuple_one()
}

/// Log, count and convert a handler result
fn respond<T: Serialize>(
    route: &'static str,
    ctx: &RequestContext,
    result: Result<T>,
) -> std::result::Result<warp::reply::Json, Rejection> {
    metrics::counter!("dashboard_requests_total", "route" => route).increment(1);

    match result {
        Ok(payload) => Ok(warp::reply::json(&payload)),
        Err(err) => {
            metrics::counter!("dashboard_errors_total", "route" => route, "kind" => err.kind())
                .increment(1);
            if err.is_client_error() {
                debug!(route, request_id = %ctx.request_id, error = %err, "rejected dashboard request");
            } else {
                error!(route, request_id = %ctx.request_id, error = %err, "dashboard request failed");
            }
            Err(warp::reject::custom(err))
        }
    }
}

mod handlers {
    use super::respond;
    use crate::providers::RequestContext;
    use crate::service::{DashboardQuery, DashboardService};
    use std::sync::Arc;
    use warp::Rejection;

    type Response = std::result::Result<warp::reply::Json, Rejection>;

    pub async fn balance(
        service: Arc<DashboardService>,
        ctx: RequestContext,
        query: DashboardQuery,
    ) -> Response {
        let result = service.income_history(&ctx, &query).await;
        respond("balance", &ctx, result)
    }

    pub async fn proposals(
        service: Arc<DashboardService>,
        ctx: RequestContext,
        query: DashboardQuery,
    ) -> Response {
        let result = service.proposals(&ctx, &query).await;
        respond("proposals", &ctx, result)
    }

    pub async fn validators(
        service: Arc<DashboardService>,
        ctx: RequestContext,
        query: DashboardQuery,
    ) -> Response {
        let result = service.validators_table(&ctx, &query).await;
        respond("validators", &ctx, result)
    }

    pub async fn earnings(
        service: Arc<DashboardService>,
        ctx: RequestContext,
        query: DashboardQuery,
    ) -> Response {
        let result = service.earnings(&ctx, &query).await;
        respond("earnings", &ctx, result)
    }

    pub async fn effectiveness(
        service: Arc<DashboardService>,
        ctx: RequestContext,
        query: DashboardQuery,
    ) -> Response {
        let result = service.effectiveness(&ctx, &query).await;
        respond("effectiveness", &ctx, result)
    }

    pub async fn proposals_history(
        service: Arc<DashboardService>,
        ctx: RequestContext,
        query: DashboardQuery,
    ) -> Response {
        let result = service.proposal_history(&ctx, &query).await;
        respond("proposalshistory", &ctx, result)
    }

    pub async fn summary(
        service: Arc<DashboardService>,
        ctx: RequestContext,
        query: DashboardQuery,
    ) -> Response {
        let result = service.summary(&ctx, &query).await;
        respond("summary", &ctx, result)
    }

    pub async fn limit(
        service: Arc<DashboardService>,
        ctx: RequestContext,
        _query: DashboardQuery,
    ) -> Response {
        let payload = serde_json::json!({ "validatorLimit": service.validator_limit(&ctx) });
        respond("limit", &ctx, Ok(payload))
    }

    pub async fn graffitiwall(
        service: Arc<DashboardService>,
        ctx: RequestContext,
        _query: DashboardQuery,
    ) -> Response {
        let result = service.graffitiwall().await;
        respond("graffitiwall", &ctx, result)
    }
}

/// Map rejections to status codes with opaque bodies
pub async fn handle_rejection(err: Rejection) -> std::result::Result<impl Reply, Infallible> {
    let (status, message) = if let Some(e) = err.find::<DashboardError>() {
        (e.status(), e.public_message())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        warn!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    Ok(warp::reply::with_status(message, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ConfiguredTiers, SharedLatestEpoch, StaticPrices};
    use crate::service::Collaborators;
    use crate::store::MemoryStore;
    use std::collections::HashMap;
    use std::time::Duration;
    use types::{ChainClock, Currency};

    fn service() -> Arc<DashboardService> {
        let store = Arc::new(MemoryStore::new());
        Arc::new(DashboardService::new(
            Collaborators {
                relational: store.clone(),
                metrics: store,
                prices: Arc::new(StaticPrices::new([("ETH", 1.0)])),
                tiers: Arc::new(ConfiguredTiers::new(100, HashMap::new())),
                latest_epoch: Arc::new(SharedLatestEpoch::new(1)),
            },
            ChainClock::mainnet(),
            Currency::native(),
            Duration::from_secs(1),
        ))
    }

    #[tokio::test]
    async fn test_health_route() {
        let res = warp::test::request()
            .path("/health")
            .reply(&routes(service()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body(), "OK");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let res = warp::test::request()
            .path("/dashboard/data/nope")
            .reply(&routes(service()))
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_bind_address() {
        let settings = ServerSettings {
            bind_address: "not an address".to_string(),
            port: 1,
            enable_cors: false,
        };
        let server = DashboardServer::new(settings, service());
        assert!(matches!(
            server.start().await,
            Err(DashboardError::Configuration { .. })
        ));
    }
}
