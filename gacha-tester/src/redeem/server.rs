//! Minimal redemption endpoint: `POST /redeem` logs the claim and acknowledges it.
use anyhow::{Context, Result};
use gacha_engine::RedemptionClaim;
use hyper::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, HeaderValue,
};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use serde_json::json;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const REDEEM_PATH: &str = "/redeem";

/// Every claim accepted since the server started.
pub type Ledger = Arc<Mutex<Vec<RedemptionClaim>>>;

fn json_response(status: StatusCode, body: &serde_json::Value) -> Response<Body> {
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

fn preflight() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type"),
    );
    response
}

async fn handle(request: Request<Body>, ledger: Ledger) -> Result<Response<Body>, Infallible> {
    match (request.method(), request.uri().path()) {
        (&Method::POST, REDEEM_PATH) => {}
        (&Method::OPTIONS, REDEEM_PATH) => return Ok(preflight()),
        (_, REDEEM_PATH) => {
            return Ok(json_response(
                StatusCode::METHOD_NOT_ALLOWED,
                &json!({ "status": "method_not_allowed" }),
            ));
        }
        _ => {
            return Ok(json_response(
                StatusCode::NOT_FOUND,
                &json!({ "status": "not_found" }),
            ));
        }
    }

    let bytes = match hyper::body::to_bytes(request.into_body()).await {
        Ok(bytes) => bytes,
        Err(err) => {
            log::warn!("failed to read redemption body: {err}");
            return Ok(json_response(StatusCode::BAD_REQUEST, &json!({ "status": "error" })));
        }
    };
    let claim: RedemptionClaim = match serde_json::from_slice(&bytes) {
        Ok(claim) => claim,
        Err(err) => {
            log::warn!("malformed redemption claim: {err}");
            return Ok(json_response(
                StatusCode::BAD_REQUEST,
                &json!({ "status": "error", "message": err.to_string() }),
            ));
        }
    };

    log::info!(
        "redeem request: phone {} total {}",
        claim.wallet_phone,
        claim.total_money
    );
    ledger
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(claim);
    Ok(json_response(StatusCode::OK, &json!({ "status": "ok" })))
}

fn bind(
    addr: SocketAddr,
    ledger: Ledger,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(SocketAddr, impl Future<Output = Result<(), hyper::Error>>)> {
    let make_service = make_service_fn(move |_conn| {
        let ledger = Arc::clone(&ledger);
        async move {
            Ok::<_, Infallible>(service_fn(move |request| {
                handle(request, Arc::clone(&ledger))
            }))
        }
    });
    let server = Server::try_bind(&addr)
        .with_context(|| format!("failed to bind redemption endpoint on {addr}"))?
        .serve(make_service);
    let local_addr = server.local_addr();
    Ok((local_addr, server.with_graceful_shutdown(shutdown)))
}

/// Serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(addr: SocketAddr) -> Result<()> {
    let (local_addr, server) = bind(addr, Ledger::default(), async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::warn!("ctrl-c handler failed: {err}");
        }
    })?;
    println!("💸 Redemption endpoint listening on http://{local_addr}{REDEEM_PATH}");
    server.await.context("redemption endpoint failed")?;
    log::info!("redemption endpoint stopped");
    Ok(())
}

/// Background endpoint bound to a local address, used by scenarios and tests.
pub struct RedemptionServer {
    local_addr: SocketAddr,
    ledger: Ledger,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Result<(), hyper::Error>>,
}

impl RedemptionServer {
    /// Bind `addr` (port 0 picks a free port) and serve on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub fn spawn(addr: SocketAddr) -> Result<Self> {
        let ledger = Ledger::default();
        let (shutdown, signal) = oneshot::channel::<()>();
        let (local_addr, server) = bind(addr, Arc::clone(&ledger), async move {
            let _ = signal.await;
        })?;
        let task = tokio::spawn(server);
        log::debug!("redemption endpoint spawned on {local_addr}");
        Ok(Self {
            local_addr,
            ledger,
            shutdown,
            task,
        })
    }

    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub fn redeem_url(&self) -> String {
        format!("http://{}{REDEEM_PATH}", self.local_addr())
    }

    #[must_use]
    pub fn claims(&self) -> Vec<RedemptionClaim> {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stop accepting connections and wait for the server task.
    ///
    /// # Errors
    ///
    /// Returns an error if the server task failed or panicked.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.task
            .await
            .context("redemption endpoint task panicked")?
            .context("redemption endpoint failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::Client;

    async fn post(server: &RedemptionServer, path: &str, body: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("http://{}{path}", server.local_addr()))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = Client::new().request(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn accepts_and_records_claims() {
        let server = RedemptionServer::spawn(([127, 0, 0, 1], 0).into()).unwrap();
        let (status, body) = post(
            &server,
            REDEEM_PATH,
            r#"{"walletPhone":"0812345678","totalMoney":142}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
        assert_eq!(server.claims().len(), 1);
        assert_eq!(server.claims()[0].total_money, 142);
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let server = RedemptionServer::spawn(([127, 0, 0, 1], 0).into()).unwrap();
        let (status, _) = post(&server, REDEEM_PATH, r#"{"walletPhone":5}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(server.claims().is_empty());
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let server = RedemptionServer::spawn(([127, 0, 0, 1], 0).into()).unwrap();
        let (status, _) = post(&server, "/elsewhere", "{}").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        server.shutdown().await.unwrap();
    }

    #[test]
    fn preflight_allows_cross_origin_posts() {
        let response = preflight();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
