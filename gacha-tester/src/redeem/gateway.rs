//! Client side of the redemption endpoint.
use async_trait::async_trait;
use gacha_engine::{RedemptionAck, RedemptionClaim, RedemptionError};
use hyper::client::HttpConnector;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Method, Request, Uri};

/// Anything that can deliver a claim and report the endpoint's answer.
#[async_trait]
pub trait RedemptionGateway {
    /// Submit one claim. Never retries.
    ///
    /// # Errors
    ///
    /// Returns [`RedemptionError::Rejected`] for a non-2xx status and
    /// [`RedemptionError::Transport`] for any connection or body failure.
    async fn redeem(&self, claim: &RedemptionClaim) -> Result<RedemptionAck, RedemptionError>;
}

/// Posts claims as JSON over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpRedemptionGateway {
    client: Client<HttpConnector>,
    endpoint: Uri,
}

impl HttpRedemptionGateway {
    /// # Errors
    ///
    /// Returns [`RedemptionError::Transport`] when `endpoint` is not a valid URI.
    pub fn new(endpoint: &str) -> Result<Self, RedemptionError> {
        let endpoint = endpoint.parse::<Uri>().map_err(|err| {
            RedemptionError::Transport(format!("invalid endpoint {endpoint}: {err}"))
        })?;
        Ok(Self {
            client: Client::new(),
            endpoint,
        })
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Uri {
        &self.endpoint
    }
}

fn transport(err: impl std::fmt::Display) -> RedemptionError {
    RedemptionError::Transport(err.to_string())
}

#[async_trait]
impl RedemptionGateway for HttpRedemptionGateway {
    async fn redeem(&self, claim: &RedemptionClaim) -> Result<RedemptionAck, RedemptionError> {
        let body = serde_json::to_vec(claim).map_err(transport)?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .map_err(transport)?;

        log::debug!("POST {} ({} total)", self.endpoint, claim.total_money);
        let response = self.client.request(request).await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(RedemptionError::Rejected {
                status: status.as_u16(),
            });
        }
        let bytes = hyper::body::to_bytes(response.into_body())
            .await
            .map_err(transport)?;
        serde_json::from_slice(&bytes)
            .map_err(|err| RedemptionError::Transport(format!("malformed acknowledgment: {err}")))
    }
}
