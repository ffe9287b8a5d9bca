use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use bellatrix_core::{Scope, ServiceError, Subscription, SubscriptionService};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, LOCATION};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use url::Url;

/// Orion caps `limit` at 1000.
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const FIWARE_SERVICE: &str = "Fiware-Service";
const FIWARE_SERVICE_PATH: &str = "Fiware-ServicePath";
const FIWARE_TOTAL_COUNT: &str = "Fiware-Total-Count";

#[derive(Debug, Clone)]
pub struct NgsiClientOptions {
    pub timeout: Duration,
    /// Subscriptions requested per list call.
    pub page_size: usize,
}

impl Default for NgsiClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Error body returned by the broker on non-success responses.
#[derive(Debug, Deserialize)]
struct BrokerError {
    error: String,
    #[serde(default)]
    description: Option<String>,
}

/// HTTP client for the NGSIv2 subscriptions API.
#[derive(Debug, Clone)]
pub struct NgsiClient {
    http: reqwest::Client,
    base_url: String,
    page_size: usize,
}

impl NgsiClient {
    /// Client for the broker at `base_url` sending `headers` on every call.
    pub fn new(base_url: &str, headers: &BTreeMap<String, String>) -> Result<Self, ServiceError> {
        Self::with_options(base_url, headers, NgsiClientOptions::default())
    }

    pub fn with_options(
        base_url: &str,
        headers: &BTreeMap<String, String>,
        options: NgsiClientOptions,
    ) -> Result<Self, ServiceError> {
        let parsed = Url::parse(base_url).map_err(|e| ServiceError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ServiceError::InvalidUrl {
                url: base_url.to_string(),
                reason: "not a base url".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .default_headers(header_map(headers)?)
            .timeout(options.timeout)
            .build()
            .map_err(|e| ServiceError::transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            page_size: options.page_size.max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn subscriptions_url(&self) -> String {
        format!("{}/v2/subscriptions", self.base_url)
    }

    fn request(&self, method: Method, url: &str, scope: &Scope) -> RequestBuilder {
        let mut req = self.http.request(method, url);
        if let Some(tenant) = scope.tenant_header() {
            req = req.header(FIWARE_SERVICE, tenant);
        }
        if let Some(path) = scope.path_header() {
            req = req.header(FIWARE_SERVICE_PATH, path);
        }
        req.header("Accept", "application/json")
    }

    async fn list_page(
        &self,
        scope: &Scope,
        offset: usize,
    ) -> Result<(Vec<Subscription>, Option<usize>), ServiceError> {
        let resp = self
            .request(Method::GET, &self.subscriptions_url(), scope)
            .query(&[
                ("limit", self.page_size.to_string()),
                ("offset", offset.to_string()),
                ("options", "count".to_string()),
            ])
            .send()
            .await
            .map_err(transport)?;
        let resp = check_status(resp).await?;

        let total = resp
            .headers()
            .get(FIWARE_TOTAL_COUNT)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<usize>().ok());

        let body = resp.text().await.map_err(transport)?;
        if body.trim().is_empty() {
            return Ok((Vec::new(), total));
        }
        let page = serde_json::from_str(&body).map_err(|e| ServiceError::Decode(e.to_string()))?;
        Ok((page, total))
    }
}

#[async_trait]
impl SubscriptionService for NgsiClient {
    async fn list(&self, scope: &Scope) -> Result<Vec<Subscription>, ServiceError> {
        let mut subscriptions: Vec<Subscription> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        loop {
            let (page, total) = self.list_page(scope, subscriptions.len()).await?;
            let fetched = page.len();

            // A page without any unseen id means offset is being ignored.
            let fresh: Vec<Subscription> = page
                .into_iter()
                .filter(|sub| sub.id.as_ref().is_none_or(|id| seen.insert(id.clone())))
                .collect();
            if fetched > 0 && fresh.is_empty() {
                tracing::warn!(
                    %scope,
                    offset = subscriptions.len(),
                    "Broker returned an already listed page, stopping pagination"
                );
                break;
            }
            let added = fresh.len();
            subscriptions.extend(fresh);

            let exhausted = fetched < self.page_size
                || added < fetched
                || total.is_some_and(|total| subscriptions.len() >= total);
            if exhausted {
                break;
            }
        }

        tracing::debug!(
            %scope,
            count = subscriptions.len(),
            "Listed subscriptions from broker"
        );
        Ok(subscriptions)
    }

    async fn create(
        &self,
        subscription: &Subscription,
        scope: &Scope,
    ) -> Result<String, ServiceError> {
        let resp = self
            .request(Method::POST, &self.subscriptions_url(), scope)
            .json(subscription)
            .send()
            .await
            .map_err(transport)?;
        let resp = check_status(resp).await?;

        let id = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|location| location.trim_end_matches('/').rsplit('/').next())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or(ServiceError::MissingId)?;

        tracing::debug!(%scope, subscription_id = %id, "Created subscription on broker");
        Ok(id)
    }

    async fn delete(&self, id: &str, scope: &Scope) -> Result<(), ServiceError> {
        let url = format!("{}/{id}", self.subscriptions_url());
        let resp = self
            .request(Method::DELETE, &url, scope)
            .send()
            .await
            .map_err(transport)?;
        check_status(resp).await?;

        tracing::debug!(%scope, subscription_id = %id, "Deleted subscription on broker");
        Ok(())
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ServiceError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let invalid = |reason: String| ServiceError::InvalidHeader {
            name: name.clone(),
            reason,
        };
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

fn transport(e: reqwest::Error) -> ServiceError {
    ServiceError::transport(e.to_string())
}

async fn check_status(resp: Response) -> Result<Response, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<BrokerError>(&body) {
        Ok(BrokerError {
            error,
            description: Some(description),
        }) => format!("{error}: {description}"),
        Ok(BrokerError { error, .. }) => error,
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
        Err(_) => body,
    };

    Err(ServiceError::status(status.as_u16(), message))
}
