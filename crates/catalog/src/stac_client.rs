//! Async STAC Item Search client.
//!
//! Talks to Microsoft Planetary Computer by default (it hosts both
//! `landsat-c2-l2` and `sentinel-2-l2a`), or any STAC API endpoint via
//! [`StacCatalog::Custom`]. Transient failures get a bounded retry with
//! exponential backoff; 4xx responses are terminal.

use std::time::Duration;

use crate::error::{CatalogError, Result};
use crate::stac_models::{StacItem, StacItemCollection, StacLink, StacSearchParams};

const PC_SEARCH_URL: &str = "https://planetarycomputer.microsoft.com/api/stac/v1/search";
const PC_SIGN_URL: &str = "https://planetarycomputer.microsoft.com/api/sas/v1/sign";

/// Which STAC API to search.
#[derive(Debug, Clone)]
pub enum StacCatalog {
    /// Microsoft Planetary Computer STAC API.
    PlanetaryComputer,
    /// Any STAC API endpoint (root URL).
    Custom(String),
}

impl StacCatalog {
    /// The POST `/search` URL for this catalog.
    pub fn search_url(&self) -> String {
        match self {
            Self::PlanetaryComputer => PC_SEARCH_URL.to_string(),
            Self::Custom(base) => {
                let base = base.trim_end_matches('/');
                if base.ends_with("/search") {
                    base.to_string()
                } else {
                    format!("{base}/search")
                }
            }
        }
    }

    /// Whether asset hrefs need SAS token signing before they can be read.
    pub fn needs_signing(&self) -> bool {
        matches!(self, Self::PlanetaryComputer)
    }
}

/// Tunables for [`StacClient`].
#[derive(Debug, Clone)]
pub struct StacClientOptions {
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Retries on transient failures beyond the first attempt.
    pub max_retries: u32,
    /// Cap on total items collected across pages. A 25-year search over
    /// two collections returns hundreds of scenes per parcel.
    pub max_items: usize,
}

impl Default for StacClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            max_items: 1000,
        }
    }
}

/// Async client for STAC Item Search.
pub struct StacClient {
    catalog: StacCatalog,
    client: reqwest::Client,
    options: StacClientOptions,
}

impl StacClient {
    pub fn new(catalog: StacCatalog, options: StacClientOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()?;

        Ok(Self {
            catalog,
            client,
            options,
        })
    }

    pub fn catalog(&self) -> &StacCatalog {
        &self.catalog
    }

    /// One page of search results.
    pub async fn search(&self, params: &StacSearchParams) -> Result<StacItemCollection> {
        self.post_search(&self.catalog.search_url(), params).await
    }

    /// Search with automatic pagination, up to `max_items` items.
    pub async fn search_all(&self, params: &StacSearchParams) -> Result<Vec<StacItem>> {
        let cap = self.options.max_items;
        let mut items: Vec<StacItem> = Vec::new();
        let mut page = self.search(params).await?;

        loop {
            let next = page.next_link().cloned();
            items.append(&mut page.features);
            if items.len() >= cap {
                break;
            }

            page = match next {
                Some(link) => self.follow_next(&link, params).await?,
                None => break,
            };
            if page.is_empty() {
                break;
            }
        }

        items.truncate(cap);
        Ok(items)
    }

    /// Sign an asset href when the catalog requires it; a no-op otherwise.
    pub async fn sign_asset_href(&self, href: &str) -> Result<String> {
        if self.catalog.needs_signing() {
            self.sign_pc_href(href).await
        } else {
            Ok(href.to_string())
        }
    }

    async fn post_search(
        &self,
        url: &str,
        params: &StacSearchParams,
    ) -> Result<StacItemCollection> {
        let mut last_err = None;

        for attempt in 0..=self.options.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff_delay(attempt)).await;
            }

            let sent = self
                .client
                .post(url)
                .header("Content-Type", "application/json")
                .json(params)
                .send()
                .await;

            match sent {
                Ok(resp) if resp.status().is_success() => {
                    return parse_collection(resp).await;
                }
                Ok(resp) => {
                    let terminal = resp.status().is_client_error();
                    last_err = Some(http_error("STAC search", resp).await);
                    if terminal {
                        break;
                    }
                }
                Err(e) => {
                    last_err = Some(CatalogError::Http(e));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| CatalogError::Network("STAC search failed".into())))
    }

    /// Follow a pagination link, honoring POST body/merge semantics.
    async fn follow_next(
        &self,
        link: &StacLink,
        original: &StacSearchParams,
    ) -> Result<StacItemCollection> {
        let method = link.method.as_deref().unwrap_or("GET");

        if method.eq_ignore_ascii_case("POST") {
            let params = next_page_params(link, original)?;
            return self.post_search(&link.href, &params).await;
        }

        let resp = self.client.get(&link.href).send().await?;

        if !resp.status().is_success() {
            return Err(http_error("STAC pagination", resp).await);
        }
        parse_collection(resp).await
    }

    /// Exchange an href for a SAS-signed one via the Planetary Computer
    /// sign endpoint.
    async fn sign_pc_href(&self, href: &str) -> Result<String> {
        let url = format!("{PC_SIGN_URL}?href={href}");

        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CatalogError::Auth(format!(
                "PC sign returned HTTP {status}: {}",
                truncated(&body, 300)
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| CatalogError::Auth(format!("parsing PC sign response: {e}")))?;

        body["href"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CatalogError::Auth("PC sign response missing 'href' field".into()))
    }
}

/// 500ms, 1s, 2s, ...
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(500 * (1 << (attempt - 1)))
}

/// Request body for a POST `next` link: the original params overlaid with
/// the link body when `merge` is set, the link body alone otherwise.
fn next_page_params(link: &StacLink, original: &StacSearchParams) -> Result<StacSearchParams> {
    let serialize =
        |p: &StacSearchParams| serde_json::to_value(p).map_err(|e| CatalogError::Network(format!("serializing params: {e}")));

    let body = match (&link.body, link.merge.unwrap_or(false)) {
        (Some(link_body), true) => {
            let mut base = serialize(original)?;
            if let (Some(base_obj), Some(link_obj)) = (base.as_object_mut(), link_body.as_object())
            {
                for (k, v) in link_obj {
                    base_obj.insert(k.clone(), v.clone());
                }
            }
            base
        }
        (Some(link_body), false) => link_body.clone(),
        (None, _) => serialize(original)?,
    };

    serde_json::from_value(body)
        .map_err(|e| CatalogError::Network(format!("parsing merged params: {e}")))
}

async fn parse_collection(resp: reqwest::Response) -> Result<StacItemCollection> {
    let body = resp.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| CatalogError::Network(format!("parsing STAC response: {e}")))
}

async fn http_error(context: &str, resp: reqwest::Response) -> CatalogError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    CatalogError::Network(format!(
        "{context} returned HTTP {status}: {}",
        truncated(&body, 500)
    ))
}

fn truncated(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_endpoint_gets_search_suffix() {
        assert_eq!(StacCatalog::PlanetaryComputer.search_url(), PC_SEARCH_URL);

        for base in [
            "https://stac.example.org/v1",
            "https://stac.example.org/v1/",
            "https://stac.example.org/v1/search",
        ] {
            assert_eq!(
                StacCatalog::Custom(base.into()).search_url(),
                "https://stac.example.org/v1/search"
            );
        }
    }

    #[test]
    fn transport_failures_surface_as_http() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let client = StacClient::new(
            StacCatalog::Custom("not a url".into()),
            StacClientOptions {
                max_retries: 0,
                ..Default::default()
            },
        )
        .unwrap();

        let err = rt
            .block_on(client.search(&StacSearchParams::new()))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Http(_)), "got {err:?}");
    }

    #[test]
    fn only_planetary_computer_signs() {
        assert!(StacCatalog::PlanetaryComputer.needs_signing());
        assert!(!StacCatalog::Custom("https://stac.example.org".into()).needs_signing());
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff_delay(1), Duration::from_millis(500));
        assert_eq!(backoff_delay(2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(3), Duration::from_millis(2000));
    }

    #[test]
    fn merge_link_overlays_token() {
        let link = StacLink {
            rel: "next".into(),
            href: "https://example.com/search".into(),
            method: Some("POST".into()),
            body: Some(serde_json::json!({"token": "next:abc"})),
            merge: Some(true),
        };
        let original = StacSearchParams::new().datetime("1999-05-01/2024-12-31").limit(100);

        let merged = next_page_params(&link, &original).unwrap();
        assert_eq!(merged.token.as_deref(), Some("next:abc"));
        assert_eq!(merged.datetime.as_deref(), Some("1999-05-01/2024-12-31"));
        assert_eq!(merged.limit, Some(100));
    }

    #[test]
    fn non_merge_link_replaces_body() {
        let link = StacLink {
            rel: "next".into(),
            href: "https://example.com/search".into(),
            method: Some("POST".into()),
            body: Some(serde_json::json!({"token": "next:xyz"})),
            merge: None,
        };
        let original = StacSearchParams::new().limit(100);

        let merged = next_page_params(&link, &original).unwrap();
        assert_eq!(merged.token.as_deref(), Some("next:xyz"));
        assert!(merged.limit.is_none());
    }
}
