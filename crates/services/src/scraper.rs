//! Best-effort product page scraping and mock price research.
//!
//! This is an external collaborator with no correctness guarantees: the
//! page is fetched through a public CORS-style proxy, metadata extraction
//! is regex-based, and prices are simulated. Callers get a `ProductInfo`
//! shape or a classified failure, nothing stronger.

use anyhow::{anyhow, Result};
use rand::Rng;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const DEFAULT_PROXY_BASE: &str = "https://api.allorigins.win";
const TITLE_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 500;

/// What the scraper could recover from a product page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInfo {
    pub title: String,
    pub description: String,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// Simulated market price for a product name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceEstimate {
    pub average_price: f64,
    pub price_range: PriceRange,
    pub sources: Vec<String>,
}

/// Proxy response envelope: `{"contents": "<html>..."}`.
#[derive(Debug, Deserialize)]
struct ProxyResponse {
    contents: String,
}

pub struct ProductScraper {
    http: Client,
    proxy_base: String,
}

impl ProductScraper {
    pub fn new() -> Result<Self> {
        Ok(Self::with_proxy_base(DEFAULT_PROXY_BASE)?)
    }

    /// Point the scraper at a different proxy (mock server in tests).
    pub fn with_proxy_base(proxy_base: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("Mozilla/5.0 (compatible; PromoStudio/1.0)")
            .build()?;
        Ok(Self {
            http,
            proxy_base: proxy_base.into(),
        })
    }

    /// Fetch a product page and extract title, description and image.
    /// Price research piggybacks on the extracted title; its failure is
    /// non-fatal.
    pub async fn scrape(&self, url: &str) -> Result<ProductInfo> {
        let proxy_url = format!(
            "{}/get?url={}",
            self.proxy_base,
            url::form_urlencoded::byte_serialize(url.as_bytes()).collect::<String>()
        );

        debug!(%url, "scraping product page");
        let response = self.http.get(&proxy_url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "Não foi possível extrair informações da URL. Verifique se o link está correto."
            ));
        }
        let body: ProxyResponse = response.json().await?;
        let html = body.contents;

        let mut title = extract_title(&html)
            .or_else(|| extract_first_h1(&html))
            .unwrap_or_default();
        let mut description = extract_meta_description(&html)
            .or_else(|| extract_og_meta(&html, "og:description"))
            .unwrap_or_default();
        let mut image_url = extract_og_meta(&html, "og:image")
            .or_else(|| extract_first_img(&html))
            .unwrap_or_default();

        title = truncate(title.trim(), TITLE_MAX);
        description = truncate(description.trim(), DESCRIPTION_MAX);

        if !image_url.is_empty() && !image_url.starts_with("http") {
            image_url = resolve_relative(url, &image_url).unwrap_or(image_url);
        }

        let (suggested_price, price_range) = if title.is_empty() {
            (None, None)
        } else {
            let estimate = self.research_price(&title);
            (Some(estimate.average_price), Some(estimate.price_range))
        };

        if title.is_empty() {
            warn!(%url, "no title found on product page");
        }

        Ok(ProductInfo {
            title: if title.is_empty() {
                "Produto encontrado".to_string()
            } else {
                title
            },
            description: if description.is_empty() {
                "Descrição não disponível".to_string()
            } else {
                description
            },
            image_url,
            suggested_price,
            price_range,
        })
    }

    /// Mock price discovery across three stores. Deliberately random; only
    /// the shape is stable.
    pub fn research_price(&self, _product_name: &str) -> PriceEstimate {
        let mut rng = rand::thread_rng();
        let prices = [
            rng.gen_range(50.0..250.0_f64),
            rng.gen_range(40.0..220.0_f64),
            rng.gen_range(30.0..180.0_f64),
        ];
        let average = (prices.iter().sum::<f64>() / prices.len() as f64).floor();
        let min = prices.iter().cloned().fold(f64::INFINITY, f64::min).floor();
        let max = prices.iter().cloned().fold(0.0_f64, f64::max).floor();

        PriceEstimate {
            average_price: average,
            price_range: PriceRange { min, max },
            sources: vec![
                "Amazon Brasil".to_string(),
                "Mercado Livre".to_string(),
                "Shopee Brasil".to_string(),
            ],
        }
    }
}

// ── Extraction helpers ───────────────────────────────────────────────

fn extract_title(html: &str) -> Option<String> {
    let re = Regex::new(r"(?i)<title[^>]*>([^<]+)</title>").ok()?;
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn extract_first_h1(html: &str) -> Option<String> {
    let re = Regex::new(r"(?i)<h1[^>]*>([^<]+)</h1>").ok()?;
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn extract_meta_description(html: &str) -> Option<String> {
    let re = Regex::new(r#"(?i)<meta[^>]*name=["']description["'][^>]*content=["']([^"']+)["']"#)
        .ok()?;
    if let Some(caps) = re.captures(html) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    // Alternate attribute order (content before name).
    let re_alt =
        Regex::new(r#"(?i)<meta[^>]*content=["']([^"']+)["'][^>]*name=["']description["']"#)
            .ok()?;
    re_alt
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn extract_og_meta(html: &str, property: &str) -> Option<String> {
    let pattern = format!(
        r#"(?i)<meta[^>]*property=["']{}["'][^>]*content=["']([^"']+)["']"#,
        regex::escape(property)
    );
    let re = Regex::new(&pattern).ok()?;
    if let Some(caps) = re.captures(html) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    let pattern_alt = format!(
        r#"(?i)<meta[^>]*content=["']([^"']+)["'][^>]*property=["']{}["']"#,
        regex::escape(property)
    );
    let re_alt = Regex::new(&pattern_alt).ok()?;
    re_alt
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn extract_first_img(html: &str) -> Option<String> {
    let re = Regex::new(r#"(?i)<img[^>]*src=["']([^"']+)["']"#).ok()?;
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn resolve_relative(page_url: &str, image_url: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    base.join(image_url).ok().map(|u| u.to_string())
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><head>
            <title>Tênis de Corrida Max</title>
            <meta name="description" content="Tênis leve para corredores." />
            <meta property="og:image" content="/images/tenis.png" />
        </head><body><h1>Outro título</h1><img src="/fallback.png"></body></html>
    "#;

    #[tokio::test]
    async fn scrape_extracts_metadata_through_the_proxy() {
        let mut server = mockito::Server::new_async().await;
        let envelope = serde_json::json!({ "contents": PAGE }).to_string();
        server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/get\?url=.*loja\.example.*$".to_string()),
            )
            .with_status(200)
            .with_body(envelope)
            .create_async()
            .await;

        let scraper = ProductScraper::with_proxy_base(server.url()).unwrap();
        let info = scraper
            .scrape("https://loja.example/produtos/tenis-max")
            .await
            .unwrap();

        assert_eq!(info.title, "Tênis de Corrida Max");
        assert_eq!(info.description, "Tênis leve para corredores.");
        // Relative og:image resolved against the page origin.
        assert_eq!(info.image_url, "https://loja.example/images/tenis.png");
        assert!(info.suggested_price.is_some());
        let range = info.price_range.unwrap();
        assert!(range.min <= range.max);
    }

    #[tokio::test]
    async fn scrape_degrades_to_placeholders_on_sparse_pages() {
        let mut server = mockito::Server::new_async().await;
        let envelope = serde_json::json!({ "contents": "<html><body>nada</body></html>" })
            .to_string();
        server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/get\?url=.*$".to_string()),
            )
            .with_status(200)
            .with_body(envelope)
            .create_async()
            .await;

        let scraper = ProductScraper::with_proxy_base(server.url()).unwrap();
        let info = scraper.scrape("https://vazio.example/p").await.unwrap();

        assert_eq!(info.title, "Produto encontrado");
        assert_eq!(info.description, "Descrição não disponível");
        assert_eq!(info.image_url, "");
        assert!(info.suggested_price.is_none());
    }

    #[tokio::test]
    async fn scrape_fails_with_message_on_proxy_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/get\?url=.*$".to_string()),
            )
            .with_status(500)
            .create_async()
            .await;

        let scraper = ProductScraper::with_proxy_base(server.url()).unwrap();
        let err = scraper.scrape("https://loja.example/x").await.unwrap_err();
        assert!(err.to_string().contains("Não foi possível extrair"));
    }

    #[test]
    fn price_estimate_shape_is_consistent() {
        let scraper = ProductScraper::with_proxy_base("http://unused").unwrap();
        let estimate = scraper.research_price("tênis");

        assert_eq!(estimate.sources.len(), 3);
        assert!(estimate.price_range.min <= estimate.average_price + 1.0);
        assert!(estimate.average_price <= estimate.price_range.max + 1.0);
    }
}
