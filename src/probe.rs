use crate::browser::{BrowserSession, HtmlSession};
use crate::config::Config;
use crate::extract::{self, selectors};
use crate::http_client;
use anyhow::{Context, Result};

/// What the first index page looks like without a browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub listing_cards: usize,
    pub last_page: Option<u32>,
}

/// Fetch index page 1 over plain HTTP and run the index-page extraction on it
pub async fn probe_index(config: &Config, save_path: Option<&str>) -> Result<ProbeReport> {
    let url = config.page_url(1);
    tracing::info!("Probing {}", url);

    let client = http_client::create_http_client(&config.user_agent)?;
    let response = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;
    tracing::info!("Status: {}", response.status());

    let body = response.text().await?;
    tracing::info!("Fetched {} bytes", body.len());

    if let Some(path) = save_path {
        std::fs::write(path, &body).with_context(|| format!("Failed to write HTML to {}", path))?;
        tracing::info!("HTML saved to: {}", path);
    }

    if http_client::looks_like_captcha(&body) {
        tracing::warn!("Response may contain CAPTCHA or anti-bot protection");
    }

    let report = inspect_index(&url, &body).await?;
    match report.last_page {
        Some(last_page) => tracing::info!(
            "Found {} listing cards, last page is {}",
            report.listing_cards, last_page
        ),
        None => tracing::warn!(
            "Found {} listing cards, but no usable pagination. Page structure may have changed.",
            report.listing_cards
        ),
    }

    Ok(report)
}

async fn inspect_index(url: &str, html: &str) -> Result<ProbeReport> {
    let session = HtmlSession::new().with_page(url, html);
    session.goto(url).await?;

    let listing_cards = session.count(selectors::LISTING_CARD).await?;
    let last_page = match extract::last_page_number(&session).await {
        Ok(last_page) => Some(last_page),
        Err(e) => {
            tracing::debug!("No last page: {:#}", e);
            None
        }
    };

    Ok(ProbeReport {
        listing_cards,
        last_page,
    })
}
