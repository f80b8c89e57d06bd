//! Field extraction for auto.ria.com detail pages.
//!
//! Every routine reads the page currently displayed by the session it is given.
//! Required fields propagate an error; the license plate and VIN come back as
//! [`FieldValue::Missing`] instead.

use crate::browser::BrowserSession;
use crate::models::{CarListing, FieldValue};
use anyhow::{Context, Result};
use std::time::Duration;

pub mod selectors {
    pub const LISTING_CARD: &str = ".ticket-item";
    pub const LISTING_LINK: &str = ".head-ticket";
    pub const PAGINATION_LINK: &str = ".page-link";

    pub const TITLE: &str = ".auto-content_title";
    pub const PRICE: &str = ".price_value";
    pub const ODOMETER: &str = ".base-information.bold";
    pub const SELLER_NAME: &str = ".seller_info_name";
    pub const PHONE_REVEAL: &str = ".phone_show_link";
    pub const PHONE_LIST: &str = ".list-phone";
    pub const MAIN_IMAGE: &str = ".outline";
    pub const IMAGE_COUNT: &str = ".count";
    pub const LICENSE_PLATE: &str = ".state-num.ua";
    pub const VIN: &str = ".label-vin";
}

/// Upper bounds for the explicit waits on a page
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Presence of the title and the phone panel
    pub element: Duration,
    /// A listing card link becoming clickable
    pub clickable: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            element: Duration::from_secs(10),
            clickable: Duration::from_secs(20),
        }
    }
}

/// Parse price from text (e.g., "$12,345", "12 345 $", "12 345 UAH")
pub fn parse_price(price_text: &str) -> Result<i64> {
    let digits: String = price_text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits
        .parse::<i64>()
        .with_context(|| format!("No price in '{}'", price_text))
}

/// Parse odometer from a reading in thousands (e.g., "150 тис. км" -> 150000)
pub fn parse_odometer(odometer_text: &str) -> Result<i64> {
    let thousands = odometer_text.split(' ').next().unwrap_or_default();
    format!("{}000", thousands)
        .parse::<i64>()
        .with_context(|| format!("Unexpected odometer reading '{}'", odometer_text))
}

/// Drop the label line of the revealed phone panel and join the numbers with commas
pub fn parse_phone_numbers(panel_text: &str) -> String {
    panel_text.split('\n').skip(1).collect::<Vec<_>>().join(",")
}

/// Third whitespace token of the photo counter (e.g., "1 з 14" -> "14")
pub fn parse_image_count(count_text: &str) -> Result<String> {
    count_text
        .split_whitespace()
        .nth(2)
        .map(|s| s.to_string())
        .with_context(|| format!("Unexpected image counter '{}'", count_text))
}

/// First whitespace token of the VIN label, which is followed by a hint text
pub fn parse_vin(vin_text: &str) -> FieldValue<String> {
    vin_text.split_whitespace().next().map(|s| s.to_string()).into()
}

/// The pagination control before "next" holds the last page number
pub fn parse_last_page(pagination: &[String]) -> Result<u32> {
    if pagination.len() < 2 {
        anyhow::bail!("Expected at least 2 pagination controls, found {}", pagination.len());
    }

    let last_page = &pagination[pagination.len() - 2];
    last_page
        .replace(' ', "")
        .parse::<u32>()
        .with_context(|| format!("Unexpected last page label '{}'", last_page))
}

pub async fn title<S: BrowserSession + ?Sized>(session: &S, timeout: Duration) -> Result<String> {
    session
        .wait_for_text(selectors::TITLE, timeout)
        .await
        .context("Listing title never appeared")
}

pub async fn price_usd<S: BrowserSession + ?Sized>(session: &S) -> Result<i64> {
    let text = session.text(selectors::PRICE).await.context("Price not found")?;
    parse_price(&text)
}

pub async fn odometer<S: BrowserSession + ?Sized>(session: &S) -> Result<i64> {
    let text = session.text(selectors::ODOMETER).await.context("Odometer not found")?;
    parse_odometer(&text)
}

pub async fn username<S: BrowserSession + ?Sized>(session: &S) -> Result<String> {
    session.text(selectors::SELLER_NAME).await.context("Seller name not found")
}

pub async fn phone_number<S: BrowserSession + ?Sized>(session: &S, timeout: Duration) -> Result<String> {
    session
        .click(selectors::PHONE_REVEAL)
        .await
        .context("Phone reveal control not found")?;

    let panel = session
        .wait_for_text(selectors::PHONE_LIST, timeout)
        .await
        .context("Phone numbers never appeared")?;
    Ok(parse_phone_numbers(&panel))
}

/// Resolved `src` of the main image, empty when the image has none
pub async fn image_url<S: BrowserSession + ?Sized>(session: &S) -> Result<String> {
    let src = session
        .property(selectors::MAIN_IMAGE, "src")
        .await
        .context("Main image not found")?;
    Ok(src.unwrap_or_default())
}

pub async fn image_count<S: BrowserSession + ?Sized>(session: &S) -> Result<String> {
    let text = session.text(selectors::IMAGE_COUNT).await.context("Image counter not found")?;
    parse_image_count(&text)
}

pub async fn car_number<S: BrowserSession + ?Sized>(session: &S) -> FieldValue<String> {
    match session.text(selectors::LICENSE_PLATE).await {
        Ok(plate) => FieldValue::Value(plate),
        Err(e) => {
            tracing::debug!("No license plate: {:#}", e);
            FieldValue::Missing
        }
    }
}

pub async fn car_vin<S: BrowserSession + ?Sized>(session: &S) -> FieldValue<String> {
    match session.text(selectors::VIN).await {
        Ok(text) => parse_vin(&text),
        Err(e) => {
            tracing::debug!("No VIN: {:#}", e);
            FieldValue::Missing
        }
    }
}

pub async fn last_page_number<S: BrowserSession + ?Sized>(session: &S) -> Result<u32> {
    let pagination = session.texts(selectors::PAGINATION_LINK).await?;
    parse_last_page(&pagination)
}

/// Run every field routine against the open detail page.
/// The URL is read once the title is present, so it belongs to the detail page.
pub async fn extract_listing<S: BrowserSession + ?Sized>(
    session: &S,
    timeouts: &Timeouts,
) -> Result<CarListing> {
    let title = title(session, timeouts.element).await?;
    tracing::info!("Parsing car: {}", title);
    let url = session.current_url().await?;

    let price_usd = price_usd(session).await?;
    let odometer = odometer(session).await?;
    let username = username(session).await?;
    let image_url = image_url(session).await?;
    let image_count = image_count(session).await?;
    let car_number = car_number(session).await.unwrap_or_empty();
    let car_vin = car_vin(session).await.unwrap_or_empty();
    let phone_number = phone_number(session, timeouts.element).await?;

    Ok(CarListing {
        url,
        title,
        price_usd,
        odometer,
        username,
        phone_number,
        image_url,
        image_count,
        car_number,
        car_vin,
    })
}
