use super::{BrowserSession, WAIT_INTERVAL};
use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;

/// Remote Chrome session driven over the WebDriver protocol
pub struct WebDriverSession {
    driver: WebDriver,
}

impl WebDriverSession {
    pub async fn connect(config: &Config) -> Result<Self> {
        let mut caps = DesiredCapabilities::chrome();
        if config.headless {
            caps.add_arg("--headless")?;
        }
        caps.add_arg("--no-sandbox")?;
        caps.add_arg("--disable-dev-shm-usage")?;
        caps.add_experimental_option("excludeSwitches", vec!["enable-automation"])?;
        caps.add_experimental_option("useAutomationExtension", false)?;

        tracing::debug!("Connecting to WebDriver at {}", config.webdriver_url);
        let driver = WebDriver::new(config.webdriver_url.as_str(), caps)
            .await
            .with_context(|| format!("Failed to connect to WebDriver at {}", config.webdriver_url))?;

        Ok(Self { driver })
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    fn name(&self) -> &str {
        "WebDriver"
    }

    async fn goto(&self, url: &str) -> Result<()> {
        tracing::debug!("Navigating to {}", url);
        self.driver.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.driver.current_url().await?.to_string())
    }

    async fn back(&self) -> Result<()> {
        self.driver.back().await?;
        Ok(())
    }

    async fn text(&self, selector: &str) -> Result<String> {
        let element = self.driver.find(By::Css(selector)).await?;
        Ok(element.text().await?)
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>> {
        let mut texts = Vec::new();
        for element in self.driver.find_all(By::Css(selector)).await? {
            texts.push(element.text().await?);
        }
        Ok(texts)
    }

    async fn property(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let element = self.driver.find(By::Css(selector)).await?;
        Ok(element.prop(name).await?)
    }

    async fn wait_for_text(&self, selector: &str, timeout: Duration) -> Result<String> {
        let element = self.driver
            .query(By::Css(selector))
            .wait(timeout, WAIT_INTERVAL)
            .first()
            .await
            .with_context(|| format!("Timed out after {:?} waiting for '{}'", timeout, selector))?;
        Ok(element.text().await?)
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.driver.find(By::Css(selector)).await?.click().await?;
        Ok(())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        Ok(self.driver.find_all(By::Css(selector)).await?.len())
    }

    async fn open_nth(&self, container: &str, index: usize, link: &str, timeout: Duration) -> Result<()> {
        let cards = self.driver.find_all(By::Css(container)).await?;
        let card = cards
            .get(index)
            .with_context(|| format!("No '{}' element at index {} ({} found)", container, index, cards.len()))?;

        card.scroll_into_view().await?;

        let target = card
            .query(By::Css(link))
            .and_clickable()
            .wait(timeout, WAIT_INTERVAL)
            .first()
            .await
            .with_context(|| format!("'{}' in card {} never became clickable", link, index))?;
        target.click().await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.driver.clone().quit().await?;
        Ok(())
    }
}
