use crate::browser::BrowserSession;
use crate::config::Config;
use crate::database::{Database, UpsertOutcome};
use crate::extract::{self, selectors, Timeouts};
use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub pages_visited: u32,
    pub listings_inserted: usize,
    pub listings_updated: usize,
}

impl ScrapeSummary {
    pub fn listings_saved(&self) -> usize {
        self.listings_inserted + self.listings_updated
    }
}

/// Walks the auto.ria.com used-car index page by page and stores every listing it opens
pub struct AutoRiaScraper<'a, S: BrowserSession + ?Sized> {
    session: &'a S,
    database: &'a Database,
    config: &'a Config,
    timeouts: Timeouts,
}

impl<'a, S: BrowserSession + ?Sized> AutoRiaScraper<'a, S> {
    pub fn new(session: &'a S, database: &'a Database, config: &'a Config) -> Self {
        Self {
            session,
            database,
            config,
            timeouts: config.timeouts(),
        }
    }

    /// Any failure aborts the whole run; listings stored before it stay stored.
    pub async fn run(&self) -> Result<ScrapeSummary> {
        tracing::info!("Opening main page...");
        self.session.goto(&self.config.page_url(1)).await?;

        let last_page = extract::last_page_number(self.session)
            .await
            .context("Failed to read the last page number")?;
        tracing::debug!("Last page is {} (via {} session)", last_page, self.session.name());

        let mut summary = ScrapeSummary::default();

        // The last page itself is never visited
        for page in 1..last_page {
            tracing::info!("Parsing page {}", page);
            self.session.goto(&self.config.page_url(page)).await?;
            summary.pages_visited += 1;

            let cards = self.session.count(selectors::LISTING_CARD).await?;
            tracing::debug!("Found {} listing cards on page {}", cards, page);

            for index in 0..cards {
                self.scrape_card(page, index, &mut summary).await?;
            }
        }

        Ok(summary)
    }

    async fn scrape_card(&self, page: u32, index: usize, summary: &mut ScrapeSummary) -> Result<()> {
        // Cards are looked up by position again after every back-navigation
        self.session
            .open_nth(selectors::LISTING_CARD, index, selectors::LISTING_LINK, self.timeouts.clickable)
            .await
            .with_context(|| format!("Failed to open listing #{} on page {}", index + 1, page))?;

        let listing = extract::extract_listing(self.session, &self.timeouts)
            .await
            .with_context(|| format!("Failed to parse listing #{} on page {}", index + 1, page))?;

        match self.database.upsert_listing(&listing)? {
            UpsertOutcome::Inserted => summary.listings_inserted += 1,
            UpsertOutcome::Updated => summary.listings_updated += 1,
            UpsertOutcome::Skipped => {}
        }
        tracing::trace!("Stored listing: {:?}", listing);

        self.session.back().await?;
        Ok(())
    }
}
