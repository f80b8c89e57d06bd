use super::BrowserSession;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Default)]
struct Navigation {
    current: Option<String>,
    history: Vec<String>,
}

/// Session over pre-fetched HTML documents, keyed by URL.
///
/// Nothing is rendered or executed: waits resolve immediately, clicking a
/// control only checks that it exists, and opening a card follows the `href`
/// of its link.
#[derive(Default)]
pub struct HtmlSession {
    pages: HashMap<String, String>,
    navigation: Mutex<Navigation>,
}

impl HtmlSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.insert_page(url, html);
        self
    }

    pub fn insert_page(&mut self, url: &str, html: &str) {
        self.pages.insert(url.to_string(), html.to_string());
    }

    async fn current(&self) -> Result<String> {
        self.navigation
            .lock()
            .await
            .current
            .clone()
            .context("No page has been opened yet")
    }

    /// Run `f` against the current document. The parsed document never outlives this call.
    async fn with_document<T>(&self, f: impl FnOnce(&Html) -> Result<T>) -> Result<T> {
        let url = self.current().await?;
        let html = self.pages
            .get(&url)
            .with_context(|| format!("No HTML loaded for {}", url))?;
        let document = Html::parse_document(html);
        f(&document)
    }

    async fn navigate(&self, url: String) -> Result<()> {
        if !self.pages.contains_key(&url) {
            anyhow::bail!("No HTML loaded for {}", url);
        }

        let mut navigation = self.navigation.lock().await;
        if let Some(previous) = navigation.current.replace(url) {
            navigation.history.push(previous);
        }
        Ok(())
    }
}

/// Properties the browser reports as absolute URLs
const URL_PROPERTIES: &[&str] = &["src", "href"];

fn resolve_url(base: &str, reference: &str) -> Result<String> {
    let resolved = Url::parse(base)
        .and_then(|base| base.join(reference))
        .with_context(|| format!("Cannot resolve '{}' against {}", reference, base))?;
    Ok(resolved.to_string())
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow::anyhow!("Invalid selector '{}': {:?}", selector, e))
}

/// Text of an element with whitespace collapsed per source line and blank lines dropped
fn element_text(element: ElementRef) -> String {
    let raw: String = element.text().collect();
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn first_match<'a>(document: &'a Html, selector: &str) -> Result<ElementRef<'a>> {
    let parsed = parse_selector(selector)?;
    document
        .select(&parsed)
        .next()
        .with_context(|| format!("No element matches '{}'", selector))
}

#[async_trait]
impl BrowserSession for HtmlSession {
    fn name(&self) -> &str {
        "HTML"
    }

    async fn goto(&self, url: &str) -> Result<()> {
        self.navigate(url.to_string()).await
    }

    async fn current_url(&self) -> Result<String> {
        self.current().await
    }

    async fn back(&self) -> Result<()> {
        let mut navigation = self.navigation.lock().await;
        let previous = navigation.history.pop().context("No page to go back to")?;
        navigation.current = Some(previous);
        Ok(())
    }

    async fn text(&self, selector: &str) -> Result<String> {
        self.with_document(|document| Ok(element_text(first_match(document, selector)?)))
            .await
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>> {
        self.with_document(|document| {
            let parsed = parse_selector(selector)?;
            Ok(document.select(&parsed).map(element_text).collect())
        })
        .await
    }

    async fn property(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let current = self.current().await?;
        let value = self
            .with_document(|document| {
                let element = first_match(document, selector)?;
                Ok(element.value().attr(name).map(|s| s.to_string()))
            })
            .await?;

        match value {
            Some(value) if !value.is_empty() && URL_PROPERTIES.contains(&name) => {
                resolve_url(&current, &value).map(Some)
            }
            other => Ok(other),
        }
    }

    async fn wait_for_text(&self, selector: &str, _timeout: Duration) -> Result<String> {
        self.text(selector).await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.with_document(|document| first_match(document, selector).map(|_| ()))
            .await
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        self.with_document(|document| {
            let parsed = parse_selector(selector)?;
            Ok(document.select(&parsed).count())
        })
        .await
    }

    async fn open_nth(&self, container: &str, index: usize, link: &str, _timeout: Duration) -> Result<()> {
        let current = self.current().await?;
        let href = self
            .with_document(|document| {
                let cards = parse_selector(container)?;
                let card = document
                    .select(&cards)
                    .nth(index)
                    .with_context(|| format!("No '{}' element at index {}", container, index))?;
                let links = parse_selector(link)?;
                let target = card
                    .select(&links)
                    .next()
                    .with_context(|| format!("No '{}' inside card {}", link, index))?;
                target
                    .value()
                    .attr("href")
                    .map(|s| s.to_string())
                    .with_context(|| format!("'{}' in card {} has no href", link, index))
            })
            .await?;

        let target = resolve_url(&current, &href)?;
        self.navigate(target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = "https://auto.ria.com/uk/car/used/?page=1";

    fn index_html() -> &'static str {
        r#"
            <html><body>
                <section class="ticket-item">
                    <a class="head-ticket" href="/uk/auto_bmw_x5_1.html">BMW X5</a>
                </section>
                <section class="ticket-item">
                    <a class="head-ticket" href="https://auto.ria.com/uk/auto_audi_a4_2.html">Audi A4</a>
                </section>
            </body></html>
        "#
    }

    fn session() -> HtmlSession {
        HtmlSession::new()
            .with_page(INDEX, index_html())
            .with_page("https://auto.ria.com/uk/auto_bmw_x5_1.html", "<h1 class=\"auto-content_title\">BMW X5</h1>")
            .with_page("https://auto.ria.com/uk/auto_audi_a4_2.html", "<h1 class=\"auto-content_title\">Audi A4</h1>")
    }

    #[tokio::test]
    async fn test_open_card_and_go_back() {
        let session = session();
        session.goto(INDEX).await.unwrap();
        assert_eq!(session.count(".ticket-item").await.unwrap(), 2);

        session.open_nth(".ticket-item", 0, ".head-ticket", Duration::from_secs(1)).await.unwrap();
        assert_eq!(session.current_url().await.unwrap(), "https://auto.ria.com/uk/auto_bmw_x5_1.html");
        assert_eq!(session.text(".auto-content_title").await.unwrap(), "BMW X5");

        session.back().await.unwrap();
        assert_eq!(session.current_url().await.unwrap(), INDEX);

        session.open_nth(".ticket-item", 1, ".head-ticket", Duration::from_secs(1)).await.unwrap();
        assert_eq!(session.text(".auto-content_title").await.unwrap(), "Audi A4");
    }

    #[tokio::test]
    async fn test_missing_element_is_an_error() {
        let session = session();
        session.goto(INDEX).await.unwrap();
        assert!(session.text(".price_value").await.is_err());
        assert!(session.click(".phone_show_link").await.is_err());
        assert!(session.open_nth(".ticket-item", 5, ".head-ticket", Duration::from_secs(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_page_is_an_error() {
        let session = session();
        assert!(session.text(".ticket-item").await.is_err());
        assert!(session.goto("https://auto.ria.com/uk/car/used/?page=99").await.is_err());
        assert!(session.back().await.is_err());
    }

    #[tokio::test]
    async fn test_url_properties_are_absolute() {
        let session = HtmlSession::new().with_page(
            INDEX,
            r#"<img class="outline" src="/photos/bmw_x5.jpg" alt="BMW X5"><img class="empty">"#,
        );
        session.goto(INDEX).await.unwrap();

        assert_eq!(
            session.property(".outline", "src").await.unwrap().as_deref(),
            Some("https://auto.ria.com/photos/bmw_x5.jpg")
        );
        assert_eq!(session.property(".outline", "alt").await.unwrap().as_deref(), Some("BMW X5"));
        assert_eq!(session.property(".empty", "src").await.unwrap(), None);
        assert!(session.property(".missing", "src").await.is_err());
    }

    #[tokio::test]
    async fn test_text_keeps_lines_and_collapses_spaces() {
        let session = HtmlSession::new().with_page(
            INDEX,
            r#"
                <div class="list-phone">
                    <div>Телефон</div>
                    <div>(067)   111 11 11</div>
                </div>
                <span class="count"><span>1</span> з <span>14</span></span>
            "#,
        );
        session.goto(INDEX).await.unwrap();
        assert_eq!(session.text(".list-phone").await.unwrap(), "Телефон\n(067) 111 11 11");
        assert_eq!(session.text(".count").await.unwrap(), "1 з 14");
    }
}
