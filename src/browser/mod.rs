mod html;
mod webdriver;

pub use html::HtmlSession;
pub use webdriver::WebDriverSession;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Poll interval for bounded element waits
pub const WAIT_INTERVAL: Duration = Duration::from_millis(500);

/// Handle to the page currently displayed in a browser.
/// Every selector is a CSS selector.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Returns the name of the session backend
    fn name(&self) -> &str;

    async fn goto(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn back(&self) -> Result<()>;

    /// Text of the first element matching `selector`
    async fn text(&self, selector: &str) -> Result<String>;

    /// Texts of every element matching `selector`, in document order
    async fn texts(&self, selector: &str) -> Result<Vec<String>>;

    /// DOM property of the first element matching `selector`. URL properties
    /// such as `src` and `href` come back absolute.
    async fn property(&self, selector: &str, name: &str) -> Result<Option<String>>;

    /// Wait until an element matching `selector` is present, then return its text
    async fn wait_for_text(&self, selector: &str, timeout: Duration) -> Result<String>;

    async fn click(&self, selector: &str) -> Result<()>;

    async fn count(&self, selector: &str) -> Result<usize>;

    /// Scroll the `index`-th `container` into view, wait for its `link` to become
    /// clickable and click it
    async fn open_nth(&self, container: &str, index: usize, link: &str, timeout: Duration) -> Result<()>;

    /// Ends the session. Defaults to a no-op for sessions without a remote end.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
