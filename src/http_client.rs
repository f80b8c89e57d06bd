use reqwest::{Client, header};
use anyhow::Result;
use std::time::Duration;

/// Creates an HTTP client that sends the headers of a desktop browser navigation
pub fn create_http_client(user_agent: &str) -> Result<Client> {
    let mut headers = header::HeaderMap::new();

    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8")
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header::HeaderValue::from_static("uk-UA,uk;q=0.9,en-US;q=0.8,en;q=0.7")
    );
    headers.insert(
        header::ACCEPT_ENCODING,
        header::HeaderValue::from_static("gzip, deflate, br")
    );
    headers.insert(
        "Upgrade-Insecure-Requests",
        header::HeaderValue::from_static("1")
    );
    headers.insert(
        "Sec-Fetch-Dest",
        header::HeaderValue::from_static("document")
    );
    headers.insert(
        "Sec-Fetch-Mode",
        header::HeaderValue::from_static("navigate")
    );

    let client = Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(Duration::from_secs(30))
        .build()?;

    Ok(client)
}

/// Heuristic for anti-bot interstitials served instead of the listings page
pub fn looks_like_captcha(body: &str) -> bool {
    let lower_body = body.to_lowercase();
    lower_body.contains("captcha") || lower_body.contains("recaptcha") || lower_body.contains("cloudflare")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_http_client() {
        assert!(create_http_client("Mozilla/5.0 (X11; Linux x86_64)").is_ok());
    }

    #[test]
    fn test_looks_like_captcha() {
        assert!(looks_like_captcha("<div class=\"g-recaptcha\"></div>"));
        assert!(looks_like_captcha("Checking your browser - Cloudflare"));
        assert!(!looks_like_captcha("<section class=\"ticket-item\"></section>"));
    }
}
