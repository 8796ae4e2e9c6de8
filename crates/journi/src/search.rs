//! Web search and page fetching, backed by DuckDuckGo's HTML endpoint.

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::LazyLock;

use regex::Regex;
use reqwest::{Client, StatusCode};

static RESULT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a[^>]*class="result__a"[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#)
        .expect("valid regex")
});
static RESULT_SNIPPET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="result__snippet"[^>]*>(.*?)</(?:a|td|div)>"#)
        .expect("valid regex")
});
static INVISIBLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|head)\b.*?</(script|style|noscript|head)>")
        .expect("valid regex")
});
static BLOCK_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|li|tr|h[1-6]|section|article)>")
        .expect("valid regex")
});
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// The error type for [`SearchClient`].
#[derive(Debug)]
pub enum Error {
    /// Web access is turned off.
    Disabled,
    /// The URL is not an `http(s)` URL.
    InvalidUrl(String),
    /// The request failed.
    Http(reqwest::Error),
    /// The server answered with an error status.
    Status(StatusCode),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Disabled => write!(f, "web access is disabled"),
            Error::InvalidUrl(url) => write!(f, "not an http(s) URL: {url}"),
            Error::Http(err) => write!(f, "request failed: {err}"),
            Error::Status(status) => write!(f, "server answered {status}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err)
    }
}

/// One web search hit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchResult {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub href: String,
    /// Text snippet, possibly empty.
    pub body: String,
}

/// Searches the web and fetches pages. Cheap to clone.
#[derive(Clone, Debug)]
pub struct SearchClient {
    client: Client,
    enabled: bool,
}

impl SearchClient {
    /// Creates an enabled client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            enabled: true,
        }
    }

    /// Creates a client whose every call fails with [`Error::Disabled`].
    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            enabled: false,
        }
    }

    /// Whether web access is allowed.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns up to `max_results` hits for `query`.
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, Error> {
        if !self.enabled {
            return Err(Error::Disabled);
        }
        let url = format!(
            "https://html.duckduckgo.com/html/?q={}",
            urlencoding::encode(query)
        );
        debug!("searching: {query}");
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }
        let html = resp.text().await?;
        let results = parse_results(&html, max_results);
        debug!("got {} result(s) for: {query}", results.len());
        Ok(results)
    }

    /// Fetches `url` and returns its readable text.
    pub async fn fetch_page(&self, url: &str) -> Result<String, Error> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::InvalidUrl(url.to_owned()));
        }
        if !self.enabled {
            return Err(Error::Disabled);
        }
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }
        let html = resp.text().await?;
        Ok(html_to_text(&html))
    }
}

/// Renders search hits the way the `web_search` tool reports them.
pub fn format_results(results: &[SearchResult]) -> String {
    let entries: Vec<_> = results
        .iter()
        .map(|r| format!("[{}]({})\n{}", r.title, r.href, r.body))
        .collect();
    format!("## Search Results\n\n{}", entries.join("\n\n"))
}

fn parse_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let links: Vec<_> = RESULT_LINK.captures_iter(html).collect();
    let mut results = Vec::new();
    for (idx, link) in links.iter().enumerate() {
        if results.len() >= max_results {
            break;
        }
        let (Some(whole), Some(href), Some(title)) = (link.get(0), link.get(1), link.get(2))
        else {
            continue;
        };
        // The snippet sits between this link and the next one.
        let rest_end = links
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map_or(html.len(), |m| m.start());
        let body = RESULT_SNIPPET
            .captures(&html[whole.end()..rest_end])
            .and_then(|c| c.get(1))
            .map(|m| inline_text(m.as_str()))
            .unwrap_or_default();
        let title = inline_text(title.as_str());
        if title.is_empty() {
            continue;
        }
        results.push(SearchResult {
            title,
            href: resolve_href(href.as_str()),
            body,
        });
    }
    results
}

/// Unwraps DuckDuckGo's redirect links.
fn resolve_href(href: &str) -> String {
    let href = html_escape::decode_html_entities(href);
    if let Some(pos) = href.find("uddg=") {
        let target = &href[pos + 5..];
        let target = target.split('&').next().unwrap_or(target);
        if let Ok(decoded) = urlencoding::decode(target) {
            return decoded.into_owned();
        }
    }
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{rest}");
    }
    href.into_owned()
}

fn inline_text(fragment: &str) -> String {
    let text = TAG.replace_all(fragment, "");
    let text = html_escape::decode_html_entities(&text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strips markup from a page, keeping one line per block element.
pub fn html_to_text(html: &str) -> String {
    let html = INVISIBLE_BLOCK.replace_all(html, "");
    let html = BLOCK_END.replace_all(&html, "\n");
    let text = TAG.replace_all(&html, "");
    let text = html_escape::decode_html_entities(&text);
    let lines: Vec<_> = text
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();
    BLANK_LINES
        .replace_all(lines.join("\n").trim(), "\n\n")
        .into_owned()
}
