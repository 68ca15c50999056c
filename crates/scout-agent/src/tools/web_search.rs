use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use super::{Tool, ToolResult};

const SEARCH_ENDPOINT: &str = "https://duckduckgo.com/html/";
const MAX_RESULTS: usize = 10;

/// Web lookup capability: scrapes the DuckDuckGo HTML endpoint and returns
/// a formatted digest of the top results.
pub struct WebSearchTool {
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for information about companies, topics, or current events. \
         Returns comprehensive, well-formatted results with clickable links that \
         provide context, facts, news, and resources."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "string",
                    "description": "The search query.",
                },
            },
            "required": ["input"],
        })
    }

    async fn execute(&self, input: &str) -> ToolResult {
        debug!(query = %input, "performing web search");
        let url = format!("{SEARCH_ENDPOINT}?q={}", urlencoding::encode(input));

        let resp = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "web search request failed");
                return ToolResult::error(format!("Error performing web search: {e}"));
            }
        };

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            warn!(status, "web search returned non-success status");
            return ToolResult::error(format!(
                "Error performing web search: search failed with status {status}"
            ));
        }

        let html = match resp.text().await {
            Ok(t) => t,
            Err(e) => {
                return ToolResult::error(format!("Error performing web search: {e}"));
            }
        };

        let results = parse_results(&html);
        if results.is_empty() {
            return ToolResult::success("No relevant information found for the query.");
        }
        ToolResult::success(render_digest(input, &results))
    }
}

struct SearchResult {
    title: String,
    snippet: String,
    url: String,
    domain: String,
}

/// Pull structured results out of the DuckDuckGo HTML response.
fn parse_results(html: &str) -> Vec<SearchResult> {
    let Ok(body_sel) = Selector::parse(".result__body") else {
        return Vec::new();
    };
    let Ok(title_sel) = Selector::parse(".result__title") else {
        return Vec::new();
    };
    let Ok(snippet_sel) = Selector::parse(".result__snippet") else {
        return Vec::new();
    };
    let Ok(link_sel) = Selector::parse(".result__title a") else {
        return Vec::new();
    };
    let Ok(fallback_url_sel) = Selector::parse(".result__url") else {
        return Vec::new();
    };

    let doc = Html::parse_document(html);
    let mut results = Vec::new();

    for element in doc.select(&body_sel).take(MAX_RESULTS) {
        let text_of = |sel: &Selector| {
            element
                .select(sel)
                .next()
                .map(|e| e.text().collect::<String>().trim().to_string())
                .unwrap_or_default()
        };

        let title = text_of(&title_sel);
        let snippet = text_of(&snippet_sel);

        // results link through a redirect URL; the real target sits in the
        // `uddg` query parameter
        let url = element
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(extract_redirect_target)
            .unwrap_or_else(|| text_of(&fallback_url_sel));

        let domain = domain_of(&url);
        if title.is_empty() && snippet.is_empty() {
            continue;
        }
        results.push(SearchResult {
            title,
            snippet,
            url,
            domain,
        });
    }

    results
}

fn extract_redirect_target(href: &str) -> Option<String> {
    let start = href.find("uddg=")? + "uddg=".len();
    let encoded = &href[start..];
    let encoded = encoded.split('&').next().unwrap_or(encoded);
    urlencoding::decode(encoded).ok().map(|c| c.into_owned())
}

fn domain_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_default()
}

fn render_digest(query: &str, results: &[SearchResult]) -> String {
    let mut out = format!("Here are some useful resources about {query}:\n\n");
    for r in results {
        let domain_display = if r.domain.is_empty() {
            String::new()
        } else {
            format!(" ({})", r.domain)
        };
        out.push_str(&format!(
            "{}{}: {}\n{}\n\n",
            r.title, domain_display, r.snippet, r.url
        ));
    }
    out.push_str(&format!(
        "These links provide comprehensive information about {query}. Click any URL to learn more."
    ));
    out
}
