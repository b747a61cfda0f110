//! Web research tools: Wikipedia, arXiv, and (optionally) Tavily search.
//!
//! These are thin wrappers over the upstream HTTP APIs. The engine treats
//! them as opaque capabilities; anything beyond a short formatted result list
//! is out of scope.

use async_trait::async_trait;
use tracing::debug;

use super::{Tool, ToolError};

const WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";
const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";
const TAVILY_API_URL: &str = "https://api.tavily.com/search";

fn query_of(input: &serde_json::Value) -> Result<&str, ToolError> {
    input["query"]
        .as_str()
        .ok_or_else(|| ToolError::InvalidInput("missing required field 'query'".into()))
}

fn query_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Search query"
            }
        },
        "required": ["query"]
    })
}

/// Strip HTML tags from a snippet (Wikipedia highlights matches with spans).
fn strip_tags(text: &str) -> String {
    let re = regex::Regex::new(r"<[^>]+>").unwrap();
    re.replace_all(text, "").to_string()
}

/// Wikipedia full-text search for general knowledge and definitions.
pub struct WikipediaSearch {
    http: reqwest::Client,
}

impl WikipediaSearch {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Tool for WikipediaSearch {
    fn name(&self) -> &str {
        "wikipedia_search"
    }

    fn description(&self) -> &str {
        "Search Wikipedia for general knowledge, definitions, and factual information."
    }

    fn schema(&self) -> serde_json::Value {
        query_schema()
    }

    async fn invoke(&self, input: &serde_json::Value) -> Result<String, ToolError> {
        let query = query_of(input)?;
        debug!(query, "wikipedia search");

        let response = self
            .http
            .get(WIKIPEDIA_API_URL)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", "2"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| ToolError::Failed(e.to_string()))?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ToolError::Failed(e.to_string()))?;

        let hits = json["query"]["search"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        if hits.is_empty() {
            return Ok(format!("No Wikipedia results for '{query}'."));
        }

        let mut out = String::new();
        for hit in &hits {
            let title = hit["title"].as_str().unwrap_or("(untitled)");
            let snippet = strip_tags(hit["snippet"].as_str().unwrap_or(""));
            out.push_str(&format!("{title}: {snippet}\n"));
        }
        Ok(out.trim_end().to_string())
    }
}

/// arXiv search for academic papers and preprints. The API returns an Atom
/// feed; titles and summaries are extracted without a full XML parse.
pub struct ArxivSearch {
    http: reqwest::Client,
}

impl ArxivSearch {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn parse_feed(feed: &str) -> Vec<(String, String)> {
        let entry_re = regex::Regex::new(r"(?s)<entry>(.*?)</entry>").unwrap();
        let title_re = regex::Regex::new(r"(?s)<title>(.*?)</title>").unwrap();
        let summary_re = regex::Regex::new(r"(?s)<summary>(.*?)</summary>").unwrap();

        entry_re
            .captures_iter(feed)
            .filter_map(|entry| {
                let body = entry.get(1)?.as_str();
                let title = title_re.captures(body)?.get(1)?.as_str();
                let summary = summary_re
                    .captures(body)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str())
                    .unwrap_or("");
                Some((
                    title.split_whitespace().collect::<Vec<_>>().join(" "),
                    summary.split_whitespace().collect::<Vec<_>>().join(" "),
                ))
            })
            .collect()
    }
}

#[async_trait]
impl Tool for ArxivSearch {
    fn name(&self) -> &str {
        "arxiv_search"
    }

    fn description(&self) -> &str {
        "Search academic papers on arXiv. Best for recent research papers and preprints."
    }

    fn schema(&self) -> serde_json::Value {
        query_schema()
    }

    async fn invoke(&self, input: &serde_json::Value) -> Result<String, ToolError> {
        let query = query_of(input)?;
        debug!(query, "arxiv search");

        let search_query = format!("all:{query}");
        let response = self
            .http
            .get(ARXIV_API_URL)
            .query(&[
                ("search_query", search_query.as_str()),
                ("max_results", "5"),
            ])
            .send()
            .await
            .map_err(|e| ToolError::Failed(e.to_string()))?;

        let feed = response
            .text()
            .await
            .map_err(|e| ToolError::Failed(e.to_string()))?;

        let entries = Self::parse_feed(&feed);
        if entries.is_empty() {
            return Ok(format!("No arXiv results for '{query}'."));
        }

        let mut out = String::new();
        for (title, summary) in &entries {
            let mut short = summary.clone();
            if short.len() > 300 {
                let cut = short
                    .char_indices()
                    .take_while(|(i, _)| *i < 300)
                    .last()
                    .map(|(i, c)| i + c.len_utf8())
                    .unwrap_or(0);
                short.truncate(cut);
                short.push_str("...");
            }
            out.push_str(&format!("{title}\n{short}\n\n"));
        }
        Ok(out.trim_end().to_string())
    }
}

/// Tavily web search for current events and real-time information.
/// Registered only when an API key is configured.
pub struct TavilySearch {
    http: reqwest::Client,
    api_key: String,
}

impl TavilySearch {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
        }
    }
}

impl std::fmt::Debug for TavilySearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilySearch")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl Tool for TavilySearch {
    fn name(&self) -> &str {
        "tavily_search"
    }

    fn description(&self) -> &str {
        "Search the web for recent news, current events, and real-time information."
    }

    fn schema(&self) -> serde_json::Value {
        query_schema()
    }

    async fn invoke(&self, input: &serde_json::Value) -> Result<String, ToolError> {
        let query = query_of(input)?;
        debug!(query, "tavily search");

        let body = serde_json::json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": 5,
        });

        let response = self
            .http
            .post(TAVILY_API_URL)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Failed(e.to_string()))?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ToolError::Failed(e.to_string()))?;

        let results = json["results"].as_array().cloned().unwrap_or_default();
        if results.is_empty() {
            return Ok(format!("No web results for '{query}'."));
        }

        let mut out = String::new();
        for result in &results {
            let title = result["title"].as_str().unwrap_or("(untitled)");
            let content = result["content"].as_str().unwrap_or("");
            out.push_str(&format!("{title}: {content}\n"));
        }
        Ok(out.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_tags_removes_markup() {
        let html = r#"a <span class="searchmatch">quantum</span> computer"#;
        assert_eq!(strip_tags(html), "a quantum computer");
    }

    #[test]
    fn arxiv_feed_parsing() {
        let feed = "<feed>\
            <title>ArXiv Query Results</title>\
            <entry>\
              <title>Quantum Error\n  Correction</title>\
              <summary>We study\n  stabilizer codes.</summary>\
            </entry>\
            <entry>\
              <title>Second Paper</title>\
              <summary>More work.</summary>\
            </entry>\
        </feed>";
        let entries = ArxivSearch::parse_feed(feed);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "Quantum Error Correction");
        assert_eq!(entries[0].1, "We study stabilizer codes.");
        assert_eq!(entries[1].0, "Second Paper");
    }

    #[test]
    fn arxiv_feed_without_entries() {
        assert!(ArxivSearch::parse_feed("<feed></feed>").is_empty());
    }

    #[test]
    fn tavily_debug_redacts_key() {
        let tool = TavilySearch::new(reqwest::Client::new(), "tvly-secret");
        let debug = format!("{tool:?}");
        assert!(!debug.contains("tvly-secret"));
    }

    #[tokio::test]
    async fn missing_query_field_rejected() {
        let tool = WikipediaSearch::new(reqwest::Client::new());
        let err = tool.invoke(&serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}
