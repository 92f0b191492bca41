//! Shared fixtures: a scripted page source and small HTML builders.

#![allow(dead_code)]

use async_trait::async_trait;
use listing_harvester::config::Config;
use listing_harvester::scrapers::{FetchError, PageFetcher};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const LISTING_PREFIX: &str = "https://www.realitica.com/en/listing/";

#[derive(Debug, Clone)]
pub enum Reply {
    Page(String),
    Status(u16),
}

/// Serves queued replies per URL. The last reply for a URL repeats forever;
/// URLs with nothing queued answer 404.
#[derive(Default)]
pub struct ScriptedFetcher {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, url: impl Into<String>, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry(url.into())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn page(&self, url: impl Into<String>, html: impl Into<String>) -> &Self {
        self.reply(url, Reply::Page(html.into()))
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Page(html)) => Ok(html),
            Some(Reply::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// Defaults with every retry delay zeroed
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.crawl.base_delay_ms = 0;
    config.crawl.max_delay_ms = 0;
    config
}

pub fn listing_url(id: &str) -> String {
    format!("{}{}", LISTING_PREFIX, id)
}

/// Search results page with one thumbnail per id
pub fn search_page(ids: &[&str]) -> String {
    let thumbs: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="thumb_div"><a href="{}"><img src="/t/{}.jpg"></a></div>"#,
                listing_url(id),
                id
            )
        })
        .collect();
    format!("<html><body><div id=\"results\">{}</div></body></html>", thumbs)
}

/// Detail page with inline `<strong>Label</strong>: value` pairs
pub fn detail_page(pairs: &[(&str, &str)]) -> String {
    let body: String = pairs
        .iter()
        .map(|(label, value)| format!("<strong>{}</strong>: {}<br>\n", label, value))
        .collect();
    format!("<html><body><div class=\"listing\">{}</div></body></html>", body)
}

/// City overview page with one geo selector label per display text
pub fn overview_page(labels: &[&str]) -> String {
    let spans: String = labels
        .iter()
        .map(|label| format!(r#"<span class="geosel">{}</span>"#, label))
        .collect();
    format!(
        "<html><body><div id=\"search_col2\">{}</div></body></html>",
        spans
    )
}
