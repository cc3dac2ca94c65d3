//! Source adapters: one per listing site, sharing ordered-fallback parsing.
//!
//! Listing markup drifts. Every extraction step is an ordered chain of
//! selectors tried until one matches, and a card that yields no usable URL
//! or title is skipped without touching the rest of the page.

use async_trait::async_trait;
use jobradar_core::{RawPosting, SearchQuery};
use jobradar_storage::HttpFetcher;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use urlencoding::encode;

pub const CRATE_NAME: &str = "jobradar-adapters";

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// One listing site. The orchestrator only ever sees this trait.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn platform(&self) -> &'static str;

    async fn fetch_postings(
        &self,
        http: &HttpFetcher,
        query: &SearchQuery,
    ) -> Result<Vec<RawPosting>, AdapterError>;
}

/// Ordered list of selectors; extraction stops at the first one that yields
/// a usable result.
#[derive(Debug, Clone)]
struct SelectorChain {
    selectors: Vec<Selector>,
}

impl SelectorChain {
    fn parse(raw: &[&str]) -> Self {
        let selectors = raw
            .iter()
            .filter_map(|s| match Selector::parse(s) {
                Ok(sel) => Some(sel),
                Err(err) => {
                    tracing::debug!(selector = *s, %err, "invalid selector skipped");
                    None
                }
            })
            .collect();
        Self { selectors }
    }

    fn first_element<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.selectors
            .iter()
            .find_map(|sel| scope.select(sel).next())
    }

    fn first_text(&self, scope: ElementRef) -> Option<String> {
        self.selectors
            .iter()
            .find_map(|sel| scope.select(sel).next().and_then(element_text))
    }

    fn first_attr(&self, scope: ElementRef, attr: &str) -> Option<String> {
        self.selectors.iter().find_map(|sel| {
            scope
                .select(sel)
                .next()
                .and_then(|el| el.value().attr(attr))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
    }

    /// All matches of the first selector that matches anything at all.
    fn all_elements<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        for sel in &self.selectors {
            let found: Vec<_> = scope.select(sel).collect();
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }
}

fn element_text(el: ElementRef) -> Option<String> {
    let text = el
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn absolutize(base: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{base}{href}")
    }
}

/// Per-site selector chains driving card extraction.
#[derive(Debug, Clone)]
struct CardExtractor {
    base_url: &'static str,
    containers: SelectorChain,
    link: SelectorChain,
    title: SelectorChain,
    company: SelectorChain,
    location: SelectorChain,
    experience: SelectorChain,
    posted: SelectorChain,
    /// When set, the posted date is read from this attribute of the first
    /// matched element instead of its text.
    posted_attr: Option<&'static str>,
}

impl CardExtractor {
    fn parse_page(&self, html: &str, platform: &str) -> Vec<RawPosting> {
        let document = Html::parse_document(html);
        let root = document.root_element();
        let mut postings = Vec::new();
        for card in self.containers.all_elements(root) {
            match self.parse_card(card) {
                Some(posting) => postings.push(posting),
                None => tracing::debug!(platform, "card missing url or title, skipped"),
            }
        }
        postings
    }

    fn parse_card(&self, card: ElementRef) -> Option<RawPosting> {
        let link = self.link.first_element(card)?;
        let href = link.value().attr("href").map(str::trim).filter(|h| !h.is_empty())?;
        let url = absolutize(self.base_url, href);
        let title = element_text(link).or_else(|| self.title.first_text(card))?;

        let posted_date = match self.posted_attr {
            Some(attr) => self.posted.first_attr(card, attr),
            None => self.posted.first_text(card),
        };

        Some(RawPosting {
            title,
            company: self
                .company
                .first_text(card)
                .unwrap_or_else(|| "Unknown".to_string()),
            location: self.location.first_text(card).unwrap_or_default(),
            experience_level: self.experience.first_text(card).unwrap_or_default(),
            job_type: String::new(),
            posted_date: posted_date.unwrap_or_default(),
            url,
        })
    }
}

/// Fetch each page in turn; a page that never answers is skipped, it does
/// not fail the source.
async fn collect_pages(
    http: &HttpFetcher,
    platform: &'static str,
    page_urls: Vec<String>,
    parse: impl Fn(&str) -> Vec<RawPosting>,
) -> Result<Vec<RawPosting>, AdapterError> {
    let mut postings = Vec::new();
    for url in page_urls {
        match http.fetch(&url).await {
            Ok(resp) => postings.extend(parse(&resp.body)),
            Err(err) => {
                tracing::warn!(platform, url, %err, "page fetch failed, skipping page");
            }
        }
    }
    Ok(postings)
}

pub struct LinkedInAdapter {
    extractor: CardExtractor,
}

impl LinkedInAdapter {
    pub const PLATFORM: &'static str = "LinkedIn";

    pub fn new() -> Self {
        Self {
            extractor: CardExtractor {
                base_url: "https://www.linkedin.com",
                containers: SelectorChain::parse(&[
                    "div.base-card",
                    "li.result-card",
                    "div.job-search-card",
                ]),
                link: SelectorChain::parse(&[
                    "h3.base-search-card__title a[href]",
                    "h3.result-card__title a[href]",
                    "h3.job-search-card__title a[href]",
                    "h3 a[href]",
                    "a[href]",
                ]),
                title: SelectorChain::parse(&[
                    "h3.base-search-card__title",
                    "h3.result-card__title",
                    "h3.job-search-card__title",
                    "h3",
                ]),
                company: SelectorChain::parse(&[
                    "h4.base-search-card__subtitle",
                    "h4.result-card__subtitle",
                    "a.hidden-nested-link",
                ]),
                location: SelectorChain::parse(&[
                    "span.job-search-card__location",
                    "span.result-card__location",
                ]),
                experience: SelectorChain::parse(&[]),
                posted: SelectorChain::parse(&[
                    "time.job-search-card__listdate",
                    "time.result-card__listdate",
                    "time",
                ]),
                posted_attr: Some("datetime"),
            },
        }
    }

    fn page_url(&self, query: &SearchQuery, page: usize) -> String {
        format!(
            "https://www.linkedin.com/jobs/search/?keywords={}&location={}&start={}",
            encode(&query.keywords),
            encode(&query.location),
            page * 25
        )
    }

    pub fn parse_page(&self, html: &str) -> Vec<RawPosting> {
        self.extractor.parse_page(html, Self::PLATFORM)
    }
}

#[async_trait]
impl SourceAdapter for LinkedInAdapter {
    fn platform(&self) -> &'static str {
        Self::PLATFORM
    }

    async fn fetch_postings(
        &self,
        http: &HttpFetcher,
        query: &SearchQuery,
    ) -> Result<Vec<RawPosting>, AdapterError> {
        let urls = (0..query.max_pages)
            .map(|page| self.page_url(query, page))
            .collect();
        collect_pages(http, Self::PLATFORM, urls, |html| self.parse_page(html)).await
    }
}

pub struct IndeedAdapter {
    extractor: CardExtractor,
}

impl IndeedAdapter {
    pub const PLATFORM: &'static str = "Indeed";

    pub fn new() -> Self {
        Self {
            extractor: CardExtractor {
                base_url: "https://www.indeed.com",
                containers: SelectorChain::parse(&["div.job_seen_beacon", "div[data-jk]"]),
                link: SelectorChain::parse(&["h2.jobTitle a[href]", "a[data-jk][href]"]),
                title: SelectorChain::parse(&["h2.jobTitle", "span[id*=jobTitle]"]),
                company: SelectorChain::parse(&[
                    "span.companyName",
                    r#"span[data-testid="company-name"]"#,
                ]),
                location: SelectorChain::parse(&[
                    "div.companyLocation",
                    r#"div[data-testid="text-location"]"#,
                ]),
                experience: SelectorChain::parse(&[]),
                posted: SelectorChain::parse(&[
                    "span.date",
                    r#"span[data-testid="myJobsStateDate"]"#,
                ]),
                posted_attr: None,
            },
        }
    }

    fn page_url(&self, query: &SearchQuery, page: usize) -> String {
        format!(
            "https://www.indeed.com/jobs?q={}&l={}&start={}",
            encode(&query.keywords),
            encode(&query.location),
            page * 10
        )
    }

    pub fn parse_page(&self, html: &str) -> Vec<RawPosting> {
        self.extractor.parse_page(html, Self::PLATFORM)
    }
}

#[async_trait]
impl SourceAdapter for IndeedAdapter {
    fn platform(&self) -> &'static str {
        Self::PLATFORM
    }

    async fn fetch_postings(
        &self,
        http: &HttpFetcher,
        query: &SearchQuery,
    ) -> Result<Vec<RawPosting>, AdapterError> {
        let urls = (0..query.max_pages)
            .map(|page| self.page_url(query, page))
            .collect();
        collect_pages(http, Self::PLATFORM, urls, |html| self.parse_page(html)).await
    }
}

pub struct NaukriAdapter {
    extractor: CardExtractor,
}

impl NaukriAdapter {
    pub const PLATFORM: &'static str = "Naukri";

    pub fn new() -> Self {
        Self {
            extractor: CardExtractor {
                base_url: "https://www.naukri.com",
                containers: SelectorChain::parse(&[
                    "article.jobTuple",
                    "div.jobTuple",
                    "div.tuple",
                    "div.jobCard",
                ]),
                link: SelectorChain::parse(&[
                    "a.title",
                    "a.jobTupleHeader",
                    "a[data-ga-track]",
                    "a[href]",
                ]),
                title: SelectorChain::parse(&[]),
                company: SelectorChain::parse(&[
                    "a.subTitle",
                    "div.companyInfo",
                    "span.comp-name",
                ]),
                location: SelectorChain::parse(&[
                    "span.locWdth",
                    "li.location",
                    "span.location",
                ]),
                experience: SelectorChain::parse(&["span.expwdth", "li.experience", "span.exp"]),
                posted: SelectorChain::parse(&["span.date", "span.posted"]),
                posted_attr: None,
            },
        }
    }

    fn page_url(&self, query: &SearchQuery, page: usize) -> String {
        format!(
            "https://www.naukri.com/jobs-in-india?k={}&l={}&start={}",
            encode(&query.keywords),
            encode(&query.location),
            page * 20
        )
    }

    pub fn parse_page(&self, html: &str) -> Vec<RawPosting> {
        self.extractor.parse_page(html, Self::PLATFORM)
    }
}

#[async_trait]
impl SourceAdapter for NaukriAdapter {
    fn platform(&self) -> &'static str {
        Self::PLATFORM
    }

    async fn fetch_postings(
        &self,
        http: &HttpFetcher,
        query: &SearchQuery,
    ) -> Result<Vec<RawPosting>, AdapterError> {
        let urls = (0..query.max_pages)
            .map(|page| self.page_url(query, page))
            .collect();
        collect_pages(http, Self::PLATFORM, urls, |html| self.parse_page(html)).await
    }
}

impl Default for LinkedInAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for IndeedAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for NaukriAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Every adapter this build knows about, in cycle order.
pub fn default_adapters() -> Vec<Box<dyn SourceAdapter>> {
    vec![
        Box::new(LinkedInAdapter::new()),
        Box::new(IndeedAdapter::new()),
        Box::new(NaukriAdapter::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linkedin_parses_primary_markup() {
        let html = r#"
        <html><body>
          <div class="base-card">
            <h3 class="base-search-card__title">
              <a href="/jobs/view/123">Senior Rust Engineer</a>
            </h3>
            <h4 class="base-search-card__subtitle">Acme Corp</h4>
            <span class="job-search-card__location">Berlin, Germany</span>
            <time class="job-search-card__listdate" datetime="2026-08-01">4 days ago</time>
          </div>
        </body></html>
        "#;
        let postings = LinkedInAdapter::new().parse_page(html);
        assert_eq!(postings.len(), 1);
        let p = &postings[0];
        assert_eq!(p.title, "Senior Rust Engineer");
        assert_eq!(p.company, "Acme Corp");
        assert_eq!(p.location, "Berlin, Germany");
        assert_eq!(p.posted_date, "2026-08-01");
        assert_eq!(p.url, "https://www.linkedin.com/jobs/view/123");
        assert_eq!(p.experience_level, "");
        assert_eq!(p.job_type, "");
    }

    #[test]
    fn linkedin_falls_back_to_legacy_markup() {
        let html = r#"
        <html><body>
          <li class="result-card">
            <h3 class="result-card__title"><a href="https://example.com/j/9">Backend Dev</a></h3>
            <h4 class="result-card__subtitle">Globex</h4>
            <span class="result-card__location">Remote</span>
          </li>
        </body></html>
        "#;
        let postings = LinkedInAdapter::new().parse_page(html);
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].company, "Globex");
        assert_eq!(postings[0].url, "https://example.com/j/9");
        assert_eq!(postings[0].posted_date, "");
    }

    #[test]
    fn card_without_link_or_title_is_skipped() {
        let html = r#"
        <html><body>
          <div class="base-card"><h3>No link here</h3></div>
          <div class="base-card">
            <h3><a href="/jobs/view/7">Kept</a></h3>
          </div>
          <div class="base-card"><a href="/jobs/view/8"><img src="x.png"></a></div>
        </body></html>
        "#;
        let postings = LinkedInAdapter::new().parse_page(html);
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].title, "Kept");
        assert_eq!(postings[0].company, "Unknown");
    }

    #[test]
    fn indeed_parses_data_testid_fallbacks() {
        let html = r#"
        <html><body>
          <div class="job_seen_beacon">
            <h2 class="jobTitle"><a href="/rc/clk?jk=abc">Platform Engineer</a></h2>
            <span data-testid="company-name">Initech</span>
            <div data-testid="text-location">Austin, TX</div>
            <span data-testid="myJobsStateDate">Posted 3 days ago</span>
          </div>
        </body></html>
        "#;
        let postings = IndeedAdapter::new().parse_page(html);
        assert_eq!(postings.len(), 1);
        let p = &postings[0];
        assert_eq!(p.title, "Platform Engineer");
        assert_eq!(p.company, "Initech");
        assert_eq!(p.location, "Austin, TX");
        assert_eq!(p.posted_date, "Posted 3 days ago");
        assert_eq!(p.url, "https://www.indeed.com/rc/clk?jk=abc");
    }

    #[test]
    fn naukri_extracts_experience_level() {
        let html = r#"
        <html><body>
          <article class="jobTuple">
            <a class="title" href="https://www.naukri.com/job/42">Data Engineer</a>
            <a class="subTitle">Wipro</a>
            <span class="locWdth">Bengaluru</span>
            <span class="expwdth">3-5 Yrs</span>
            <span class="posted">2 days ago</span>
          </article>
        </body></html>
        "#;
        let postings = NaukriAdapter::new().parse_page(html);
        assert_eq!(postings.len(), 1);
        let p = &postings[0];
        assert_eq!(p.title, "Data Engineer");
        assert_eq!(p.company, "Wipro");
        assert_eq!(p.experience_level, "3-5 Yrs");
        assert_eq!(p.posted_date, "2 days ago");
    }

    #[test]
    fn page_with_no_recognized_containers_yields_nothing() {
        let postings = NaukriAdapter::new().parse_page("<html><body><p>maintenance</p></body></html>");
        assert!(postings.is_empty());
    }

    #[test]
    fn page_urls_encode_query_and_stride_per_site() {
        let query = SearchQuery {
            keywords: "rust developer".into(),
            location: "New York".into(),
            max_pages: 3,
        };
        assert_eq!(
            LinkedInAdapter::new().page_url(&query, 2),
            "https://www.linkedin.com/jobs/search/?keywords=rust%20developer&location=New%20York&start=50"
        );
        assert_eq!(
            IndeedAdapter::new().page_url(&query, 2),
            "https://www.indeed.com/jobs?q=rust%20developer&l=New%20York&start=20"
        );
        assert_eq!(
            NaukriAdapter::new().page_url(&query, 2),
            "https://www.naukri.com/jobs-in-india?k=rust%20developer&l=New%20York&start=40"
        );
    }

    #[test]
    fn default_adapters_cover_three_platforms() {
        let adapters = default_adapters();
        let platforms: Vec<_> = adapters.iter().map(|a| a.platform()).collect();
        assert_eq!(platforms, vec!["LinkedIn", "Indeed", "Naukri"]);
    }
}
