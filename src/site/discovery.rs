//! Sitemap discovery
//!
//! Sitemap candidates come from `Sitemap:` lines in robots.txt followed by a
//! fixed list of well-known paths. Sitemap indexes are followed breadth-first.
//!
//! When a sitemap answered but listed no pages (empty, or not sitemap XML at
//! all), same-site links are followed from the base URL instead, up to
//! [`FALLBACK_MAX_DEPTH`] hops and [`FALLBACK_MAX_PAGES`] pages.

use std::collections::{HashSet, VecDeque};
use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::Event;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::error::CrawlError;
use crate::extractor::selector;
use crate::fetcher::Fetcher;

/// Paths probed after the robots.txt entries
pub const WELL_KNOWN_SITEMAP_PATHS: &[&str] = &[
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemaps/sitemap.xml",
    "/sitemap1.xml",
];

/// Upper bound on sitemap documents fetched during one discovery
const MAX_SITEMAP_FETCHES: usize = 100;

/// Pages the link fallback may discover, further capped by `max_pages`
pub const FALLBACK_MAX_PAGES: usize = 50;

/// Link hops the fallback follows from the base URL
pub const FALLBACK_MAX_DEPTH: usize = 2;

/// Upper bound on pages fetched by the link fallback, failures included
const FALLBACK_MAX_FETCHES: usize = 100;

static LINKS: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));

/// Pages found for a site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Sitemaps that were fetched and parsed, in processing order
    pub sitemaps_found: Vec<String>,

    /// Unique page URLs in discovery order, capped at `max_pages`
    pub page_urls: Vec<String>,

    /// Unique page URLs found beyond the cap
    pub pages_skipped: usize,

    /// Pages came from following links rather than from a sitemap
    pub link_fallback: bool,
}

#[derive(Debug, Deserialize)]
struct SitemapDocument {
    #[serde(rename = "url", default)]
    urls: Vec<Entry>,

    #[serde(rename = "sitemap", default)]
    sitemaps: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    loc: Option<String>,
}

/// Locations listed by one sitemap document
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SitemapEntries {
    /// `<url><loc>` entries
    pub pages: Vec<String>,

    /// `<sitemap><loc>` entries of a sitemap index
    pub nested: Vec<String>,
}

/// Origin (`scheme://host[:port]`) of a URL
pub fn site_root(base: &Url) -> String {
    base.origin().ascii_serialization()
}

/// `Sitemap:` values from a robots.txt body. The directive is matched case
/// insensitively; values keep their case.
pub fn robots_sitemaps(robots_txt: &str) -> Vec<String> {
    robots_txt
        .lines()
        .filter_map(|line| {
            let (directive, value) = line.trim().split_once(':')?;
            if !directive.trim().eq_ignore_ascii_case("sitemap") {
                return None;
            }
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        })
        .collect()
}

/// Candidate sitemap URLs in probe order, without duplicates
pub fn sitemap_candidates(root: &str, from_robots: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    from_robots
        .into_iter()
        .chain(
            WELL_KNOWN_SITEMAP_PATHS
                .iter()
                .map(|path| format!("{}{}", root, path)),
        )
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Local name of the document element, if the text is XML at all
fn root_element(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Parse a `urlset` or `sitemapindex` document.
///
/// Returns `None` for anything else, including HTML error pages served with a
/// success status.
pub fn parse_sitemap(xml: &str, sitemap_url: &str) -> Option<SitemapEntries> {
    let root = root_element(xml)?;
    if root != "urlset" && root != "sitemapindex" {
        debug!(root = %root, "Not a sitemap document: {}", sitemap_url);
        return None;
    }

    let document: SitemapDocument = match quick_xml::de::from_str(xml) {
        Ok(document) => document,
        Err(e) => {
            warn!(error = %e, "Failed to parse sitemap {}", sitemap_url);
            return None;
        }
    };

    let base = Url::parse(sitemap_url).ok();
    let resolve = |entries: Vec<Entry>| -> Vec<String> {
        entries
            .into_iter()
            .filter_map(|entry| entry.loc)
            .map(|loc| loc.trim().to_string())
            .filter(|loc| !loc.is_empty())
            .map(|loc| match &base {
                Some(base) => base.join(&loc).map(String::from).unwrap_or(loc),
                None => loc,
            })
            .collect()
    };

    Some(SitemapEntries {
        pages: resolve(document.urls),
        nested: resolve(document.sitemaps),
    })
}

/// Page entries that are really sitemaps
fn looks_like_sitemap(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.ends_with(".xml") && lower.contains("sitemap")
}

/// Discover up to `max_pages` page URLs for the site of `base`
#[instrument(skip(fetcher, base), fields(base = %base))]
pub async fn discover(
    fetcher: &Fetcher,
    base: &Url,
    max_pages: usize,
) -> Result<Discovery, CrawlError> {
    let root = site_root(base);

    let from_robots = match fetcher.fetch(&format!("{}/robots.txt", root)).await {
        Ok(page) => robots_sitemaps(&page.body),
        Err(e) => {
            debug!(error = %e, "No usable robots.txt");
            Vec::new()
        }
    };
    debug!(count = from_robots.len(), "Sitemaps listed in robots.txt");

    let mut queue: VecDeque<String> = sitemap_candidates(&root, from_robots).into();
    let mut visited = HashSet::new();
    let mut seen_pages = HashSet::new();
    let mut discovery = Discovery::default();
    let mut answered = false;

    while let Some(sitemap_url) = queue.pop_front() {
        if !visited.insert(sitemap_url.clone()) {
            continue;
        }
        if visited.len() > MAX_SITEMAP_FETCHES {
            warn!("Sitemap fetch limit reached, ignoring remaining sitemaps");
            break;
        }

        let body = match fetcher.fetch(&sitemap_url).await {
            Ok(page) => page.body,
            Err(e) => {
                debug!(error = %e, "Sitemap candidate unavailable: {}", sitemap_url);
                continue;
            }
        };
        answered = true;
        let Some(entries) = parse_sitemap(&body, &sitemap_url) else {
            continue;
        };

        debug!(
            pages = entries.pages.len(),
            nested = entries.nested.len(),
            "Parsed sitemap {}",
            sitemap_url
        );
        discovery.sitemaps_found.push(sitemap_url);
        queue.extend(entries.nested);

        for url in entries.pages {
            if looks_like_sitemap(&url) {
                queue.push_back(url);
            } else if seen_pages.insert(url.clone()) {
                if discovery.page_urls.len() < max_pages {
                    discovery.page_urls.push(url);
                } else {
                    discovery.pages_skipped += 1;
                }
            }
        }
    }

    if !answered {
        return Err(CrawlError::NoSitemap(root));
    }
    if discovery.page_urls.is_empty() && discovery.pages_skipped == 0 {
        info!("Sitemaps list no pages, following links from {}", base);
        discovery.page_urls = follow_links(fetcher, base, FALLBACK_MAX_PAGES.min(max_pages)).await;
        discovery.link_fallback = true;
    }
    if discovery.page_urls.is_empty() && discovery.pages_skipped == 0 {
        return Err(CrawlError::NoPages(root));
    }

    info!(
        sitemaps = discovery.sitemaps_found.len(),
        pages = discovery.page_urls.len(),
        skipped = discovery.pages_skipped,
        link_fallback = discovery.link_fallback,
        "Discovery complete"
    );
    Ok(discovery)
}

fn same_site(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.port() == b.port()
}

/// Absolute http(s) targets of the `<a href>` links in a page, fragments
/// removed
pub fn page_links(html: &str, page_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    document
        .select(&LINKS)
        .filter_map(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|href| {
            !href.is_empty()
                && !href.starts_with('#')
                && !href.starts_with("javascript:")
                && !href.starts_with("mailto:")
                && !href.starts_with("tel:")
        })
        .filter_map(|href| page_url.join(href).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|mut url| {
            url.set_fragment(None);
            url
        })
        .collect()
}

/// Breadth-first walk over same-site links starting at `start`.
///
/// Returns the final URLs of pages that fetched successfully, at most `limit`
/// of them, in the order they were reached.
#[instrument(skip(fetcher, start), fields(start = %start))]
pub async fn follow_links(fetcher: &Fetcher, start: &Url, limit: usize) -> Vec<String> {
    let mut start = start.clone();
    start.set_fragment(None);

    let mut queue = VecDeque::from([(start.clone(), 0)]);
    let mut queued = HashSet::from([start.to_string()]);
    let mut found = Vec::new();
    let mut fetches = 0;

    while let Some((url, depth)) = queue.pop_front() {
        if found.len() >= limit || fetches >= FALLBACK_MAX_FETCHES {
            break;
        }
        fetches += 1;

        let page = match fetcher.fetch(url.as_str()).await {
            Ok(page) => page,
            Err(e) => {
                debug!(error = %e, "Skipping unreachable link {}", url);
                continue;
            }
        };
        if !found.contains(&page.url) {
            found.push(page.url.clone());
        }
        if depth >= FALLBACK_MAX_DEPTH {
            continue;
        }

        let Ok(page_url) = Url::parse(&page.url) else {
            continue;
        };
        for link in page_links(&page.body, &page_url) {
            if same_site(&link, &start) && queued.insert(link.to_string()) {
                queue.push_back((link, depth + 1));
            }
        }
    }

    debug!(pages = found.len(), fetches, "Link fallback finished");
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::time::Duration;

    #[test]
    fn test_robots_sitemaps() {
        let robots = "User-agent: *\nDisallow: /admin\nSITEMAP: https://Example.com/Site-Map.xml\n\
                      sitemap:https://example.com/other.xml\nSitemap:   \n";
        assert_eq!(
            robots_sitemaps(robots),
            vec![
                "https://Example.com/Site-Map.xml",
                "https://example.com/other.xml"
            ]
        );
    }

    #[test]
    fn test_candidates_are_deduplicated() {
        let candidates = sitemap_candidates(
            "https://example.com",
            vec!["https://example.com/sitemap.xml".to_string()],
        );
        assert_eq!(
            candidates,
            vec![
                "https://example.com/sitemap.xml",
                "https://example.com/sitemap_index.xml",
                "https://example.com/sitemaps/sitemap.xml",
                "https://example.com/sitemap1.xml",
            ]
        );
    }

    #[test]
    fn test_parse_namespaced_urlset() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/a</loc><lastmod>2024-01-01</lastmod></url>
  <url><loc> https://example.com/b </loc></url>
</urlset>"#;
        let entries = parse_sitemap(xml, "https://example.com/sitemap.xml").unwrap();
        assert_eq!(entries.pages, vec!["https://example.com/a", "https://example.com/b"]);
        assert!(entries.nested.is_empty());
    }

    #[test]
    fn test_parse_sitemap_index() {
        let xml = r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://example.com/posts.xml</loc></sitemap>
  <sitemap><loc>/pages.xml</loc></sitemap>
</sitemapindex>"#;
        let entries = parse_sitemap(xml, "https://example.com/sitemap_index.xml").unwrap();
        assert!(entries.pages.is_empty());
        assert_eq!(
            entries.nested,
            vec!["https://example.com/posts.xml", "https://example.com/pages.xml"]
        );
    }

    #[test]
    fn test_html_is_not_a_sitemap() {
        assert!(parse_sitemap("<!DOCTYPE html><html><body>Not found</body></html>", "https://e.com/sitemap.xml").is_none());
        assert!(parse_sitemap("plain text", "https://e.com/sitemap.xml").is_none());
    }

    fn fetcher() -> Fetcher {
        Fetcher::new(Duration::from_secs(5), "seoscope-test").unwrap()
    }

    #[tokio::test]
    async fn test_discover_follows_robots_and_nested_indexes() {
        let mut server = Server::new_async().await;
        let root = server.url();

        let _robots = server
            .mock("GET", "/robots.txt")
            .with_body(format!("User-agent: *\nSitemap: {}/index.xml\n", root))
            .create_async()
            .await;
        let _index = server
            .mock("GET", "/index.xml")
            .with_body(format!(
                "<sitemapindex><sitemap><loc>{root}/pages.xml</loc></sitemap></sitemapindex>"
            ))
            .create_async()
            .await;
        let _pages = server
            .mock("GET", "/pages.xml")
            .with_body(format!(
                "<urlset><url><loc>{root}/a</loc></url><url><loc>{root}/b</loc></url>\
                 <url><loc>{root}/a</loc></url><url><loc>{root}/c</loc></url></urlset>"
            ))
            .create_async()
            .await;

        let base = Url::parse(&root).unwrap();
        let discovery = discover(&fetcher(), &base, 2).await.unwrap();

        assert_eq!(
            discovery.sitemaps_found,
            vec![format!("{root}/index.xml"), format!("{root}/pages.xml")]
        );
        assert_eq!(discovery.page_urls, vec![format!("{root}/a"), format!("{root}/b")]);
        assert_eq!(discovery.pages_skipped, 1);
    }

    #[tokio::test]
    async fn test_discover_without_sitemaps() {
        // Unmatched requests get mockito's 501 response
        let server = Server::new_async().await;

        let base = Url::parse(&server.url()).unwrap();
        let result = discover(&fetcher(), &base, 10).await;
        assert!(matches!(result, Err(CrawlError::NoSitemap(_))));
    }

    #[test]
    fn test_page_links() {
        let page = Url::parse("https://example.com/blog/").unwrap();
        let html = r##"<a href="post#comments">Post</a>
            <a href="/about">About</a>
            <a href="#top">Top</a>
            <a href="mailto:me@example.com">Mail</a>
            <a href="javascript:void(0)">JS</a>
            <a href="ftp://example.com/file">FTP</a>
            <a href="https://other.org/x">Other</a>"##;

        let links: Vec<String> = page_links(html, &page).into_iter().map(String::from).collect();
        assert_eq!(
            links,
            vec![
                "https://example.com/blog/post",
                "https://example.com/about",
                "https://other.org/x"
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_sitemap_falls_back_to_links() {
        let mut server = Server::new_async().await;
        let root = server.url();

        let _sitemap = server
            .mock("GET", "/sitemap.xml")
            .with_body("<urlset></urlset>")
            .create_async()
            .await;
        let _home = server
            .mock("GET", "/")
            .with_body(
                "<a href='/a#intro'>A</a><a href='/b'>B</a>\
                 <a href='https://elsewhere.example/x'>X</a>",
            )
            .create_async()
            .await;
        let _a = server
            .mock("GET", "/a")
            .with_body("<a href='/'>Home</a><a href='/deep'>Deep</a>")
            .create_async()
            .await;
        let _b = server
            .mock("GET", "/b")
            .with_body("<p>leaf</p>")
            .create_async()
            .await;
        let _deep = server
            .mock("GET", "/deep")
            .with_body("<a href='/deeper'>Deeper</a>")
            .create_async()
            .await;
        let deeper = server
            .mock("GET", "/deeper")
            .with_body("<p>too far</p>")
            .expect(0)
            .create_async()
            .await;

        let base = Url::parse(&root).unwrap();
        let discovery = discover(&fetcher(), &base, 10).await.unwrap();

        assert!(discovery.link_fallback);
        assert_eq!(discovery.sitemaps_found, vec![format!("{root}/sitemap.xml")]);
        assert_eq!(
            discovery.page_urls,
            vec![
                format!("{root}/"),
                format!("{root}/a"),
                format!("{root}/b"),
                format!("{root}/deep")
            ]
        );
        deeper.assert_async().await;
    }

    #[tokio::test]
    async fn test_link_fallback_respects_page_cap() {
        let mut server = Server::new_async().await;
        let root = server.url();

        let _sitemap = server
            .mock("GET", "/sitemap.xml")
            .with_body("<html><body>Not a sitemap</body></html>")
            .create_async()
            .await;
        let _home = server
            .mock("GET", "/")
            .with_body("<a href='/a'>A</a><a href='/b'>B</a><a href='/c'>C</a>")
            .create_async()
            .await;
        let _a = server
            .mock("GET", "/a")
            .with_body("<p>a</p>")
            .create_async()
            .await;

        let base = Url::parse(&root).unwrap();
        let discovery = discover(&fetcher(), &base, 2).await.unwrap();

        assert!(discovery.link_fallback);
        assert!(discovery.sitemaps_found.is_empty());
        assert_eq!(discovery.page_urls, vec![format!("{root}/"), format!("{root}/a")]);
    }

    #[tokio::test]
    async fn test_discover_empty_sitemap_and_no_links() {
        let mut server = Server::new_async().await;
        let _sitemap = server
            .mock("GET", "/sitemap.xml")
            .with_body("<urlset></urlset>")
            .create_async()
            .await;

        let base = Url::parse(&server.url()).unwrap();
        let result = discover(&fetcher(), &base, 10).await;
        assert!(matches!(result, Err(CrawlError::NoPages(_))));
    }
}
