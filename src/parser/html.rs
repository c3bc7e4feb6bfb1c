use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

static REPORT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"comptesrendus/(\d+)").unwrap());
static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static SUBTITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2").unwrap());
static DOC_TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static BREADCRUMB_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".breadcrumb .active, .breadcrumb-item.active").unwrap());
static BODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div, p, h1, h2, h3, h4").unwrap());

/// Flat text view of a report page: title, active breadcrumb entry, and
/// one line per text-bearing element in document order.
pub struct PageText {
    pub title: String,
    pub breadcrumb: Option<String>,
    pub lines: Vec<String>,
}

pub fn extract_page_text(html: &str, url: &str) -> PageText {
    let doc = Html::parse_document(html);

    let title = [&*TITLE_SEL, &*SUBTITLE_SEL, &*DOC_TITLE_SEL]
        .into_iter()
        .find_map(|sel| {
            doc.select(sel)
                .map(element_text)
                .find(|t| !t.is_empty())
        })
        .filter(|t| !t.to_lowercase().contains("rad rap"))
        .unwrap_or_else(|| fallback_title(url));

    let breadcrumb = doc
        .select(&BREADCRUMB_SEL)
        .map(element_text)
        .find(|t| !t.is_empty());

    let lines = doc
        .select(&BODY_SEL)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();

    PageText {
        title,
        breadcrumb,
        lines,
    }
}

/// "IRM Report <id>" from the comptesrendus/<id> URL path, used when the
/// page title is missing or is just the site name.
fn fallback_title(url: &str) -> String {
    let id = REPORT_ID_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or("Unknown");
    format!("IRM Report {}", id)
}

fn element_text(el: scraper::ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> String {
        std::fs::read_to_string("tests/fixtures/irm_cerebrale.html").unwrap()
    }

    #[test]
    fn title_from_h1() {
        let page = extract_page_text(&fixture(), "https://www.radrap.ch/comptesrendus/170");
        assert_eq!(page.title, "IRM cérébrale");
    }

    #[test]
    fn breadcrumb_active_entry() {
        let page = extract_page_text(&fixture(), "https://www.radrap.ch/comptesrendus/170");
        assert_eq!(page.breadcrumb.as_deref(), Some("Neuro-ORL"));
    }

    #[test]
    fn body_lines_keep_section_headers() {
        let page = extract_page_text(&fixture(), "https://www.radrap.ch/comptesrendus/170");
        assert!(page.lines.iter().any(|l| l.starts_with("Indication:")));
        assert!(page.lines.iter().any(|l| l.starts_with("Conclusion:")));
    }

    #[test]
    fn site_name_title_falls_back_to_url_id() {
        let html = "<html><head><title>Rad Rap</title></head><body><p>x</p></body></html>";
        let page = extract_page_text(html, "https://www.radrap.ch/comptesrendus/191");
        assert_eq!(page.title, "IRM Report 191");
    }

    #[test]
    fn missing_title_and_id() {
        let page = extract_page_text("<html><body></body></html>", "https://example.org/");
        assert_eq!(page.title, "IRM Report Unknown");
        assert!(page.breadcrumb.is_none());
    }
}
