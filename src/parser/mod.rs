pub mod classify;
pub mod html;
pub mod segment;

use crate::store::Report;
use segment::Segmenter;

/// Three-pass pipeline: html → text lines → segmented sections → Report.
/// Returns None when no section yields usable text (the page is skipped,
/// not an error).
pub fn process_page(segmenter: &Segmenter, url: &str, body: &str) -> Option<Report> {
    let page = html::extract_page_text(body, url);
    let content = segmenter.segment(page.lines.iter().map(String::as_str));
    if !segment::has_content(&content) {
        return None;
    }
    let report_type = classify::classify(page.breadcrumb.as_deref(), &page.title);
    Some(Report {
        title: page.title,
        url: url.to_string(),
        report_type: report_type.label().to_string(),
        content,
    })
}
