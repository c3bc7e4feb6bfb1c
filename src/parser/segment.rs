use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;
use regex::{Regex, RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};

/// The four clinical sections of a report, in canonical order.
/// Ordering is significant: when a line matches more than one header
/// pattern, the first section in this order wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SectionName {
    Indication,
    Technique,
    #[serde(rename = "Résultat")]
    Resultat,
    Conclusion,
}

impl SectionName {
    pub const ALL: [SectionName; 4] = [
        SectionName::Indication,
        SectionName::Technique,
        SectionName::Resultat,
        SectionName::Conclusion,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SectionName::Indication => "Indication",
            SectionName::Technique => "Technique",
            SectionName::Resultat => "Résultat",
            SectionName::Conclusion => "Conclusion",
        }
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Section name → reconstructed text. Always carries all four keys,
/// empty string when the section was not found.
pub type SectionContent = BTreeMap<SectionName, String>;

pub fn empty_content() -> SectionContent {
    SectionName::ALL.iter().map(|&s| (s, String::new())).collect()
}

pub fn has_content(content: &SectionContent) -> bool {
    content.values().any(|v| !v.is_empty())
}

/// How a line is recognized as a section header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// `Section:` (optional leading `#`) at the start of the line.
    HeaderPrefix,
    /// Section name anywhere in the line.
    Loose,
}

/// Boilerplate patterns from the site: nav labels, author/copyright
/// strings, date stamps, UI action labels. Compiled case-insensitively.
pub fn default_denylist() -> Vec<&'static str> {
    vec![
        "rad rap",
        "accueil",
        "comptes rendus",
        "blog",
        "contact",
        "nicolas villard",
        r"\d{2}/\d{2}/\d{4}",
        "copier",
        "presse-papiers",
        "clipboard",
    ]
}

/// Splits the flat text lines of a report page into the four clinical
/// sections. Pure and synchronous; the denylist and matching strategy
/// are injected so tests run against fixtures instead of live pages.
pub struct Segmenter {
    headers: Vec<(SectionName, Regex)>,
    denylist: RegexSet,
}

impl Segmenter {
    pub fn new(strategy: MatchStrategy, denylist: &[&str]) -> Result<Self> {
        let headers = SectionName::ALL
            .iter()
            .map(|&section| {
                let name = section.label();
                let pattern = match strategy {
                    MatchStrategy::HeaderPrefix => {
                        format!(r"(?i)^(?:#\s*)?{name}\s*:\s*|^#\s*{name}\s*$")
                    }
                    MatchStrategy::Loose => format!(r"(?i){name}\s*:?\s*"),
                };
                Ok((section, Regex::new(&pattern)?))
            })
            .collect::<Result<Vec<_>>>()?;
        let denylist = RegexSetBuilder::new(denylist)
            .case_insensitive(true)
            .build()?;
        Ok(Self { headers, denylist })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(MatchStrategy::HeaderPrefix, &default_denylist())
    }

    /// Scan the lines and reconstruct each section's text.
    /// Returns all four sections; every one may be empty (total failure),
    /// in which case the caller should discard the page.
    pub fn segment<'a, I>(&self, lines: I) -> SectionContent
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut parts: BTreeMap<SectionName, Vec<String>> =
            SectionName::ALL.iter().map(|&s| (s, Vec::new())).collect();
        let mut current: Option<SectionName> = None;

        for raw in lines {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if let Some((section, residue)) = self.match_header(line) {
                current = Some(section);
                if !residue.is_empty() {
                    parts.get_mut(&section).unwrap().push(residue);
                }
                continue;
            }

            if let Some(section) = current {
                if self.denylist.is_match(line) {
                    // Boilerplate closes the open section so trailing nav,
                    // author and date lines never leak into it.
                    current = None;
                } else {
                    parts.get_mut(&section).unwrap().push(line.to_string());
                }
            }
        }

        let mut content = empty_content();
        for (section, fragments) in parts {
            let text = fragments.join(" ").trim().to_string();
            if text.is_empty()
                || text.split_whitespace().count() < 3
                || self.denylist.is_match(&text)
            {
                continue;
            }
            content.insert(section, text);
        }
        content
    }

    /// Match a line against the header patterns in canonical order.
    /// Returns the section and the line with the header text stripped.
    fn match_header(&self, line: &str) -> Option<(SectionName, String)> {
        for (section, re) in &self.headers {
            if let Some(m) = re.find(line) {
                let before = line[..m.start()].trim();
                let after = line[m.end()..].trim();
                let residue = if before.is_empty() {
                    after.to_string()
                } else if after.is_empty() {
                    before.to_string()
                } else {
                    format!("{} {}", before, after)
                };
                return Some((*section, residue));
            }
        }
        None
    }
}

// ── Tests ──
