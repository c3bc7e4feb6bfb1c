use std::fmt;

use serde::{Deserialize, Serialize};

/// Anatomical report categories. Labels are the serialized form and the
/// strings matched against the page breadcrumb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReportType {
    #[serde(rename = "Neuro-ORL")]
    NeuroOrl,
    Abdomen,
    #[serde(rename = "Pelvis (féminin)")]
    PelvisFeminin,
    #[serde(rename = "Pelvis (masculin)")]
    PelvisMasculin,
    #[serde(rename = "MSK")]
    Msk,
    Unknown,
}

impl ReportType {
    /// Every category a breadcrumb can name (Unknown is a fallback, never
    /// a page label).
    pub const KNOWN: [ReportType; 5] = [
        ReportType::NeuroOrl,
        ReportType::Abdomen,
        ReportType::PelvisFeminin,
        ReportType::PelvisMasculin,
        ReportType::Msk,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ReportType::NeuroOrl => "Neuro-ORL",
            ReportType::Abdomen => "Abdomen",
            ReportType::PelvisFeminin => "Pelvis (féminin)",
            ReportType::PelvisMasculin => "Pelvis (masculin)",
            ReportType::Msk => "MSK",
            ReportType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const NEURO_KEYWORDS: &[&str] = &["neuro", "cérébrale", "crânienne"];
const ABDOMEN_KEYWORDS: &[&str] = &["abdomen", "abdominale"];
const PELVIS_KEYWORDS: &[&str] = &["pelvis", "pelvien"];
const MSK_KEYWORDS: &[&str] = &["musculo", "squelettique", "genou", "épaule"];

/// Determine the report category. Precedence: exact known label in the
/// active breadcrumb, then title keywords, then Unknown. First matching
/// rule wins; later rules are not evaluated.
pub fn classify(breadcrumb: Option<&str>, title: &str) -> ReportType {
    if let Some(crumb) = breadcrumb {
        let crumb = crumb.trim();
        for t in ReportType::KNOWN {
            if crumb.contains(t.label()) {
                return t;
            }
        }
    }

    let title = title.to_lowercase();
    let hit = |keywords: &[&str]| keywords.iter().any(|k| title.contains(k));

    if hit(NEURO_KEYWORDS) {
        ReportType::NeuroOrl
    } else if hit(ABDOMEN_KEYWORDS) {
        ReportType::Abdomen
    } else if hit(PELVIS_KEYWORDS) {
        // féminin is the default when the title does not disambiguate
        if title.contains("masculin") {
            ReportType::PelvisMasculin
        } else {
            ReportType::PelvisFeminin
        }
    } else if hit(MSK_KEYWORDS) {
        ReportType::Msk
    } else {
        ReportType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breadcrumb_takes_precedence_over_title() {
        // Title says genou (MSK) but the breadcrumb names the category.
        let t = classify(Some("Comptes rendus › Abdomen"), "IRM du genou");
        assert_eq!(t, ReportType::Abdomen);
    }

    #[test]
    fn breadcrumb_exact_label_only() {
        // Unlabeled breadcrumb falls through to the title.
        let t = classify(Some("Comptes rendus"), "IRM cérébrale");
        assert_eq!(t, ReportType::NeuroOrl);
    }

    #[test]
    fn title_keywords() {
        assert_eq!(classify(None, "IRM cérébrale (générique)"), ReportType::NeuroOrl);
        assert_eq!(classify(None, "IRM crânienne"), ReportType::NeuroOrl);
        assert_eq!(classify(None, "IRM abdominale"), ReportType::Abdomen);
        assert_eq!(classify(None, "IRM du genou"), ReportType::Msk);
        assert_eq!(classify(None, "IRM de l'épaule"), ReportType::Msk);
    }

    #[test]
    fn pelvis_defaults_to_feminin() {
        assert_eq!(classify(None, "IRM du pelvis"), ReportType::PelvisFeminin);
        assert_eq!(
            classify(None, "IRM du pelvis masculin"),
            ReportType::PelvisMasculin
        );
        assert_eq!(
            classify(None, "IRM pelvienne (féminin)"),
            ReportType::PelvisFeminin
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(classify(None, "IRM CÉRÉBRALE"), ReportType::NeuroOrl);
    }

    #[test]
    fn unknown_when_nothing_matches() {
        assert_eq!(classify(None, "IRM Report 170"), ReportType::Unknown);
        assert_eq!(classify(Some("Comptes rendus"), ""), ReportType::Unknown);
    }
}
