use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::info;

use crate::parser::segment::{SectionContent, SectionName};
use crate::store::{self, Report, Template};

/// Sections guaranteed in every template regardless of observed frequency,
/// so downstream consumers always see a stable schema.
const CRITICAL_SECTIONS: [SectionName; 4] = SectionName::ALL;

#[derive(Debug, Clone, Copy)]
pub struct TemplateConfig {
    /// Fraction of a type group that must have non-empty content for a
    /// section to count as common.
    pub min_fraction: f64,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self { min_fraction: 0.5 }
    }
}

/// Derive one template per observed report type. Reports typed "Unknown"
/// form their own group and still get a template.
pub fn build_templates(reports: &[Report], config: &TemplateConfig) -> Result<Vec<Template>> {
    if !(0.0..=1.0).contains(&config.min_fraction) {
        bail!(
            "min_fraction must be within [0, 1], got {}",
            config.min_fraction
        );
    }
    for report in reports {
        report.validate()?;
    }

    let mut groups: BTreeMap<&str, Vec<&Report>> = BTreeMap::new();
    for report in reports {
        groups.entry(&report.report_type).or_default().push(report);
    }

    let mut templates = Vec::with_capacity(groups.len());
    for (report_type, group) in groups {
        let mut sections = SectionContent::new();
        for section in SectionName::ALL {
            let count = group
                .iter()
                .filter(|r| r.content.get(&section).is_some_and(|t| !t.is_empty()))
                .count();
            let common = count as f64 >= config.min_fraction * group.len() as f64;
            if common || CRITICAL_SECTIONS.contains(&section) {
                sections.insert(section, String::new());
            }
        }
        templates.push(Template {
            report_type: report_type.to_string(),
            // Left blank for a later generation step.
            title: String::new(),
            sections,
        });
    }
    Ok(templates)
}

/// Write each template to `<dir>/<sanitized type>.json`.
pub fn save_templates(dir: &Path, templates: &[Template]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(templates.len());
    for template in templates {
        let path = dir.join(format!("{}.json", sanitize_type_name(&template.report_type)));
        store::write_json(&path, template)?;
        info!("Created template for {}: {}", template.report_type, path.display());
        paths.push(path);
    }
    Ok(paths)
}

/// Filesystem-safe token for a type label: accented characters folded to
/// ASCII, everything outside [a-z0-9._-] collapsed to single underscores.
pub fn sanitize_type_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars().flat_map(fold_ascii) {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
            out.push(c);
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}

fn fold_ascii(c: char) -> Option<char> {
    if c.is_ascii() {
        return Some(c);
    }
    Some(match c {
        'à' | 'â' | 'ä' | 'À' | 'Â' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'î' | 'ï' | 'Î' | 'Ï' => 'i',
        'ô' | 'ö' | 'Ô' | 'Ö' => 'o',
        'ù' | 'û' | 'ü' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        _ => return None,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::segment::empty_content;

    fn report(report_type: &str, filled: &[SectionName]) -> Report {
        let mut content = empty_content();
        for &section in filled {
            content.insert(section, "du texte de section non vide".to_string());
        }
        Report {
            title: format!("IRM {}", report_type),
            url: "https://www.radrap.ch/comptesrendus/1".to_string(),
            report_type: report_type.to_string(),
            content,
        }
    }

    #[test]
    fn common_section_above_threshold() {
        // 7 of 10 MSK reports have Résultat, threshold 0.5 → present.
        let mut reports: Vec<Report> = (0..7)
            .map(|_| report("MSK", &[SectionName::Resultat]))
            .collect();
        reports.extend((0..3).map(|_| report("MSK", &[])));
        let templates =
            build_templates(&reports, &TemplateConfig { min_fraction: 0.5 }).unwrap();
        assert_eq!(templates.len(), 1);
        assert!(templates[0].sections.contains_key(&SectionName::Resultat));
    }

    #[test]
    fn critical_sections_forced_regardless_of_threshold() {
        // At 0.8 the 7/10 count fails the frequency rule; Résultat stays
        // only because every canonical section is forced.
        let mut reports: Vec<Report> = (0..7)
            .map(|_| report("MSK", &[SectionName::Resultat]))
            .collect();
        reports.extend((0..3).map(|_| report("MSK", &[])));
        let templates =
            build_templates(&reports, &TemplateConfig { min_fraction: 0.8 }).unwrap();
        let sections = &templates[0].sections;
        assert!(sections.contains_key(&SectionName::Resultat));
        assert_eq!(sections.len(), 4);
        assert!(sections.values().all(|v| v.is_empty()));
    }

    #[test]
    fn one_template_per_type_including_unknown() {
        let reports = vec![
            report("MSK", &[SectionName::Conclusion]),
            report("Neuro-ORL", &[SectionName::Conclusion]),
            report("Unknown", &[SectionName::Conclusion]),
        ];
        let templates = build_templates(&reports, &TemplateConfig::default()).unwrap();
        let types: Vec<&str> = templates.iter().map(|t| t.report_type.as_str()).collect();
        assert_eq!(types, vec!["MSK", "Neuro-ORL", "Unknown"]);
        assert!(templates.iter().all(|t| t.title.is_empty()));
    }

    #[test]
    fn malformed_report_fails_fast() {
        let mut bad = report("MSK", &[]);
        bad.content.remove(&SectionName::Technique);
        let err = build_templates(&[bad], &TemplateConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Technique"));
    }

    #[test]
    fn min_fraction_out_of_range_is_rejected() {
        let err =
            build_templates(&[], &TemplateConfig { min_fraction: 1.5 }).unwrap_err();
        assert!(err.to_string().contains("min_fraction"));
    }

    #[test]
    fn sanitize_folds_accents_and_punctuation() {
        assert_eq!(sanitize_type_name("Pelvis (féminin)"), "pelvis_feminin");
        assert_eq!(sanitize_type_name("Neuro-ORL"), "neuro-orl");
        assert_eq!(sanitize_type_name("MSK"), "msk");
        let token = sanitize_type_name("Pelvis (féminin)");
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')));
    }

    #[test]
    fn templates_written_to_sanitized_paths() {
        let dir = tempfile::tempdir().unwrap();
        let templates = build_templates(
            &[report("Pelvis (féminin)", &[SectionName::Conclusion])],
            &TemplateConfig::default(),
        )
        .unwrap();
        let paths = save_templates(dir.path(), &templates).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].ends_with("pelvis_feminin.json"));
        assert!(paths[0].exists());
    }
}
