use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rand::seq::SliceRandom;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::parser::segment::{SectionContent, SectionName};

/// A segmented report. `content` always carries all four section keys,
/// empty string when the section was not found on the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub report_type: String,
    pub content: SectionContent,
}

impl Report {
    /// Enforce the all-four-keys invariant on records read back from disk.
    pub fn validate(&self) -> Result<()> {
        for section in SectionName::ALL {
            if !self.content.contains_key(&section) {
                bail!(
                    "report '{}' ({}) is missing section '{}'",
                    self.title,
                    self.url,
                    section
                );
            }
        }
        Ok(())
    }
}

/// A per-type schema record: which sections apply, content always blank.
/// `title` is intentionally left empty for a later generation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "type")]
    pub report_type: String,
    pub title: String,
    pub sections: SectionContent,
}

/// Pretty-printed UTF-8 JSON; serde_json keeps non-ASCII literal.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

/// Load a combined report file and check every record's invariant.
pub fn load_reports(path: &Path) -> Result<Vec<Report>> {
    let reports: Vec<Report> = read_json(path)?;
    for report in &reports {
        report.validate()?;
    }
    Ok(reports)
}

/// Write one `report_<n>.json` per report under `dir`.
pub fn save_report_files(dir: &Path, reports: &[Report]) -> Result<()> {
    for (i, report) in reports.iter().enumerate() {
        write_json(&dir.join(format!("report_{}.json", i + 1)), report)?;
    }
    Ok(())
}

/// Shuffle and split into (training, testing) by `train_ratio`.
pub fn split_reports(mut reports: Vec<Report>, train_ratio: f64) -> (Vec<Report>, Vec<Report>) {
    reports.shuffle(&mut rand::thread_rng());
    let train_size = ((reports.len() as f64) * train_ratio).round() as usize;
    let train_size = train_size.min(reports.len());
    let testing = reports.split_off(train_size);
    (reports, testing)
}

/// Count the records in a combined report file; 0 when the file does not
/// exist yet.
pub fn count_reports(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Ok(0);
    }
    Ok(load_reports(path)?.len())
}

/// Count the `.json` artifacts in a directory (templates on disk).
pub fn count_json_files(dir: &Path) -> Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut count = 0;
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            count += 1;
        }
    }
    Ok(count)
}

pub fn reports_path(dir: &Path) -> PathBuf {
    dir.join("reports.json")
}

pub fn training_path(dir: &Path) -> PathBuf {
    dir.join("training_reports.json")
}

pub fn testing_path(dir: &Path) -> PathBuf {
    dir.join("testing_reports.json")
}

// ── Tests ──
