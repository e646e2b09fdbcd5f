//! Knowledge base loader.
//!
//! Reads tabular rows (`.xlsx`/`.xls` first sheet or `.csv`, each with a
//! header row, or `.json` as an array of row objects) and converts them into
//! a [`KnowledgeBase`]. Headers match
//! case-insensitively against a few accepted names per field. Any failure, or
//! a source without a single usable row, degrades to the built-in defaults.

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::KnowledgeConfig;
use crate::defaults::default_knowledge_base;
use crate::error::Error;
use crate::types::{KnowledgeBase, KnowledgeEntry};

const KEY_HEADERS: &[&str] = &["key", "id", "kb_key"];
const PROBLEM_HEADERS: &[&str] = &["problem", "title", "issue", "description"];
const KEYWORD_HEADERS: &[&str] = &["keywords", "keyword", "tags"];
const SOLUTION_HEADERS: &[&str] = &["solutions", "solution", "steps", "fixes"];
const CATEGORY_HEADERS: &[&str] = &["category", "type", "group"];

/// One cell of a source row.
#[derive(Debug, Clone)]
enum Cell {
    Text(String),
    List(Vec<String>),
}

/// A source row keyed by lowercased, trimmed header.
type RawRow = HashMap<String, Cell>;

#[derive(Debug, Clone, Default)]
pub struct KnowledgeLoader {
    source: Option<PathBuf>,
}

impl KnowledgeLoader {
    pub fn new(source: Option<PathBuf>) -> Self {
        Self { source }
    }

    pub fn from_config(config: &KnowledgeConfig) -> Self {
        Self::new(config.source.clone())
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Loads the configured source, falling back to the built-in set.
    /// The returned knowledge base is never empty.
    pub fn load(&self) -> KnowledgeBase {
        let Some(path) = &self.source else {
            debug!("no knowledge source configured; using built-in knowledge base");
            return default_knowledge_base();
        };
        if !path.exists() {
            info!(path = %path.display(), "knowledge source not found; using built-in knowledge base");
            return default_knowledge_base();
        }
        match load_source(path) {
            Ok(kb) if !kb.is_empty() => {
                info!(path = %path.display(), entries = kb.len(), "loaded knowledge base");
                kb
            }
            Ok(_) => {
                warn!(path = %path.display(), "knowledge source has no usable rows; using built-in knowledge base");
                default_knowledge_base()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read knowledge source; using built-in knowledge base");
                default_knowledge_base()
            }
        }
    }
}

/// Strict variant of [`KnowledgeLoader::load`]: parse errors propagate and an
/// empty result is returned as-is.
pub fn load_source(path: &Path) -> Result<KnowledgeBase> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let rows = match ext.as_str() {
        "xlsx" | "xlsm" | "xls" => rows_from_sheet(path)?,
        "csv" => rows_from_csv(path)?,
        "json" => rows_from_json(path)?,
        other => return Err(Error::KnowledgeSource(format!("unsupported format '{}'", other)).into()),
    };
    Ok(rows_to_knowledge_base(&rows))
}

/// First worksheet; the first row holds the headers. Empty cells are left out.
fn rows_from_sheet(path: &Path) -> Result<Vec<RawRow>> {
    let mut workbook = open_workbook_auto(path).with_context(|| format!("opening {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::KnowledgeSource(format!("{} has no worksheets", path.display())))?
        .with_context(|| format!("reading {}", path.display()))?;
    let mut records = range.rows();
    let Some(header_row) = records.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row.iter().map(|h| h.to_string().trim().to_lowercase()).collect();
    let rows = records
        .map(|record| {
            headers
                .iter()
                .zip(record.iter())
                .filter(|(_, cell)| !matches!(cell, Data::Empty))
                .map(|(h, cell)| (h.clone(), Cell::Text(cell.to_string())))
                .collect()
        })
        .collect();
    Ok(rows)
}

fn rows_from_csv(path: &Path) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_lowercase()).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("reading {}", path.display()))?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), Cell::Text(v.to_string())))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn rows_from_json(path: &Path) -> Result<Vec<RawRow>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    let items = value
        .as_array()
        .ok_or_else(|| Error::KnowledgeSource(format!("expected a JSON array of rows in {}", path.display())))?;
    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        let Some(obj) = item.as_object() else { continue };
        let mut row = RawRow::new();
        for (header, v) in obj {
            if let Some(cell) = json_cell(v) {
                row.insert(header.trim().to_lowercase(), cell);
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

fn json_cell(v: &serde_json::Value) -> Option<Cell> {
    use serde_json::Value;
    match v {
        Value::Null => None,
        Value::String(s) => Some(Cell::Text(s.clone())),
        Value::Array(items) => Some(Cell::List(
            items
                .iter()
                .filter_map(|i| match i {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect(),
        )),
        other => Some(Cell::Text(other.to_string())),
    }
}

fn column<'a>(row: &'a RawRow, names: &[&str]) -> Option<&'a Cell> {
    names.iter().find_map(|n| row.get(*n))
}

fn cell_text(cell: Option<&Cell>) -> String {
    match cell {
        Some(Cell::Text(s)) => s.trim().to_string(),
        Some(Cell::List(items)) => items.join(", ").trim().to_string(),
        None => String::new(),
    }
}

fn rows_to_knowledge_base(rows: &[RawRow]) -> KnowledgeBase {
    let mut kb = KnowledgeBase::new();
    for (i, row) in rows.iter().enumerate() {
        let key = cell_text(column(row, KEY_HEADERS));
        if key.is_empty() || key.eq_ignore_ascii_case("nan") {
            debug!(row = i, "skipping row without key");
            continue;
        }
        let keywords = match column(row, KEYWORD_HEADERS) {
            Some(Cell::Text(s)) => parse_keywords(s),
            Some(Cell::List(items)) => items.iter().flat_map(|s| parse_keywords(s)).collect(),
            None => Vec::new(),
        };
        let solutions = match column(row, SOLUTION_HEADERS) {
            Some(Cell::Text(s)) => parse_solutions(s),
            Some(Cell::List(items)) => items.iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
            None => Vec::new(),
        };
        let problem = cell_text(column(row, PROBLEM_HEADERS));
        let category = cell_text(column(row, CATEGORY_HEADERS));
        let entry = match KnowledgeEntry::new(problem, keywords, solutions, Some(category.as_str())) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(row = i, key = %key, error = %e, "skipping row");
                continue;
            }
        };
        if let Err(e) = kb.insert(key, entry) {
            debug!(row = i, error = %e, "skipping row");
        }
    }
    kb
}

/// Splits on comma or semicolon, trims, lowercases and drops empty tokens.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Splits on newline or semicolon, trims and drops empty steps.
pub fn parse_solutions(raw: &str) -> Vec<String> {
    raw.split(['\n', ';'])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_split() {
        assert_eq!(parse_keywords(" Phone, Screen;;touch ,"), vec!["phone", "screen", "touch"]);
        assert!(parse_keywords(" ; , ").is_empty());
    }

    #[test]
    fn solution_split() {
        assert_eq!(
            parse_solutions("Restart\r\n Update OS ;\n\nCall support"),
            vec!["Restart", "Update OS", "Call support"]
        );
    }

    #[test]
    fn header_variants_are_accepted() {
        let mut row = RawRow::new();
        row.insert("id".into(), Cell::Text("wifi".into()));
        row.insert("title".into(), Cell::Text("No wifi".into()));
        row.insert("tags".into(), Cell::List(vec!["WiFi".into(), "router; modem".into()]));
        row.insert("steps".into(), Cell::List(vec!["Reboot router".into(), " ".into()]));
        let kb = rows_to_knowledge_base(&[row]);
        let e = kb.get("wifi").expect("entry");
        assert_eq!(e.problem, "No wifi");
        assert_eq!(e.keywords, vec!["wifi", "router", "modem"]);
        assert_eq!(e.solutions, vec!["Reboot router"]);
        assert_eq!(e.category, "General");
    }
}
