use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use regex::Regex;
use rust_xlsxwriter::{Format, FormatAlign, Workbook, XlsxError};
use serde::Serialize;
use tracing::{info, warn};

use crate::sections::FALLBACK_SECTION;

/// Section columns on the Master sheet, in preferred order.
const MASTER_SECTIONS: &[&str] = &[
    "DIGEST",
    "BACKGROUND",
    "DISCUSSION",
    "DECISION",
    "CONCLUSION",
    "RECOMMENDATION",
];

const META_COLUMNS: &[&str] = &["file_number", "title", "date", "pdf_pages", "url"];
const SHEET_NAME_MAX: usize = 31;

/// Control characters neither the workbook nor the ingest JSON accept.
/// Tab, newline and carriage return stay.
static CONTROL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F]").unwrap());

static SHEET_ILLEGAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\\/*?:\[\]]").unwrap());

/// One harvested decision. Created once per discovered URL, immutable
/// afterwards; all textual fields are empty when the fetch failed
/// outright, so every URL still produces exactly one output row.
#[derive(Debug, Clone)]
pub struct DecisionRecord {
    pub url: String,
    pub title: String,
    pub file_number: String,
    pub date: String,
    pub full_text: String,
    pub sections: IndexMap<String, String>,
}

impl DecisionRecord {
    /// Degraded record for a document that could not be fetched.
    pub fn empty(url: &str) -> Self {
        Self {
            url: url.to_string(),
            title: String::new(),
            file_number: String::new(),
            date: String::new(),
            full_text: String::new(),
            sections: IndexMap::new(),
        }
    }
}

/// Shape of the `file_metadata` JSON column. Field order is part of the
/// ingest contract.
#[derive(Serialize)]
struct FileMetadata<'a> {
    file_number: &'a str,
    title: &'a str,
    date: &'a str,
    pdf_pages: Option<u32>,
    url: &'a str,
    sections: IndexMap<&'a str, String>,
}

fn sanitize(s: &str) -> String {
    CONTROL_RE.replace_all(s, "").into_owned()
}

/// Rewrite both output files in full. Called after every record and once
/// more at exit, so files on disk always reflect in-memory state. A
/// locked workbook falls back to a `_partial` sibling rather than losing
/// data.
pub fn write_outputs(records: &[DecisionRecord], out_csv: &Path, out_xlsx: &Path) -> Result<()> {
    write_csv(records, out_csv)?;
    info!(
        "DB-ready file written -> {} (rows: {})",
        out_csv.display(),
        records.len()
    );
    if let Err(e) = write_xlsx(records, out_xlsx) {
        let fallback = partial_path(out_xlsx);
        warn!(
            "workbook {} not writable ({e}), writing fallback {}",
            out_xlsx.display(),
            fallback.display()
        );
        write_xlsx(records, &fallback)
            .with_context(|| format!("failed to write fallback workbook {}", fallback.display()))?;
    } else {
        info!(
            "review workbook written -> {} (items: {})",
            out_xlsx.display(),
            records.len()
        );
    }
    Ok(())
}

fn write_csv(records: &[DecisionRecord], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    writer.write_record(["protest_id", "file_metadata", "file_content"])?;
    for record in records {
        let sections: IndexMap<&str, String> = record
            .sections
            .iter()
            .filter(|(name, body)| !body.trim().is_empty() && name.as_str() != FALLBACK_SECTION)
            .map(|(name, body)| (name.as_str(), sanitize(body)))
            .collect();
        let meta = FileMetadata {
            file_number: &record.file_number,
            title: &record.title,
            date: &record.date,
            pdf_pages: None,
            url: &record.url,
            sections,
        };
        let meta_json = serde_json::to_string(&meta)?;
        let content = sanitize(&record.full_text);
        writer.write_record(["", meta_json.as_str(), content.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_xlsx(records: &[DecisionRecord], path: &Path) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let wrap = Format::new().set_text_wrap().set_align(FormatAlign::Top);
    let top = Format::new().set_align(FormatAlign::Top);

    let master = workbook.add_worksheet().set_name("Master")?;
    let columns: Vec<&str> = META_COLUMNS.iter().chain(MASTER_SECTIONS).copied().collect();
    for (col, name) in columns.iter().enumerate() {
        master.write_string(0, col as u16, *name)?;
        master.set_column_width(col as u16, column_width(name))?;
    }

    let mut sheet_plans: Vec<(String, String, String)> = Vec::new();
    // "Master" is already taken by the summary sheet.
    let mut used_names: HashSet<String> = HashSet::from(["Master".to_string()]);

    for (idx, record) in records.iter().enumerate() {
        let row = (idx + 1) as u32;
        let cells = [
            sanitize(&record.file_number),
            sanitize(&record.title),
            sanitize(&record.date),
            String::new(), // pdf_pages: reserved, never filled by this pipeline
            record.url.clone(),
        ];
        for (col, value) in cells.iter().enumerate() {
            master.write_string_with_format(row, col as u16, value, &top)?;
        }
        for (offset, name) in MASTER_SECTIONS.iter().enumerate() {
            let body = record.sections.get(*name).map(String::as_str).unwrap_or("");
            master.write_string_with_format(
                row,
                (META_COLUMNS.len() + offset) as u16,
                &sanitize(body),
                &wrap,
            )?;
        }

        let item = idx + 1;
        let mut sheet_name = sheet_name_for(&cells[0], &cells[1], item);
        if !used_names.insert(sheet_name.clone()) {
            sheet_name = format!("Item {item}");
            used_names.insert(sheet_name.clone());
        }
        let label = if !cells[1].is_empty() {
            cells[1].clone()
        } else if !cells[0].is_empty() {
            cells[0].clone()
        } else {
            sheet_name.clone()
        };
        let column_title = format!("GAO Bid Protest Decision – {label} – Complete Text");
        sheet_plans.push((sheet_name, column_title, sanitize(&record.full_text)));
    }

    master.set_freeze_panes(1, 0)?;
    if !records.is_empty() {
        master.autofilter(0, 0, records.len() as u32, (columns.len() - 1) as u16)?;
    }

    for (name, column_title, full_text) in &sheet_plans {
        let sheet = workbook.add_worksheet().set_name(name)?;
        sheet.write_string(0, 0, column_title)?;
        sheet.write_string_with_format(1, 0, full_text, &wrap)?;
        sheet.set_column_width(0, 120)?;
        sheet.set_freeze_panes(1, 0)?;
    }

    workbook.save(path)
}

fn column_width(header: &str) -> f64 {
    match header {
        "file_number" => 14.0,
        "title" => 45.0,
        "date" => 14.0,
        "pdf_pages" => 10.0,
        "url" => 36.0,
        _ => 50.0, // section columns
    }
}

/// Worksheet name from file number or title: path-illegal characters
/// replaced, truncated to the sheet-name limit, `Item N` when nothing
/// usable remains.
fn sheet_name_for(file_number: &str, title: &str, item: usize) -> String {
    let base = if !file_number.is_empty() {
        file_number
    } else {
        title
    };
    let cleaned = SHEET_ILLEGAL_RE.replace_all(base, "_");
    let truncated: String = cleaned.chars().take(SHEET_NAME_MAX).collect();
    let truncated = truncated.trim().to_string();
    if truncated.is_empty() {
        format!("Item {item}")
    } else {
        truncated
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("xlsx");
    path.with_file_name(format!("{stem}_partial.{ext}"))
}

// ── Tests ──
