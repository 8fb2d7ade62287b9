//! Writing reports to disk as TXT, CSV, TSV or JSON.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::ValueEnum;
use log::debug;
use serde::Serialize;

use crate::ExplorerReport;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Txt,
    Csv,
    Tsv,
    Json,
}

impl ExportFormat {
    fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
        }
    }

    fn delimiter(&self) -> u8 {
        match self {
            ExportFormat::Tsv => b'\t',
            _ => b',',
        }
    }
}

/// Neutralize cells a spreadsheet would read as a formula by prefixing `'`.
/// Cells that already start with `'` are left alone.
/// # Example
/// ```
/// use paper_explorer::csv_safe_cell;
/// assert_eq!(csv_safe_cell("=SUM(A1)".to_string()), "'=SUM(A1)");
/// assert_eq!(csv_safe_cell("Lancet".to_string()), "Lancet");
/// ```
pub fn csv_safe_cell(cell: String) -> String {
    match cell.chars().next() {
        Some('=' | '+' | '-' | '@' | '\t' | '\r') => format!("'{cell}"),
        _ => cell,
    }
}

#[derive(Serialize)]
struct RankedItem<'a> {
    item: &'a str,
    count: usize,
}

#[derive(Serialize)]
struct YearCount {
    year: i32,
    count: usize,
}

/// Write `report` into `out_dir` as `<stem>_<YYYYMMDD_HHMMSS>_<table>.<ext>`.
/// TXT produces one `_report` file with the summary; the other formats write
/// one file per table. Returns the paths written.
pub fn export_report(
    report: &ExplorerReport,
    stem: &str,
    format: ExportFormat,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let path_for = |table: &str| out_dir.join(format!("{stem}_{stamp}_{table}.{}", format.extension()));

    let mut written = Vec::new();
    match format {
        ExportFormat::Txt => {
            let path = path_for("report");
            File::create(&path)?.write_all(report.summary().as_bytes())?;
            written.push(path);
        }
        ExportFormat::Json => {
            let years: Vec<YearCount> = report
                .year_histogram
                .iter()
                .map(|&(year, count)| YearCount { year, count })
                .collect();
            written.push(write_json(path_for("years"), &years)?);
            written.push(write_json(path_for("journals"), &ranked(&report.top_journals))?);
            written.push(write_json(path_for("sources"), &ranked(&report.top_sources))?);
            written.push(write_json(path_for("wordfreq"), &ranked(&report.word_frequencies))?);
            written.push(write_json(path_for("layout"), &report.layout.words)?);
            written.push(write_json(path_for("omitted"), &report.layout.omitted)?);
            written.push(write_json(path_for("sample"), &report.sample)?);
        }
        ExportFormat::Csv | ExportFormat::Tsv => {
            let delim = format.delimiter();
            let years = report
                .year_histogram
                .iter()
                .map(|(y, c)| vec![y.to_string(), c.to_string()]);
            written.push(write_table(path_for("years"), delim, &["year", "count"], years)?);
            for (table, rows) in [
                ("journals", &report.top_journals),
                ("sources", &report.top_sources),
                ("wordfreq", &report.word_frequencies),
            ] {
                let rows = rows.iter().map(|(v, c)| vec![v.clone(), c.to_string()]);
                written.push(write_table(path_for(table), delim, &["item", "count"], rows)?);
            }
            let placed = report.layout.words.iter().map(|w| {
                vec![
                    w.text.clone(),
                    w.count.to_string(),
                    w.font_size.to_string(),
                    w.x.to_string(),
                    w.y.to_string(),
                    w.rotation.degrees().to_string(),
                    w.bbox.width.to_string(),
                    w.bbox.height.to_string(),
                ]
            });
            written.push(write_table(
                path_for("layout"),
                delim,
                &["word", "count", "font_size", "x", "y", "rotation", "width", "height"],
                placed,
            )?);
            let omitted = report.layout.omitted.iter().map(|o| {
                vec![
                    o.text.clone(),
                    o.count.to_string(),
                    o.font_size.to_string(),
                    format!("{:?}", o.reason),
                ]
            });
            written.push(write_table(
                path_for("omitted"),
                delim,
                &["word", "count", "font_size", "reason"],
                omitted,
            )?);
            let sample = report.sample.iter().map(|d| {
                vec![
                    d.title().to_string(),
                    d.journal().unwrap_or_default().to_string(),
                    d.publish_time().map(|t| t.to_string()).unwrap_or_default(),
                ]
            });
            written.push(write_table(
                path_for("sample"),
                delim,
                &["title", "journal", "publish_time"],
                sample,
            )?);
        }
    }
    debug!("Exported {} files for {stem}", written.len());
    Ok(written)
}

fn ranked(rows: &[(String, usize)]) -> Vec<RankedItem<'_>> {
    rows.iter()
        .map(|(item, count)| RankedItem {
            item,
            count: *count,
        })
        .collect()
}

fn write_json<T: Serialize + ?Sized>(path: PathBuf, value: &T) -> Result<PathBuf> {
    let file = File::create(&path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(path)
}

fn write_table<I>(path: PathBuf, delimiter: u8, header: &[&str], rows: I) -> Result<PathBuf>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(&path)?;
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(row.into_iter().map(csv_safe_cell))?;
    }
    wtr.flush()?;
    Ok(path)
}
