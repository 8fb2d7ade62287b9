//! # paper_explorer
//!
//! Clean bibliographic metadata (CORD-19 style `metadata.csv`), aggregate it,
//! and lay out a word cloud of title terms.
//!
//! The pipeline runs in four stages:
//! 1. [`clean_records`] turns raw rows into [`Document`]s, dropping untitled
//!    rows and downgrading unreadable dates to "unknown".
//! 2. [`year_histogram`] and [`top_k`] aggregate the cleaned documents.
//! 3. [`FrequencyTable`] counts title tokens.
//! 4. [`LayoutEngine`] places the most frequent tokens on a canvas.
//!
//! [`analyze_documents`] runs stages 2–4 for one corpus; [`analyze_path`] loads
//! one CSV file or every CSV file in a directory and exports the results.
//!
//! ```
//! use paper_explorer::{ExplorerOptions, RawRecord, analyze_documents, clean_records};
//!
//! let rows = vec![
//!     RawRecord::new().with("title", "Deep Learning for COVID-19").with("publish_time", "2020-04-01"),
//!     RawRecord::new().with("title", "covid-19 deep analysis").with("publish_time", "2021"),
//! ];
//! let corpus = clean_records(&rows);
//! let report = analyze_documents(&corpus, &ExplorerOptions::default()).unwrap();
//! assert_eq!(report.year_histogram, vec![(2020, 1), (2021, 1)]);
//! assert_eq!(report.word_frequencies[0], ("19".to_string(), 2));
//! ```

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;

pub mod aggregate;
pub mod cache;
pub mod cleaner;
pub mod error;
pub mod export;
pub mod frequency;
pub mod layout;

pub use aggregate::{CategoryField, YearRange, filter_by_year, top_k, year_histogram};
pub use cache::{DatasetCache, SourceKey};
pub use cleaner::{
    CleanedCorpus, CleaningReport, Document, RawRecord, clean_records, load_csv,
    parse_publish_time, read_records,
};
pub use error::{ExplorerError, Result};
pub use export::{ExportFormat, csv_safe_cell, export_report};
pub use frequency::{FrequencyTable, Stopwords, tokenize};
pub use layout::{
    FontScale, GlyphMetrics, Layout, LayoutConfig, LayoutEngine, OmitReason, OmittedWord,
    PlacedWord, Rect, Rotation, SpiralParams,
};

/// Number of ranked words printed in the text summary.
const SUMMARY_WORDS: usize = 20;

/// Options for one analysis run.
#[derive(Debug, Clone)]
pub struct ExplorerOptions {
    pub year_range: YearRange,
    /// Journals and sources to rank.
    pub top_k: usize,
    /// Words kept from the frequency table and offered to the layout.
    pub top_n: usize,
    /// Rows shown in the sample table.
    pub sample: usize,
    pub stopwords: Option<Stopwords>,
    pub layout: LayoutConfig,
    pub export_format: ExportFormat,
    /// Directory for exported files.
    pub out_dir: PathBuf,
}

impl Default for ExplorerOptions {
    fn default() -> Self {
        ExplorerOptions {
            year_range: YearRange::new(2019, 2021).expect("static range is ordered"),
            top_k: 10,
            top_n: 200,
            sample: 10,
            stopwords: None,
            layout: LayoutConfig::default(),
            export_format: ExportFormat::Txt,
            out_dir: PathBuf::from("."),
        }
    }
}

impl ExplorerOptions {
    /// Checked before any data is touched.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(ExplorerError::config("top-k must be at least 1"));
        }
        if self.top_n == 0 {
            return Err(ExplorerError::config("top-n must be at least 1"));
        }
        self.layout.validate()
    }
}

/// Everything one run derives from a cleaned corpus.
#[derive(Debug, Clone, Serialize)]
pub struct ExplorerReport {
    pub year_range: YearRange,
    pub cleaning: CleaningReport,
    /// Documents with a year inside the range.
    pub filtered_count: usize,
    pub mean_abstract_words: f64,
    pub year_histogram: Vec<(i32, usize)>,
    /// Ranked over the filtered documents.
    pub top_journals: Vec<(String, usize)>,
    /// Ranked over the whole cleaned corpus, undated documents included.
    pub top_sources: Vec<(String, usize)>,
    /// Top-N title words of the filtered documents.
    pub word_frequencies: Vec<(String, usize)>,
    pub total_tokens: usize,
    pub layout: Layout,
    pub sample: Vec<Document>,
}

impl ExplorerReport {
    /// Human-readable summary, also what the CLI prints.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let c = &self.cleaning;
        let _ = writeln!(
            out,
            "Rows read: {}, kept: {}, dropped without title: {}, unreadable dates: {}",
            c.rows_read,
            c.rows_kept,
            c.dropped_untitled.len(),
            c.unparsed_dates.len()
        );
        let _ = writeln!(out, "Missing values per column:");
        for (field, n) in &c.missing {
            let _ = writeln!(out, "  {field}\t{n}");
        }
        let _ = writeln!(
            out,
            "\nShowing {} papers from {} to {} (mean abstract length {:.1} words)",
            self.filtered_count,
            self.year_range.lo(),
            self.year_range.hi(),
            self.mean_abstract_words
        );

        let _ = writeln!(out, "\nPublications by year:");
        for (year, n) in &self.year_histogram {
            let _ = writeln!(out, "  {year}\t{n}");
        }
        let _ = writeln!(out, "\nTop {} journals:", self.top_journals.len());
        for (journal, n) in &self.top_journals {
            let _ = writeln!(out, "  {journal}\t{n}");
        }
        let _ = writeln!(out, "\nTop {} sources:", self.top_sources.len());
        for (source, n) in &self.top_sources {
            let _ = writeln!(out, "  {source}\t{n}");
        }
        let shown = self.word_frequencies.len().min(SUMMARY_WORDS);
        let _ = writeln!(out, "\nTop {shown} words:");
        for (word, n) in self.word_frequencies.iter().take(shown) {
            let _ = writeln!(out, "  {word}\t{n}");
        }
        let _ = writeln!(
            out,
            "\nWord cloud: {} words placed on {}x{}, {} left out",
            self.layout.words.len(),
            self.layout.width,
            self.layout.height,
            self.layout.omitted.len()
        );
        let _ = writeln!(out, "\nSample data:");
        for doc in &self.sample {
            let _ = writeln!(
                out,
                "  {}\t{}\t{}",
                doc.title(),
                doc.journal().unwrap_or("-"),
                doc.publish_time()
                    .map_or_else(|| "-".to_string(), |d| d.to_string())
            );
        }
        out
    }
}

/// Run aggregation, word counting and layout over one cleaned corpus.
///
/// Aggregation and the text branch run concurrently over the shared,
/// read-only documents.
pub fn analyze_documents(corpus: &CleanedCorpus, opts: &ExplorerOptions) -> Result<ExplorerReport> {
    opts.validate()?;
    let engine = LayoutEngine::new(opts.layout.clone())?;
    let docs = &corpus.documents;
    let filtered = filter_by_year(docs, opts.year_range);

    let (aggregates, (table, layout)) = rayon::join(
        || -> Result<_> {
            let histogram = year_histogram(filtered.iter().copied(), opts.year_range);
            let journals = top_k(filtered.iter().copied(), CategoryField::Journal, opts.top_k)?;
            let sources = top_k(docs, CategoryField::Source, opts.top_k)?;
            Ok((histogram, journals, sources))
        },
        || {
            let table = FrequencyTable::from_titles(
                filtered.iter().map(|d| d.title()),
                opts.stopwords.as_ref(),
            );
            let layout = engine.layout(&table.top_n(opts.top_n));
            (table, layout)
        },
    );
    let (year_histogram, top_journals, top_sources) = aggregates?;

    let mean_abstract_words = if filtered.is_empty() {
        0.0
    } else {
        filtered
            .iter()
            .map(|d| d.abstract_word_count())
            .sum::<usize>() as f64
            / filtered.len() as f64
    };
    debug!(
        "{} of {} documents fall in {}..={}",
        filtered.len(),
        docs.len(),
        opts.year_range.lo(),
        opts.year_range.hi()
    );

    Ok(ExplorerReport {
        year_range: opts.year_range,
        cleaning: corpus.report.clone(),
        filtered_count: filtered.len(),
        mean_abstract_words,
        year_histogram,
        top_journals,
        top_sources,
        word_frequencies: table.top_n(opts.top_n),
        total_tokens: table.total(),
        layout,
        sample: filtered
            .iter()
            .take(opts.sample)
            .map(|d| (*d).clone())
            .collect(),
    })
}

/// Result of [`analyze_path`]: one summary per analyzed file plus the files
/// that could not be read.
#[derive(Debug, Default)]
pub struct AnalysisReport {
    pub summary: String,
    pub reports: Vec<(PathBuf, ExplorerReport)>,
    pub exported: Vec<PathBuf>,
    pub failed_files: Vec<(String, String)>,
}

/// Every `.csv` file under `path` (or `path` itself), sorted.
pub fn collect_files(path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            })
            .collect()
    };
    files.sort();
    files
}

/// Analyze one CSV file, a fresh clean every time, and export the result
/// under the file's stem.
pub fn analyze_file(path: &Path, opts: &ExplorerOptions) -> Result<(ExplorerReport, Vec<PathBuf>)> {
    let stem = path
        .file_stem()
        .map_or_else(|| "corpus".to_string(), |s| s.to_string_lossy().into_owned());
    analyze_file_as(path, &stem, opts)
}

fn analyze_file_as(
    path: &Path,
    stem: &str,
    opts: &ExplorerOptions,
) -> Result<(ExplorerReport, Vec<PathBuf>)> {
    let rows = load_csv(path)?;
    let corpus = clean_records(&rows);
    let report = analyze_documents(&corpus, opts)?;
    let exported = export_report(&report, stem, opts.export_format, &opts.out_dir)?;
    Ok((report, exported))
}

/// Export stems for `files` found under `root`, unique within one run.
///
/// A stem is the file's path relative to `root` without its extension, with
/// path separators replaced by `_` (`a/metadata.csv` becomes `a_metadata`).
/// Stems that still collide get a `_2`, `_3`, ... suffix in file order.
fn export_stems(root: &Path, files: &[PathBuf]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    files
        .iter()
        .map(|f| {
            let rel = f.strip_prefix(root).unwrap_or(f).with_extension("");
            let base: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            let base = if base.is_empty() {
                f.file_stem()
                    .map_or_else(|| "corpus".to_string(), |s| s.to_string_lossy().into_owned())
            } else {
                base.join("_")
            };
            let mut stem = base.clone();
            let mut n = 2;
            while !taken.insert(stem.clone()) {
                stem = format!("{base}_{n}");
                n += 1;
            }
            stem
        })
        .collect()
}

/// Analyze a CSV file or each CSV file in a directory independently.
///
/// Files are processed in parallel; a file that fails is recorded in
/// `failed_files` and the others still complete. `stopwords` names an optional
/// stopword file merged into `opts.stopwords`.
pub fn analyze_path(
    path: &Path,
    stopwords: Option<String>,
    opts: &ExplorerOptions,
) -> Result<AnalysisReport> {
    opts.validate()?;
    if !path.exists() {
        return Err(ExplorerError::NoInput(format!(
            "{} does not exist",
            path.display()
        )));
    }
    let mut opts = opts.clone();
    if let Some(file) = stopwords {
        let extra = Stopwords::from_file(Path::new(&file))?;
        match opts.stopwords.as_mut() {
            Some(existing) => existing.extend(extra),
            None => opts.stopwords = Some(extra),
        }
    }

    let files = collect_files(path);
    if files.is_empty() {
        return Err(ExplorerError::NoInput(format!(
            "no .csv files found in {}",
            path.display()
        )));
    }
    info!("Analyzing {} file(s)", files.len());

    let stems = export_stems(path, &files);
    let results: Vec<(PathBuf, Result<(ExplorerReport, Vec<PathBuf>)>)> = files
        .into_par_iter()
        .zip(stems)
        .map(|(f, stem)| {
            let res = analyze_file_as(&f, &stem, &opts);
            (f, res)
        })
        .collect();

    let mut out = AnalysisReport::default();
    for (file, res) in results {
        match res {
            Ok((report, exported)) => {
                if !out.summary.is_empty() {
                    out.summary.push('\n');
                }
                let _ = writeln!(out.summary, "=== {} ===", file.display());
                out.summary.push_str(&report.summary());
                out.exported.extend(exported);
                out.reports.push((file, report));
            }
            Err(e) => {
                warn!("Failed to analyze {}: {}", file.display(), e);
                out.failed_files
                    .push((file.display().to_string(), e.to_string()));
            }
        }
    }
    Ok(out)
}

/// Print files that could not be analyzed to stderr.
pub fn print_failed_files(failed: &[(String, String)]) {
    eprintln!("\nSome files could not be analyzed:");
    for (file, reason) in failed {
        eprintln!("  {file}: {reason}");
    }
}
