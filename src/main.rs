#![forbid(unsafe_code)]
//! # Paper Explorer CLI
//!
//! Command-line interface for the `paper_explorer` crate. Point it at a
//! CORD-19 style `metadata.csv` (or a directory of such files) to get:
//! - publications per year inside a year range,
//! - the most frequent journals and sources,
//! - the most frequent title words and a word cloud layout of them,
//! - a short sample of the filtered papers.
//!
//! ## Example
//! ```bash
//! cargo run --release -- metadata.csv --year-from 2019 --year-to 2021 --export-format csv
//! ```
//!
//! Each file in a directory is analyzed on its own. See `--help` for all options.

use clap::Parser;
use log::error;
use std::path::{Path, PathBuf};
use std::process;

use paper_explorer::{
    ExplorerOptions, ExportFormat, FontScale, GlyphMetrics, LayoutConfig, SpiralParams,
    Stopwords, YearRange, analyze_path, print_failed_files,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// CSV file or directory of CSV files to analyze
    path: String,

    /// First year of the range (inclusive)
    #[arg(long, default_value_t = 2019)]
    year_from: i32,

    /// Last year of the range (inclusive)
    #[arg(long, default_value_t = 2021)]
    year_to: i32,

    /// Number of journals and sources to rank
    #[arg(long, default_value_t = 10)]
    top_k: usize,

    /// Number of title words to rank and lay out
    #[arg(long, default_value_t = 200)]
    top_n: usize,

    /// Number of papers shown in the sample table
    #[arg(long, default_value_t = 10)]
    sample: usize,

    /// Optional path to a stopword file (.txt, one word per line)
    #[arg(long)]
    stopwords: Option<String>,

    /// Exclude common English function words from the title words
    #[arg(long, default_value_t = false)]
    english_stopwords: bool,

    /// Canvas width in pixels
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Canvas height in pixels
    #[arg(long, default_value_t = 400)]
    height: u32,

    /// Smallest font size in pixels
    #[arg(long, default_value_t = 4.0)]
    min_font: f64,

    /// Largest font size in pixels
    #[arg(long, default_value_t = 80.0)]
    max_font: f64,

    /// Spiral angle step in radians
    #[arg(long, default_value_t = 0.1)]
    angle_step: f64,

    /// Spiral radius growth in pixels per radian
    #[arg(long, default_value_t = 0.5)]
    growth: f64,

    /// Keep every word horizontal
    #[arg(long, default_value_t = false)]
    no_rotate: bool,

    /// Seed for shuffling equally frequent words and picking orientations
    #[arg(long)]
    seed: Option<u64>,

    /// Output format for export (txt, csv, tsv, json)
    #[arg(long, default_value = "txt")]
    export_format: ExportFormat,

    /// Directory for exported files
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

impl Cli {
    fn options(&self) -> paper_explorer::Result<ExplorerOptions> {
        Ok(ExplorerOptions {
            year_range: YearRange::new(self.year_from, self.year_to)?,
            top_k: self.top_k,
            top_n: self.top_n,
            sample: self.sample,
            stopwords: self.english_stopwords.then(Stopwords::english),
            layout: LayoutConfig {
                width: self.width,
                height: self.height,
                font: FontScale {
                    min_size: self.min_font,
                    max_size: self.max_font,
                },
                glyphs: GlyphMetrics::default(),
                spiral: SpiralParams {
                    angle_step: self.angle_step,
                    growth: self.growth,
                    ..SpiralParams::default()
                },
                max_words: self.top_n,
                allow_rotation: !self.no_rotate,
                seed: self.seed,
                ..LayoutConfig::default()
            },
            export_format: self.export_format,
            out_dir: self.out_dir.clone(),
        })
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let opts = match cli.options() {
        Ok(opts) => opts,
        Err(e) => {
            error!("Error: {}", e);
            process::exit(1);
        }
    };

    match analyze_path(Path::new(&cli.path), cli.stopwords.clone(), &opts) {
        Ok(report) => {
            println!("{}", report.summary);
            if !report.failed_files.is_empty() {
                print_failed_files(&report.failed_files);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Error: {}", e);
            process::exit(1);
        }
    }
}
