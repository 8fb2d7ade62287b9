//! Title tokenization and word frequency ranking.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::error::Result;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid regex"));

/// Opt-in English function words for `--english-stopwords`.
const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "about", "after", "against", "all", "also", "an", "and", "any", "are", "as", "at", "be",
    "been", "before", "between", "both", "but", "by", "can", "could", "did", "do", "does", "during",
    "each", "for", "from", "had", "has", "have", "how", "if", "in", "into", "is", "it", "its",
    "may", "more", "most", "no", "not", "of", "on", "or", "other", "our", "over", "should", "so",
    "such", "than", "that", "the", "their", "them", "there", "these", "they", "this", "those",
    "through", "to", "under", "up", "was", "we", "were", "what", "when", "where", "which", "while",
    "who", "why", "will", "with", "within", "without", "would",
];

/// Split `text` into lowercase word tokens.
///
/// A token is a maximal run of Unicode alphanumerics or `_`; everything else
/// separates tokens. `"COVID-19"` yields `covid` and `19`.
/// # Example
/// ```
/// use paper_explorer::tokenize;
/// assert_eq!(tokenize("Deep-Learning, for COVID_19!"), vec!["deep", "learning", "for", "covid_19"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Tokens to exclude before counting. Entries are stored case-folded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stopwords(HashSet<String>);

impl Stopwords {
    pub fn english() -> Self {
        ENGLISH_STOPWORDS.iter().copied().collect()
    }

    /// Load a stopword file: one word per line, blank lines and `#` comments ignored.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let words: Stopwords = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();
        debug!("Loaded {} stopwords from {}", words.len(), path.display());
        Ok(words)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn extend(&mut self, other: Stopwords) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Stopwords {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Stopwords(iter.into_iter().map(|s| s.as_ref().to_lowercase()).collect())
    }
}

/// Token to occurrence count. `total()` is always the sum of all counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: HashMap<String, usize>,
    total: usize,
}

impl FrequencyTable {
    /// Tokenize and count every title. Stopwords, if given, are removed first.
    pub fn from_titles<I, S>(titles: I, stopwords: Option<&Stopwords>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = FrequencyTable::default();
        for title in titles {
            for token in tokenize(title.as_ref()) {
                if stopwords.is_some_and(|s| s.contains(&token)) {
                    continue;
                }
                table.add(token);
            }
        }
        debug!(
            "Counted {} tokens, {} distinct",
            table.total,
            table.counts.len()
        );
        table
    }

    fn add(&mut self, token: String) {
        *self.counts.entry(token).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn get(&self, token: &str) -> Option<usize> {
        self.counts.get(token).copied()
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total counted occurrences.
    pub fn total(&self) -> usize {
        self.total
    }

    /// All entries, highest count first, ties broken lexicographically.
    pub fn ranked(&self) -> Vec<(String, usize)> {
        let mut sorted: Vec<(String, usize)> = self
            .counts
            .iter()
            .map(|(w, c)| (w.clone(), *c))
            .collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        sorted
    }

    /// The `n` most frequent tokens, same order as [`FrequencyTable::ranked`].
    pub fn top_n(&self, n: usize) -> Vec<(String, usize)> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }
}
