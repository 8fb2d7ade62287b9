//! Year histograms and ranked categorical counts over cleaned documents.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::cleaner::Document;
use crate::error::{ExplorerError, Result};

/// Inclusive range of publication years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearRange {
    lo: i32,
    hi: i32,
}

impl YearRange {
    pub fn new(lo: i32, hi: i32) -> Result<Self> {
        if lo > hi {
            return Err(ExplorerError::config(format!(
                "year range start {lo} is after its end {hi}"
            )));
        }
        Ok(YearRange { lo, hi })
    }

    pub fn lo(&self) -> i32 {
        self.lo
    }

    pub fn hi(&self) -> i32 {
        self.hi
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.lo..=self.hi).contains(&year)
    }
}

/// Categorical document field that can be ranked with [`top_k`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CategoryField {
    Journal,
    Source,
}

impl CategoryField {
    fn value<'a>(&self, doc: &'a Document) -> Option<&'a str> {
        match self {
            CategoryField::Journal => doc.journal(),
            CategoryField::Source => doc.source(),
        }
    }
}

/// Documents with a known year inside `range`, in their original order.
/// Documents without a year never pass.
pub fn filter_by_year(docs: &[Document], range: YearRange) -> Vec<&Document> {
    docs.iter()
        .filter(|d| d.year().is_some_and(|y| range.contains(y)))
        .collect()
}

/// Count documents per year, restricted to `range`, ascending by year.
pub fn year_histogram<'a, I>(docs: I, range: YearRange) -> Vec<(i32, usize)>
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for year in docs.into_iter().filter_map(Document::year) {
        if range.contains(year) {
            *counts.entry(year).or_insert(0) += 1;
        }
    }
    counts.into_iter().collect()
}

/// The `k` most frequent values of `field`, most frequent first.
///
/// Equal counts keep the order in which the values were first seen. Documents
/// where the field is absent are skipped. To rank only a year range, pass the
/// output of [`filter_by_year`].
pub fn top_k<'a, I>(docs: I, field: CategoryField, k: usize) -> Result<Vec<(String, usize)>>
where
    I: IntoIterator<Item = &'a Document>,
{
    if k == 0 {
        return Err(ExplorerError::config("top-k must be at least 1"));
    }
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut ranked: Vec<(&str, usize)> = Vec::new();
    for value in docs.into_iter().filter_map(|d| field.value(d)) {
        match seen.get(value) {
            Some(&idx) => ranked[idx].1 += 1,
            None => {
                seen.insert(value, ranked.len());
                ranked.push((value, 1));
            }
        }
    }
    // stable sort keeps first-seen order among ties
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(ranked
        .into_iter()
        .take(k)
        .map(|(v, c)| (v.to_string(), c))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::RawRecord;

    fn doc(title: &str, date: &str, journal: &str) -> Document {
        let raw = RawRecord::new()
            .with("title", title)
            .with("publish_time", date)
            .with("journal", journal);
        Document::from_raw(&raw).unwrap()
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        assert!(YearRange::new(2021, 2019).is_err());
        assert!(YearRange::new(2020, 2020).is_ok());
    }

    #[test]
    fn test_histogram_restricted_to_range() {
        let docs = vec![
            doc("a", "2018-01-01", "J"),
            doc("b", "2019-05-01", "J"),
            doc("c", "2020-02-02", "J"),
            doc("d", "2020-07-07", "J"),
            doc("e", "2022-01-01", "J"),
            doc("f", "", "J"),
        ];
        let range = YearRange::new(2019, 2021).unwrap();
        assert_eq!(year_histogram(&docs, range), vec![(2019, 1), (2020, 2)]);
        assert_eq!(filter_by_year(&docs, range).len(), 3);
    }

    #[test]
    fn test_top_k_ties_keep_first_seen_order() {
        let docs = vec![
            doc("1", "2020", "Virology"),
            doc("2", "2020", "Lancet"),
            doc("3", "2020", "Lancet"),
            doc("4", "2020", "Nature"),
            doc("5", "2020", "Virology"),
            doc("6", "2020", "Cell"),
            doc("7", "2020", ""),
        ];
        let top = top_k(&docs, CategoryField::Journal, 3).unwrap();
        assert_eq!(
            top,
            vec![
                ("Virology".to_string(), 2),
                ("Lancet".to_string(), 2),
                ("Nature".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_top_k_includes_undated_documents_when_unfiltered() {
        let docs = vec![doc("1", "garbage", "Lancet"), doc("2", "2020", "Cell")];
        let all = top_k(&docs, CategoryField::Journal, 10).unwrap();
        assert_eq!(all.len(), 2);
        let range = YearRange::new(2019, 2021).unwrap();
        let ranged = top_k(filter_by_year(&docs, range), CategoryField::Journal, 10).unwrap();
        assert_eq!(ranged, vec![("Cell".to_string(), 1)]);
    }

    #[test]
    fn test_empty_inputs() {
        let range = YearRange::new(2019, 2021).unwrap();
        assert!(year_histogram(&Vec::<Document>::new(), range).is_empty());
        assert!(top_k(&Vec::<Document>::new(), CategoryField::Source, 5).unwrap().is_empty());
        assert!(top_k(&Vec::<Document>::new(), CategoryField::Source, 0).is_err());
    }
}
