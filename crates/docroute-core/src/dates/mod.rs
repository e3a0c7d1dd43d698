//! Issue date extraction.
//!
//! Documents often print several dates (issue, delivery, due). The issue
//! date is taken from an explicit label when one is present; otherwise the
//! earliest date that is not introduced by a due-date keyword wins.

pub mod patterns;

use chrono::NaiveDate;
use regex::Captures;
use tracing::debug;

use crate::models::config::DateConfig;
use crate::models::outcome::{DateOrigin, ExtractedDate};
use patterns::{month_number, numeric_patterns, FieldOrder, DATE_TEXTUAL, DUE_KEYWORDS, ISSUE_LABELS};

/// A calendar date found in text, with its byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateMatch {
    pub date: NaiveDate,
    pub start: usize,
    pub end: usize,
}

/// Issue date extractor.
#[derive(Debug, Clone)]
pub struct DateExtractor {
    min_year: i32,
    max_year: i32,
    due_keyword_window: usize,
    label_window: usize,
}

impl DateExtractor {
    pub fn new(config: &DateConfig) -> Self {
        Self {
            min_year: config.min_year,
            max_year: config.max_year,
            due_keyword_window: config.due_keyword_window,
            label_window: config.label_window,
        }
    }

    /// Extract the issue date of a document.
    pub fn extract(&self, text: &str) -> Option<ExtractedDate> {
        if let Some(date) = self.labeled(text) {
            debug!("Labeled issue date {}", date);
            return Some(ExtractedDate::new(date, DateOrigin::Labeled));
        }

        let date = self.earliest_not_due(text)?;
        debug!("Earliest non-due date {}", date);
        Some(ExtractedDate::new(date, DateOrigin::Earliest))
    }

    /// Every plausible date in the text, in order of appearance.
    ///
    /// Overlapping matches from different patterns are resolved in favour of
    /// the one that starts first (and is longer on equal starts).
    pub fn find_dates(&self, text: &str) -> Vec<DateMatch> {
        let mut found = Vec::new();

        for caps in DATE_TEXTUAL.captures_iter(text) {
            let Some(month) = month_number(&caps[2]) else {
                continue;
            };
            let day = caps[1].parse().unwrap_or(0);
            let year = expand_year(caps[3].parse().unwrap_or(0));
            self.push_match(&mut found, &caps, year, month, day);
        }

        for (pattern, order) in numeric_patterns() {
            for caps in pattern.captures_iter(text) {
                let a: u32 = caps[1].parse().unwrap_or(0);
                let b: u32 = caps[2].parse().unwrap_or(0);
                let c: u32 = caps[3].parse().unwrap_or(0);
                let (year, month, day) = match order {
                    FieldOrder::Ymd => (a as i32, b, c),
                    FieldOrder::Dmy => (c as i32, b, a),
                    FieldOrder::Ambiguous => {
                        if b > 12 && a <= 12 {
                            (c as i32, a, b)
                        } else {
                            (c as i32, b, a)
                        }
                    }
                };
                self.push_match(&mut found, &caps, year, month, day);
            }
        }

        found.sort_by_key(|m| (m.start, std::cmp::Reverse(m.end)));
        let mut result: Vec<DateMatch> = Vec::with_capacity(found.len());
        for m in found {
            if result.last().is_none_or(|last| m.start >= last.end) {
                result.push(m);
            }
        }
        result
    }

    fn push_match(&self, found: &mut Vec<DateMatch>, caps: &Captures, year: i32, month: u32, day: u32) {
        if year < self.min_year || year > self.max_year {
            return;
        }
        let (Some(whole), Some(date)) = (caps.get(0), NaiveDate::from_ymd_opt(year, month, day)) else {
            return;
        };
        found.push(DateMatch {
            date,
            start: whole.start(),
            end: whole.end(),
        });
    }

    /// First date shortly after an issue-date label, labels by priority.
    fn labeled(&self, text: &str) -> Option<NaiveDate> {
        for label in ISSUE_LABELS.iter() {
            for found in label.find_iter(text) {
                let end = advance_chars(text, found.end(), self.label_window);
                if let Some(m) = self.find_dates(&text[found.end()..end]).first() {
                    return Some(m.date);
                }
            }
        }
        None
    }

    /// Earliest date not preceded by a due-date keyword.
    fn earliest_not_due(&self, text: &str) -> Option<NaiveDate> {
        let mut previous_end = 0;
        let mut earliest: Option<NaiveDate> = None;

        for m in self.find_dates(text) {
            let window_start = retreat_chars(text, m.start, self.due_keyword_window).max(previous_end);
            previous_end = m.end;

            if DUE_KEYWORDS.is_match(&text[window_start..m.start]) {
                debug!("Skipping due date {}", m.date);
                continue;
            }
            if earliest.is_none_or(|e| m.date < e) {
                earliest = Some(m.date);
            }
        }

        earliest
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new(&DateConfig::default())
    }
}

/// Two-digit years belong to this century.
fn expand_year(year: i32) -> i32 {
    if year < 100 {
        2000 + year
    } else {
        year
    }
}

/// Byte offset `n` characters after `pos`, capped at the end of `text`.
fn advance_chars(text: &str, pos: usize, n: usize) -> usize {
    text[pos..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| pos + i)
        .unwrap_or(text.len())
}

/// Byte offset `n` characters before `pos`, capped at the start of `text`.
fn retreat_chars(text: &str, pos: usize, n: usize) -> usize {
    if n == 0 {
        return pos;
    }
    text[..pos]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn extract(text: &str) -> Option<ExtractedDate> {
        DateExtractor::default().extract(text)
    }

    #[test]
    fn test_issue_label_beats_due_date() {
        let text = "Due Date: 2025-03-20\nIssue Date: 2025-02-27";
        let result = extract(text).unwrap();
        assert_eq!(result.date, ymd(2025, 2, 27));
        assert_eq!(result.origin, DateOrigin::Labeled);
    }

    #[test]
    fn test_due_date_excluded_without_label() {
        let text = "Fatura FT 12/2025\nVencimento: 20/03/2025\nLisboa, 27/02/2025";
        let result = extract(text).unwrap();
        assert_eq!(result.date, ymd(2025, 2, 27));
        assert_eq!(result.origin, DateOrigin::Earliest);
    }

    #[test]
    fn test_earliest_wins() {
        let text = "Entrega 10.03.2025\nDocumento 02.03.2025";
        assert_eq!(extract(text).unwrap().date, ymd(2025, 3, 2));
    }

    #[test]
    fn test_only_due_date_yields_none() {
        assert_eq!(extract("Data de vencimento: 2025-03-20"), None);
    }

    #[test]
    fn test_keyword_window_stops_at_previous_date() {
        // The keyword belongs to the first date, not the second.
        let text = "Prazo 20/03/2025 Data 01/03/2025";
        assert_eq!(extract(text).unwrap().date, ymd(2025, 3, 1));
    }

    #[test]
    fn test_formats() {
        let cases = [
            ("2025-02-10", ymd(2025, 2, 10)),
            ("2025/02/10", ymd(2025, 2, 10)),
            ("10/02/2025", ymd(2025, 2, 10)),
            ("2/16/2025", ymd(2025, 2, 16)),
            ("16/2/2025", ymd(2025, 2, 16)),
            ("10-02-2025", ymd(2025, 2, 10)),
            ("10.02.2025", ymd(2025, 2, 10)),
            ("30 - set - 2025", ymd(2025, 9, 30)),
            ("30-set-25", ymd(2025, 9, 30)),
            ("27 Feb 2025", ymd(2025, 2, 27)),
            ("5 de março de 2025", ymd(2025, 3, 5)),
        ];
        for (text, expected) in cases {
            let found = extract(text).map(|d| d.date);
            assert_eq!(found, Some(expected), "input {:?}", text);
        }
    }

    #[test]
    fn test_invalid_and_out_of_range_dates() {
        assert_eq!(extract("31/02/2025"), None);
        assert_eq!(extract("01/01/1999"), None);
        assert_eq!(extract("no dates here"), None);
    }

    #[test]
    fn test_portuguese_label_with_accents() {
        let text = "Vencimento 2025-01-10\nData de emissão: 03-01-2025";
        let result = extract(text).unwrap();
        assert_eq!(result.date, ymd(2025, 1, 3));
        assert_eq!(result.origin, DateOrigin::Labeled);
    }

    #[test]
    fn test_find_dates_resolves_overlaps() {
        let dates = DateExtractor::default().find_dates("emitido 30-set-2025 e 2025-10-01");
        let found: Vec<NaiveDate> = dates.iter().map(|m| m.date).collect();
        assert_eq!(found, vec![ymd(2025, 9, 30), ymd(2025, 10, 1)]);
    }

    #[test]
    fn test_char_offsets() {
        let text = "ação 12";
        assert_eq!(retreat_chars(text, text.len(), 2), text.len() - 2);
        assert_eq!(retreat_chars(text, 3, 50), 0);
        assert_eq!(advance_chars(text, 0, 2), "aç".len());
        assert_eq!(advance_chars(text, 0, 100), text.len());
    }
}
