//! Regex patterns for issue date extraction.

use lazy_static::lazy_static;
use regex::Regex;

/// Field order of a numeric date pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOrder {
    /// Year, month, day.
    Ymd,
    /// Day, month, year.
    Dmy,
    /// Day and month in either order, decided by which one exceeds 12.
    Ambiguous,
}

lazy_static! {
    // Textual months, Portuguese and English: "30 - set - 2025", "27 Feb 2025",
    // "5 de março de 2025", "30-set-25"
    pub static ref DATE_TEXTUAL: Regex = Regex::new(
        r"(?i)\b(\d{1,2})(?:\s*[-–./]\s*|\s+(?:de\s+)?)(jan(?:eiro|uary)?|fev(?:ereiro)?|feb(?:ruary)?|mar(?:ço|co|ch)?|abr(?:il)?|apr(?:il)?|mai(?:o)?|may|jun(?:ho|e)?|jul(?:ho|y)?|ago(?:sto)?|aug(?:ust)?|set(?:embro)?|sep(?:t(?:ember)?)?|out(?:ubro)?|oct(?:ober)?|nov(?:embro|ember)?|dez(?:embro)?|dec(?:ember)?)\b\.?(?:\s*[-–./]\s*|\s+(?:de\s+)?)(\d{4}|\d{2})\b"
    ).unwrap();

    // 2025-02-10
    pub static ref DATE_YMD_DASH: Regex = Regex::new(
        r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b"
    ).unwrap();

    // 2025/02/10
    pub static ref DATE_YMD_SLASH: Regex = Regex::new(
        r"\b(\d{4})/(\d{1,2})/(\d{1,2})\b"
    ).unwrap();

    // 10/02/2025 or 2/16/2025
    pub static ref DATE_SLASH: Regex = Regex::new(
        r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b"
    ).unwrap();

    // 10-02-2025
    pub static ref DATE_DMY_DASH: Regex = Regex::new(
        r"\b(\d{1,2})-(\d{1,2})-(\d{4})\b"
    ).unwrap();

    // 10.02.2025
    pub static ref DATE_DMY_DOT: Regex = Regex::new(
        r"\b(\d{1,2})\.(\d{1,2})\.(\d{4})\b"
    ).unwrap();

    /// Issue-date labels, highest priority first.
    pub static ref ISSUE_LABELS: Vec<Regex> = [
        r"(?i)data\s*(?:de\s*)?emiss[ãa]o[\s:]*",
        r"(?i)data\s*(?:do\s*)?documento[\s:]*",
        r"(?i)data\s*(?:da\s*)?fact?ura[\s:]*",
        r"(?i)emitid[oa]\s*(?:em|a)?[\s:]*",
        r"(?i)issue\s*date[\s:]*",
        r"(?i)invoice\s*date[\s:]*",
        r"(?i)date\s*of\s*issue[\s:]*",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    /// Words that mark the following date as a due date.
    pub static ref DUE_KEYWORDS: Regex = Regex::new(
        r"(?i)vencimento|pagamento|prazo|data\s*limite|due\s*date|due\s*by|payment\s*due|pay\s*by"
    ).unwrap();
}

/// Numeric date patterns with their field order.
pub fn numeric_patterns() -> [(&'static Regex, FieldOrder); 5] {
    [
        (&*DATE_YMD_DASH, FieldOrder::Ymd),
        (&*DATE_YMD_SLASH, FieldOrder::Ymd),
        (&*DATE_SLASH, FieldOrder::Ambiguous),
        (&*DATE_DMY_DASH, FieldOrder::Dmy),
        (&*DATE_DMY_DOT, FieldOrder::Dmy),
    ]
}

/// Month number for a Portuguese or English month name or abbreviation.
pub fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    let prefix: String = lower.chars().take(3).collect();
    let month = match prefix.as_str() {
        "jan" => 1,
        "fev" | "feb" => 2,
        "mar" => 3,
        "abr" | "apr" => 4,
        "mai" | "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "ago" | "aug" => 8,
        "set" | "sep" => 9,
        "out" | "oct" => 10,
        "nov" => 11,
        "dez" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}
