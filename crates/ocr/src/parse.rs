use std::sync::OnceLock;

use regex::Regex;
use routebook_core::{StopRecord, DEFAULT_DELIVERY_TYPE};
use serde::{Deserialize, Serialize};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Digits are ASCII only; `\d` in `regex` also matches other scripts.
re!(re_leading_digits, r"^[0-9]+");
re!(re_street, r"(?i)[A-Za-z\s]+(?:DR|RD|ST)");
re!(re_unit, r"(?i)APT\s*[0-9]+");
re!(re_additional_info, r"[0-9]{4}\s+(.+)$");

/// Column-title fragments printed at the top of each route book page.
const HEADER_MARKERS: &[&str] = &["SEQ", "BUNDLE TYPE"];

/// Suffixes that gate the street matcher. Checked case-sensitively.
const STREET_SUFFIXES: &[&str] = &["DR", "RD", "ST"];

// ── Line preprocessing ───────────────────────────────────────────────────────

/// Trimmed, non-empty lines of `text`, in their original order.
pub fn normalize_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty())
}

/// Table header or column-title noise. Never yields a stop.
pub fn is_header_line(line: &str) -> bool {
    HEADER_MARKERS.iter().any(|m| line.contains(m))
}

// ── Field matchers ───────────────────────────────────────────────────────────

/// Split a line into its leading sequence marker and the trimmed remainder.
pub fn match_sequence(line: &str) -> Option<(&str, &str)> {
    let m = re_leading_digits().find(line)?;
    Some((m.as_str(), line[m.end()..].trim()))
}

/// Letters and spaces ending in `DR`, `RD` or `ST`.
///
/// Any word containing one of those pairs passes the gate, so names like
/// "CHRISTINE" can be picked up as a street.
pub fn match_street(payload: &str) -> Option<String> {
    if !STREET_SUFFIXES.iter().any(|s| payload.contains(s)) {
        return None;
    }
    let street = re_street().find(payload)?.as_str().trim();
    (!street.is_empty()).then(|| street.to_string())
}

pub fn match_unit(payload: &str) -> Option<&str> {
    re_unit().find(payload).map(|m| m.as_str())
}

/// House number directly after the sequence marker.
pub fn match_address(payload: &str) -> Option<&str> {
    re_leading_digits().find(payload).map(|m| m.as_str())
}

/// Free text following a four-digit marker at the right of the row.
pub fn match_additional_info(payload: &str) -> Option<&str> {
    let c = re_additional_info().captures(payload)?;
    let info = c.get(1)?.as_str().trim();
    (!info.is_empty()).then_some(info)
}

// ── Carry-over state ─────────────────────────────────────────────────────────

/// The most recent street name seen in the current page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreetCarry(String);

impl StreetCarry {
    pub fn new(street: impl Into<String>) -> Self {
        StreetCarry(street.into())
    }

    pub fn street(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Line extraction ──────────────────────────────────────────────────────────

/// Turn one trimmed, non-header line into a stop.
///
/// Returns `None` and the unchanged carry when the line has no sequence
/// marker. A street matched on this line replaces the carry.
pub fn extract_stop(line: &str, carry: StreetCarry) -> (Option<StopRecord>, StreetCarry) {
    let Some((sequence, payload)) = match_sequence(line) else {
        return (None, carry);
    };

    let own_street = match_street(payload);
    let street_name = own_street.clone().unwrap_or_else(|| carry.0.clone());
    let carry = own_street.map(StreetCarry).unwrap_or(carry);

    let stop = StopRecord {
        sequence: sequence.to_string(),
        address: match_address(payload).unwrap_or_default().to_string(),
        street_name,
        unit: match_unit(payload).unwrap_or_default().to_string(),
        delivery_type: DEFAULT_DELIVERY_TYPE.to_string(),
        additional_info: match_additional_info(payload).map(str::to_string),
        notes: String::new(),
    };

    (Some(stop), carry)
}

// ── Batch parsing ────────────────────────────────────────────────────────────

/// Line accounting for one parsed page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseSummary {
    pub lines: usize,
    pub headers: usize,
    pub skipped: usize,
    pub stops: usize,
}

/// Folds the extractor over every line of one page of OCR text.
pub struct RouteParser;

impl RouteParser {
    pub fn parse(text: &str) -> Vec<StopRecord> {
        Self::parse_with_summary(text).0
    }

    pub fn parse_with_summary(text: &str) -> (Vec<StopRecord>, ParseSummary) {
        Self::parse_lines_with_summary(normalize_lines(text))
    }

    /// Same fold over lines that were already normalized.
    pub fn parse_lines<'a, I>(lines: I) -> Vec<StopRecord>
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::parse_lines_with_summary(lines).0
    }

    fn parse_lines_with_summary<'a, I>(lines: I) -> (Vec<StopRecord>, ParseSummary)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let (stops, summary, _) = lines.into_iter().fold(
            (Vec::new(), ParseSummary::default(), StreetCarry::default()),
            |(mut stops, mut summary, carry), line| {
                summary.lines += 1;
                if is_header_line(line) {
                    summary.headers += 1;
                    return (stops, summary, carry);
                }
                let (stop, carry) = extract_stop(line, carry);
                match stop {
                    Some(stop) => {
                        summary.stops += 1;
                        stops.push(stop);
                    }
                    None => summary.skipped += 1,
                }
                (stops, summary, carry)
            },
        );
        (stops, summary)
    }
}

/// Parse one page of OCR text into stops. An empty result is not an error.
pub fn parse_route_text(text: &str) -> Vec<StopRecord> {
    RouteParser::parse(text)
}

/// [`parse_route_text`] over lines that were already normalized.
pub fn parse_route_lines<'a, I>(lines: I) -> Vec<StopRecord>
where
    I: IntoIterator<Item = &'a str>,
{
    RouteParser::parse_lines(lines)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Preprocessing ─────────────────────────────────────────────────────────

    #[test]
    fn normalize_trims_and_drops_blank_lines() {
        let lines: Vec<_> = normalize_lines("  1 100 OAK RD \n\n   \n\t2 102\r\n").collect();
        assert_eq!(lines, ["1 100 OAK RD", "2 102"]);
    }

    #[test]
    fn normalize_is_idempotent() {
        let text = " SEQ ADDRESS \n\n 5 100 OAK RD\n  6 102  \n";
        let once: Vec<_> = normalize_lines(text).collect();
        let joined = once.join("\n");
        let twice: Vec<_> = normalize_lines(&joined).collect();
        assert_eq!(once, twice);
    }

    // ── Header filter ─────────────────────────────────────────────────────────

    #[test]
    fn header_detection_is_substring_and_case_sensitive() {
        assert!(is_header_line("SEQ ADDRESS BUNDLE TYPE"));
        assert!(is_header_line("12 SEQUENCE 100"));
        assert!(is_header_line("x BUNDLE TYPE y"));
        assert!(!is_header_line("seq address"));
        assert!(!is_header_line("BUNDLE  TYPE"));
    }

    // ── Matchers ──────────────────────────────────────────────────────────────

    #[test]
    fn sequence_splits_marker_and_payload() {
        assert_eq!(match_sequence("12 100 ELM DR"), Some(("12", "100 ELM DR")));
        assert_eq!(match_sequence("7"), Some(("7", "")));
        assert_eq!(match_sequence("A12 100"), None);
        assert_eq!(match_sequence(""), None);
    }

    #[test]
    fn street_requires_uppercase_gate() {
        assert_eq!(match_street("100 OAK RD"), Some("OAK RD".to_string()));
        assert_eq!(match_street("100 ELM DR APT 4"), Some("ELM DR".to_string()));
        assert_eq!(match_street("100 main st"), None);
        assert_eq!(match_street("102"), None);
    }

    #[test]
    fn street_match_is_case_insensitive_after_gate() {
        // Gate passes on the "ST" in STAN.
        assert_eq!(match_street("100 Elm dr 2024 STAN"), Some("Elm dr".to_string()));
        // Longest letter run wins.
        assert_eq!(match_street("100 Oak rd ST"), Some("Oak rd ST".to_string()));
    }

    #[test]
    fn street_false_positive_on_names() {
        assert_eq!(match_street("2024 CHRISTINE"), Some("CHRIST".to_string()));
    }

    #[test]
    fn street_gate_passes_but_match_fails() {
        // Gate sees "ST" but there is no letter run before a suffix.
        assert_eq!(match_street("ST"), None);
        assert_eq!(match_street("4ST"), None);
    }

    #[test]
    fn unit_matches_apt_token() {
        assert_eq!(match_unit("100 ELM DR APT 4"), Some("APT 4"));
        assert_eq!(match_unit("100 ELM DR apt12"), Some("apt12"));
        assert_eq!(match_unit("100 ELM DR APT"), None);
    }

    #[test]
    fn address_is_leading_digits_of_payload() {
        assert_eq!(match_address("100 OAK RD"), Some("100"));
        assert_eq!(match_address("OAK RD 100"), None);
    }

    #[test]
    fn additional_info_after_four_digits() {
        assert_eq!(match_additional_info("ELM DR 2024 JOHN SMITH"), Some("JOHN SMITH"));
        assert_eq!(match_additional_info("100 OAK RD"), None);
        assert_eq!(match_additional_info("100 OAK RD 2024"), None);
    }

    #[test]
    fn only_ascii_digits_count() {
        assert!(parse_route_text("\u{0663} 100 OAK RD").is_empty());
        assert!(parse_route_text("\u{FF11}\u{FF12} 100 OAK RD").is_empty());

        let stops = parse_route_text("7 \u{FF11}\u{FF12} OAK RD APT \u{0664}");
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].address, "");
        assert_eq!(stops[0].unit, "");

        assert_eq!(match_additional_info("ELM DR \u{0661}\u{0662}\u{0663}\u{0664} JOHN"), None);
    }

    // ── Line extraction ───────────────────────────────────────────────────────

    #[test]
    fn non_stop_line_keeps_carry() {
        let carry = StreetCarry::new("MAIN ST");
        let (stop, next) = extract_stop("ROUTE 12 NOTES", carry.clone());
        assert!(stop.is_none());
        assert_eq!(next, carry);
    }

    #[test]
    fn street_match_replaces_carry() {
        let (stop, carry) = extract_stop("5 100 OAK RD", StreetCarry::new("MAIN ST"));
        assert_eq!(stop.unwrap().street_name, "OAK RD");
        assert_eq!(carry.street(), "OAK RD");
    }

    #[test]
    fn no_street_and_no_carry_leaves_street_empty() {
        let (stop, carry) = extract_stop("9 300", StreetCarry::default());
        let stop = stop.unwrap();
        assert_eq!(stop.street_name, "");
        assert_eq!(stop.address, "300");
        assert!(carry.is_empty());
    }

    #[test]
    fn scenario_a_greedy_sequence() {
        let (stop, _) = extract_stop("12100 ELM DR APT 4 2024 JOHN SMITH", StreetCarry::default());
        let stop = stop.unwrap();
        assert_eq!(stop.sequence, "12100");
        assert_eq!(stop.address, "");
        assert_eq!(stop.street_name, "ELM DR");
        assert_eq!(stop.unit, "APT 4");
        assert_eq!(stop.additional_info.as_deref(), Some("JOHN SMITH"));
        assert_eq!(stop.delivery_type, "CURB R");
        assert_eq!(stop.notes, "");
    }

    #[test]
    fn scenario_a_with_separator() {
        let (stop, _) = extract_stop("12 100 ELM DR APT 4 2024 JOHN SMITH", StreetCarry::default());
        let stop = stop.unwrap();
        assert_eq!(stop.sequence, "12");
        assert_eq!(stop.address, "100");
        assert!(stop.street_name.contains("ELM DR"));
        assert_eq!(stop.unit, "APT 4");
        assert_eq!(stop.additional_info.as_deref(), Some("JOHN SMITH"));
    }

    // ── Batch parsing ─────────────────────────────────────────────────────────

    #[test]
    fn scenario_b_street_carries_over() {
        let stops = parse_route_text("5 100 OAK RD\n6 102");
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[1].street_name, stops[0].street_name);
        assert_eq!(stops[1].street_name, "OAK RD");
        assert_eq!(stops[1].address, "102");
    }

    #[test]
    fn carry_over_law() {
        let stops = parse_route_text("1 10 MAIN ST\n2 12\n3 14 APT 2");
        assert!(stops.iter().all(|s| s.street_name == "MAIN ST"));
    }

    #[test]
    fn carry_survives_noise_lines() {
        let stops = parse_route_text("1 10 MAIN ST\n~~ smudge ~~\n2 12");
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[1].street_name, "MAIN ST");
    }

    #[test]
    fn scenario_c_header_yields_nothing() {
        assert!(parse_route_text("SEQ ADDRESS BUNDLE TYPE").is_empty());
        assert!(parse_route_text("12 SEQ 100 OAK RD").is_empty());
    }

    #[test]
    fn header_does_not_touch_carry() {
        let stops = parse_route_text("1 10 MAIN ST\n3 SEQ 40 ELM DR\n2 12");
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[1].street_name, "MAIN ST");
    }

    #[test]
    fn scenario_d_no_stops_is_empty() {
        assert!(parse_route_text("ROUTE EDIT BOOK\nCARRIER NOTES\n").is_empty());
        assert!(parse_route_text("").is_empty());
    }

    #[test]
    fn sequences_follow_input_order() {
        let text = "SEQ ADDRESS\n3 1 A ST\nnoise\n1 2\n\n20 3 B RD";
        let seqs: Vec<_> = parse_route_text(text).into_iter().map(|s| s.sequence).collect();
        assert_eq!(seqs, ["3", "1", "20"]);
    }

    #[test]
    fn parse_lines_matches_parse_text() {
        let text = " 5 100 OAK RD \n\n6 102\n";
        let lines: Vec<_> = normalize_lines(text).collect();
        assert_eq!(parse_route_lines(lines), parse_route_text(text));
    }

    #[test]
    fn summary_counts_every_line() {
        let text = "SEQ ADDRESS BUNDLE TYPE\n1 10 MAIN ST\nsmudge\n2 12\n";
        let (stops, summary) = RouteParser::parse_with_summary(text);
        assert_eq!(stops.len(), 2);
        assert_eq!(
            summary,
            ParseSummary { lines: 4, headers: 1, skipped: 1, stops: 2 }
        );
    }

    #[test]
    fn parses_are_independent() {
        let first = parse_route_text("1 10 MAIN ST");
        let second = parse_route_text("2 12");
        assert_eq!(first[0].street_name, "MAIN ST");
        assert_eq!(second[0].street_name, "");
    }

    #[test]
    fn no_panic_on_garbage_input() {
        let _ = parse_route_text("!@#$%^&*()\n\0\x01\x02\n9999999999999999999999 ÄÖÜ ST");
    }
}
