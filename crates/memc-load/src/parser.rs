// Installed-apps line parser
//
// Input lines are TAB separated:
//   dev_type  dev_id  lat  lon  app_id,app_id,...
// Example:
//   idfa	1rfw452y52g2gq4g	55.55	42.42	1423,43,567,3,7,23

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Reasons a line is rejected; each one counts as a parse error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Malformed line: {0}")]
    MalformedLine(&'static str),

    #[error("Invalid {field} coordinate: '{value}'")]
    InvalidCoordinate { field: &'static str, value: String },
}

/// Non-fatal problems found in an accepted line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// An app id token that is not a u32; it was left out of the record
    UnrecognizedAppId(String),
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseWarning::UnrecognizedAppId(token) => {
                write!(f, "Not all user apps are digits: '{}'", token)
            },
        }
    }
}

// ============================================================================
// Record
// ============================================================================

/// One parsed device record
#[derive(Debug, Clone, PartialEq)]
pub struct AppsInstalled {
    pub dev_type: String,
    pub dev_id: String,
    pub lat: f64,
    pub lon: f64,
    pub apps: Vec<u32>,
}

impl AppsInstalled {
    /// Store key: `<dev_type>:<dev_id>`
    pub fn store_key(&self) -> String {
        store_key(&self.dev_type, &self.dev_id)
    }
}

pub fn store_key(dev_type: &str, dev_id: &str) -> String {
    format!("{}:{}", dev_type, dev_id)
}

/// A record plus any warnings raised while reading it
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub record: AppsInstalled,
    pub warnings: Vec<ParseWarning>,
}

// ============================================================================
// Parser
// ============================================================================

const MIN_FIELDS: usize = 5;

/// Parse one input line
///
/// Returns `Ok(None)` for blank lines, which are skipped without counting.
pub fn parse_line(line: &str) -> Result<Option<ParsedLine>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < MIN_FIELDS {
        return Err(ParseError::MalformedLine("too few fields"));
    }

    let (dev_type, dev_id) = (fields[0], fields[1]);
    if dev_type.is_empty() {
        return Err(ParseError::MalformedLine("missing device type"));
    }
    if dev_id.is_empty() {
        return Err(ParseError::MalformedLine("missing device id"));
    }

    let lat = parse_coordinate("latitude", fields[2])?;
    let lon = parse_coordinate("longitude", fields[3])?;

    let mut apps = Vec::new();
    let mut warnings = Vec::new();
    for token in fields[4].split(',') {
        match parse_app_id(token) {
            Some(app) => apps.push(app),
            None => warnings.push(ParseWarning::UnrecognizedAppId(token.to_string())),
        }
    }

    Ok(Some(ParsedLine {
        record: AppsInstalled {
            dev_type: dev_type.to_string(),
            dev_id: dev_id.to_string(),
            lat,
            lon,
            apps,
        },
        warnings,
    }))
}

/// Parse one raw input line
///
/// A line that is not valid UTF-8 is rejected rather than repaired, so a
/// device id is never rewritten into a different store key.
pub fn parse_raw_line(raw: &[u8]) -> Result<Option<ParsedLine>, ParseError> {
    let line =
        std::str::from_utf8(raw).map_err(|_| ParseError::MalformedLine("not valid UTF-8"))?;
    parse_line(line)
}

/// Unsigned decimal only; `u32::from_str` alone would also take a leading `+`
fn parse_app_id(token: &str) -> Option<u32> {
    if !token.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn parse_coordinate(field: &'static str, raw: &str) -> Result<f64, ParseError> {
    raw.parse::<f64>().map_err(|_| ParseError::InvalidCoordinate {
        field,
        value: raw.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLE: &str = "idfa\t1rfw452y52g2gq4g\t55.55\t42.42\t1423,43,567,3,7,23";

    #[test]
    fn test_parse_sample_line() {
        let parsed = parse_line(SAMPLE).unwrap().unwrap();

        assert_eq!(parsed.record.dev_type, "idfa");
        assert_eq!(parsed.record.dev_id, "1rfw452y52g2gq4g");
        assert_eq!(parsed.record.lat, 55.55);
        assert_eq!(parsed.record.lon, 42.42);
        assert_eq!(parsed.record.apps, vec![1423, 43, 567, 3, 7, 23]);
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let line = format!("  {}\r\n", SAMPLE);
        let parsed = parse_line(&line).unwrap().unwrap();
        assert_eq!(parsed.record.apps.last(), Some(&23));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   \t  \n").unwrap(), None);
    }

    #[test]
    fn test_too_few_fields() {
        assert_eq!(
            parse_line("idfa\tabc\t1.0\t2.0").unwrap_err(),
            ParseError::MalformedLine("too few fields")
        );
    }

    #[test]
    fn test_missing_device_id() {
        let err = parse_line("gaid\t\t1.0\t2.0\t1").unwrap_err();
        assert_eq!(err, ParseError::MalformedLine("missing device id"));
    }

    #[test]
    fn test_leading_tab_is_trimmed_away() {
        // An empty device type collapses into a short line once trimmed
        let err = parse_line("\tid\t1.0\t2.0\t1").unwrap_err();
        assert_eq!(err, ParseError::MalformedLine("too few fields"));
    }

    #[test]
    fn test_invalid_coordinates() {
        let err = parse_line("gaid\tid\tnorth\t2.0\t1").unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidCoordinate { field: "latitude", .. }
        ));

        let err = parse_line("gaid\tid\t1.0\t\t1").unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidCoordinate { field: "longitude", .. }
        ));
    }

    #[test]
    fn test_out_of_range_coordinates_are_accepted() {
        let parsed = parse_line("adid\tid\t-500.5\t1e3\t1").unwrap().unwrap();
        assert_eq!(parsed.record.lat, -500.5);
        assert_eq!(parsed.record.lon, 1000.0);
    }

    #[test]
    fn test_non_numeric_apps_are_dropped_with_warning() {
        let parsed = parse_line("dvid\tid\t1\t2\t10,abc,20,,4294967296,30")
            .unwrap()
            .unwrap();

        assert_eq!(parsed.record.apps, vec![10, 20, 30]);
        assert_eq!(
            parsed.warnings,
            vec![
                ParseWarning::UnrecognizedAppId("abc".to_string()),
                ParseWarning::UnrecognizedAppId(String::new()),
                ParseWarning::UnrecognizedAppId("4294967296".to_string()),
            ]
        );
    }

    #[test]
    fn test_signed_app_ids_are_dropped_with_warning() {
        let parsed = parse_line("idfa\tid\t1\t2\t+5,7,-3").unwrap().unwrap();

        assert_eq!(parsed.record.apps, vec![7]);
        assert_eq!(
            parsed.warnings,
            vec![
                ParseWarning::UnrecognizedAppId("+5".to_string()),
                ParseWarning::UnrecognizedAppId("-3".to_string()),
            ]
        );
    }

    #[test]
    fn test_raw_line_must_be_utf8() {
        let err = parse_raw_line(b"idfa\tab\xffcd\t1\t2\t3").unwrap_err();
        assert_eq!(err, ParseError::MalformedLine("not valid UTF-8"));

        // Distinct invalid ids must not collapse onto one key
        assert!(parse_raw_line(b"idfa\tab\xfecd\t1\t2\t3").is_err());

        let parsed = parse_raw_line("gaid\tc\u{e9}\t1\t2\t3\n".as_bytes()).unwrap().unwrap();
        assert_eq!(parsed.record.store_key(), "gaid:c\u{e9}");
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let parsed = parse_line("idfa\tid\t1\t2\t5,6\textra\tmore").unwrap().unwrap();
        assert_eq!(parsed.record.apps, vec![5, 6]);
    }

    #[test]
    fn test_store_key() {
        let parsed = parse_line(SAMPLE).unwrap().unwrap();
        assert_eq!(parsed.record.store_key(), "idfa:1rfw452y52g2gq4g");
    }

    #[test]
    fn test_store_key_does_not_collide_across_known_types() {
        // Known device types never contain ':', so the first ':' always
        // separates the type from the id.
        assert_ne!(store_key("idfa", "abc"), store_key("gaid", "abc"));
        assert_ne!(store_key("idfa", "a:b"), store_key("idfa", "a"));
        assert_eq!(store_key("idfa", "a:b").split_once(':'), Some(("idfa", "a:b")));
    }

    fn field() -> impl Strategy<Value = String> {
        "[a-z0-9]{1,16}"
    }

    proptest! {
        #[test]
        fn prop_valid_lines_round_trip(
            dev_type in field(),
            dev_id in field(),
            lat in -1.0e6f64..1.0e6,
            lon in -1.0e6f64..1.0e6,
            apps in proptest::collection::vec(any::<u32>(), 1..20),
        ) {
            let raw_apps: Vec<String> = apps.iter().map(|a| a.to_string()).collect();
            let line = format!("{}\t{}\t{}\t{}\t{}", dev_type, dev_id, lat, lon, raw_apps.join(","));

            let parsed = parse_line(&line).unwrap().unwrap();
            prop_assert_eq!(parsed.record.dev_type, dev_type);
            prop_assert_eq!(parsed.record.dev_id, dev_id);
            prop_assert_eq!(parsed.record.lat, lat);
            prop_assert_eq!(parsed.record.lon, lon);
            prop_assert_eq!(parsed.record.apps, apps);
            prop_assert!(parsed.warnings.is_empty());
        }

        #[test]
        fn prop_short_lines_are_rejected(fields in proptest::collection::vec(field(), 1..5)) {
            let line = fields.join("\t");
            prop_assert_eq!(
                parse_line(&line).unwrap_err(),
                ParseError::MalformedLine("too few fields")
            );
        }

        #[test]
        fn prop_bad_latitude_is_rejected(lat in "[a-z]{1,8}") {
            prop_assume!(lat.parse::<f64>().is_err());
            let line = format!("idfa\tid\t{}\t1.0\t1", lat);
            let rejected = matches!(parse_line(&line), Err(ParseError::InvalidCoordinate { .. }));
            prop_assert!(rejected);
        }

        #[test]
        fn prop_store_key_is_injective(
            a in field(), b in field(), c in field(), d in field(),
        ) {
            prop_assume!((a.as_str(), b.as_str()) != (c.as_str(), d.as_str()));
            prop_assert_ne!(store_key(&a, &b), store_key(&c, &d));
        }
    }
}
