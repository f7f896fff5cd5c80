use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;

lazy_static! {
    /// nginx `ui_short` layout:
    /// $remote_addr $remote_user $http_x_real_ip [$time_local] "$request"
    /// $status $body_bytes_sent "$http_referer" "$http_user_agent"
    /// "$http_x_forwarded_for" "$http_X_REQUEST_ID" "$http_X_RB_USER"
    /// $request_time
    static ref LINE_PATTERN: Regex = Regex::new(concat!(
        r"^\S+\s+",            // remote_addr
        r"\S+\s+",             // remote_user
        r"\S+\s+",             // http_x_real_ip
        r"\[[^\]]*\]\s+",      // time_local
        r#""(?P<request>[^"]*)"\s+"#,
        r"\S+\s+",             // status
        r"\S+\s+",             // body_bytes_sent
        r#""[^"]*"\s+"#,       // http_referer
        r#""[^"]*"\s+"#,       // http_user_agent
        r#""[^"]*"\s+"#,       // http_x_forwarded_for
        r#""[^"]*"\s+"#,       // http_x_request_id
        r#""[^"]*"\s+"#,       // http_x_rb_user
        r"(?P<request_time>\S+)\s*$",
    ))
    .unwrap();
}

/// Longest slice of a failed line kept for diagnostics
const MAX_DIAGNOSTIC_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedRecord {
    pub url: String,
    /// Seconds spent serving the request, never negative
    pub duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureReason {
    /// The line does not have the expected delimited fields
    FieldLayout,
    /// The quoted request is not `METHOD target PROTOCOL`
    MalformedRequest,
    /// The trailing field is not a finite non-negative number
    InvalidDuration,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureReason::FieldLayout => "unexpected field layout",
            FailureReason::MalformedRequest => "malformed request field",
            FailureReason::InvalidDuration => "invalid request time",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseFailure {
    pub reason: FailureReason,
    /// Offending line, truncated
    pub line: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParseOutcome {
    Record(ParsedRecord),
    Failure(ParseFailure),
}

pub struct LineParser;

impl LineParser {
    /// Parse a single access log line. Never panics; every line yields an outcome.
    pub fn parse(line: &str) -> ParseOutcome {
        match Self::try_parse(line) {
            Ok(record) => ParseOutcome::Record(record),
            Err(reason) => ParseOutcome::Failure(ParseFailure {
                reason,
                line: line.chars().take(MAX_DIAGNOSTIC_CHARS).collect(),
            }),
        }
    }

    fn try_parse(line: &str) -> Result<ParsedRecord, FailureReason> {
        let caps = LINE_PATTERN
            .captures(line)
            .ok_or(FailureReason::FieldLayout)?;

        let url = request_target(&caps["request"]).ok_or(FailureReason::MalformedRequest)?;
        let duration = parse_duration(&caps["request_time"]).ok_or(FailureReason::InvalidDuration)?;

        Ok(ParsedRecord {
            url: url.to_string(),
            duration,
        })
    }
}

/// Target of a `METHOD target PROTOCOL` request line
fn request_target(request: &str) -> Option<&str> {
    let mut parts = request.split_whitespace();
    let (_method, target, _protocol) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    Some(target)
}

fn parse_duration(raw: &str) -> Option<f64> {
    let value: f64 = raw.parse().ok()?;
    // Rejects NaN, infinities and -0.0 along with ordinary negatives
    (value.is_finite() && value.is_sign_positive()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_LINE: &str = concat!(
        r#"1.196.116.32 -  - [29/Jun/2017:03:50:22 +0300] "GET /api/v2/banner/25019354 HTTP/1.1" "#,
        r#"200 927 "-" "Lynx/2.8.8dev.9 libwww-FM/2.14 SSL-MM/1.4.1 GNUTLS/2.10.5" "-" "#,
        r#""1498697422-2190034393-4708-9752759" "dc7161be3" 0.390"#
    );

    fn failure_reason(line: &str) -> FailureReason {
        match LineParser::parse(line) {
            ParseOutcome::Failure(f) => f.reason,
            ParseOutcome::Record(r) => panic!("expected failure, got {:?}", r),
        }
    }

    #[test]
    fn test_parse_valid_line() {
        match LineParser::parse(VALID_LINE) {
            ParseOutcome::Record(record) => {
                assert_eq!(record.url, "/api/v2/banner/25019354");
                assert_eq!(record.duration, 0.390);
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_keeps_query_string() {
        let line = r#"1.1.1.1 - - [29/Jun/2017:03:50:22 +0300] "GET /test/url?id=1 HTTP/1.1" 200 123 "-" "UserAgent" "-" "req-id" "-" 0.456"#;
        match LineParser::parse(line) {
            ParseOutcome::Record(record) => {
                assert_eq!(record.url, "/test/url?id=1");
                assert_eq!(record.duration, 0.456);
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_duration_is_valid() {
        let line = VALID_LINE.replace(" 0.390", " 0");
        assert!(matches!(
            LineParser::parse(&line),
            ParseOutcome::Record(ParsedRecord { duration: 0.0, .. })
        ));
    }

    #[test]
    fn test_missing_duration_is_failure() {
        let line = VALID_LINE.trim_end_matches(" 0.390");
        assert_eq!(failure_reason(line), FailureReason::FieldLayout);
    }

    #[test]
    fn test_too_few_fields_is_failure() {
        assert_eq!(failure_reason("garbage"), FailureReason::FieldLayout);
        assert_eq!(failure_reason(""), FailureReason::FieldLayout);
    }

    #[test]
    fn test_malformed_request_is_failure() {
        let line = VALID_LINE.replace("GET /api/v2/banner/25019354 HTTP/1.1", "0");
        assert_eq!(failure_reason(&line), FailureReason::MalformedRequest);

        let line = VALID_LINE.replace("GET /api/v2/banner/25019354 HTTP/1.1", "GET /a b HTTP/1.1");
        assert_eq!(failure_reason(&line), FailureReason::MalformedRequest);
    }

    #[test]
    fn test_negative_duration_is_failure() {
        let line = VALID_LINE.replace(" 0.390", " -0.390");
        assert_eq!(failure_reason(&line), FailureReason::InvalidDuration);
    }

    #[test]
    fn test_non_numeric_duration_is_failure() {
        for bad in [" abc", " NaN", " inf", " -0"] {
            let line = VALID_LINE.replace(" 0.390", bad);
            assert_eq!(failure_reason(&line), FailureReason::InvalidDuration, "{}", bad);
        }
    }

    #[test]
    fn test_failure_line_is_truncated() {
        let line = "x".repeat(500);
        match LineParser::parse(&line) {
            ParseOutcome::Failure(f) => assert_eq!(f.line.chars().count(), MAX_DIAGNOSTIC_CHARS),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
