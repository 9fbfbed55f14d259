//! Built-in payload codec self-test (`--test`)

use thiserror::Error;
use tracing::info;

use crate::codec::{decode, encode, CodecError, UserApps};
use crate::parser::{parse_line, ParseError};

/// Sample lines exercised by the self-test
pub const SAMPLE_LINES: [&str; 2] = [
    "idfa\t1rfw452y52g2gq4g\t55.55\t42.42\t1423,43,567,3,7,23",
    "gaid\t7rfw452y52g2gq4g\t55.55\t42.42\t7423,424",
];

#[derive(Debug, Error)]
pub enum SelfTestError {
    #[error("Sample line {line} rejected: {source}")]
    Parse {
        line: usize,
        #[source]
        source: ParseError,
    },

    #[error("Sample line {line} is blank")]
    Blank { line: usize },

    #[error("Sample line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: CodecError,
    },

    #[error("Sample line {line} did not survive encoding: {expected:?} != {actual:?}")]
    Mismatch {
        line: usize,
        expected: UserApps,
        actual: UserApps,
    },
}

/// Encode and decode every sample line, returning how many were checked
pub fn run() -> Result<usize, SelfTestError> {
    check_lines(&SAMPLE_LINES)
}

/// Check that each line's payload decodes back to the same message
pub fn check_lines(lines: &[&str]) -> Result<usize, SelfTestError> {
    for (idx, raw) in lines.iter().enumerate() {
        let line = idx + 1;
        let parsed = parse_line(raw)
            .map_err(|source| SelfTestError::Parse { line, source })?
            .ok_or(SelfTestError::Blank { line })?;

        let record = parsed.record;
        let expected = UserApps::from(&record);
        let payload = encode(&record);
        let actual = decode(&payload).map_err(|source| SelfTestError::Decode { line, source })?;

        if actual != expected {
            return Err(SelfTestError::Mismatch {
                line,
                expected,
                actual,
            });
        }
        info!(key = %record.store_key(), bytes = payload.len(), "Sample payload round-trips");
    }
    Ok(lines.len())
}
