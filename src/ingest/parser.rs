//! Record Parser
//!
//! Source lines are delimiter-separated integers: the first field is the
//! timestamp, the rest are values. No header, no quoting, no escaping.
//!
//! ```text
//! 100,1,2      → Record { timestamp: 100, values: [1, 2] }
//! 100          → Record { timestamp: 100, values: [] }
//! abc,1,2      → RecordError::InvalidTimestamp("abc")
//! 100,1,       → RecordError::InvalidValue { field: 2, value: "" }
//! ```

use crate::storage::{RecordError, Record};

/// Parse one line into a record
pub fn parse_record(line: &str, delimiter: char) -> Result<Record, RecordError> {
    if line.trim().is_empty() {
        return Err(RecordError::Empty);
    }

    let mut fields = line.split(delimiter);

    // split always yields at least one field
    let head = fields.next().unwrap_or_default().trim();
    let timestamp = head
        .parse::<i64>()
        .map_err(|_| RecordError::InvalidTimestamp(head.to_string()))?;

    let values = fields
        .enumerate()
        .map(|(i, field)| {
            let field = field.trim();
            field.parse::<i64>().map_err(|_| RecordError::InvalidValue {
                field: i + 1,
                value: field.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Record { timestamp, values })
}

/// Parse a sequence of lines, stopping at the first bad one
///
/// The error carries the 1-based position of the offending line.
pub fn parse_lines<'a, I>(lines: I, delimiter: char) -> Result<Vec<Record>, (u64, RecordError)>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| parse_record(line, delimiter).map_err(|e| (i as u64 + 1, e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let record = parse_record("100,1,2", ',').unwrap();
        assert_eq!(record, Record::new(100, vec![1, 2]));
    }

    #[test]
    fn test_parse_timestamp_only() {
        let record = parse_record("100", ',').unwrap();
        assert_eq!(record.timestamp, 100);
        assert!(record.values.is_empty());
    }

    #[test]
    fn test_parse_negative_and_padded() {
        let record = parse_record(" -5 , -1,  7 ", ',').unwrap();
        assert_eq!(record, Record::new(-5, vec![-1, 7]));
    }

    #[test]
    fn test_parse_custom_delimiter() {
        let record = parse_record("100\t3\t4", '\t').unwrap();
        assert_eq!(record, Record::new(100, vec![3, 4]));
    }

    #[test]
    fn test_invalid_timestamp() {
        assert_eq!(
            parse_record("abc,1,2", ','),
            Err(RecordError::InvalidTimestamp("abc".to_string()))
        );
    }

    #[test]
    fn test_invalid_value() {
        assert_eq!(
            parse_record("100,1,x", ','),
            Err(RecordError::InvalidValue {
                field: 2,
                value: "x".to_string()
            })
        );

        // trailing delimiter leaves an empty field
        assert!(matches!(
            parse_record("100,1,", ','),
            Err(RecordError::InvalidValue { field: 2, .. })
        ));

        // no silent truncation of floats
        assert!(parse_record("100,1.5", ',').is_err());
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(parse_record("", ','), Err(RecordError::Empty));
        assert_eq!(parse_record("   ", ','), Err(RecordError::Empty));
    }

    #[test]
    fn test_parse_lines_reports_position() {
        let ok = parse_lines(["1,1", "2,2"], ',').unwrap();
        assert_eq!(ok.len(), 2);

        let (line, err) = parse_lines(["1,1", "2,2", "oops"], ',').unwrap_err();
        assert_eq!(line, 3);
        assert_eq!(err, RecordError::InvalidTimestamp("oops".to_string()));
    }
}
