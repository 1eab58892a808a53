use anyhow::{Context, Result};
use drivesafe::types::FatigueDto;
use std::fs;
use std::io::{self, Read};

#[derive(Debug, PartialEq)]
pub enum Upload {
    One(FatigueDto),
    Many(Vec<FatigueDto>),
}

pub fn read_json_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .with_context(|| "Failed to read JSON from stdin")?;
        Ok(buffer)
    } else {
        fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))
    }
}

/// Parses either a single record object or an array of records.
pub fn parse_upload(payload: &str) -> Result<Upload> {
    let value: serde_json::Value =
        serde_json::from_str(payload).with_context(|| "Failed to parse records JSON")?;
    if value.is_array() {
        let records = serde_json::from_value(value)
            .with_context(|| "Failed to parse records JSON array")?;
        Ok(Upload::Many(records))
    } else {
        let record =
            serde_json::from_value(value).with_context(|| "Failed to parse record JSON object")?;
        Ok(Upload::One(record))
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_upload, Upload};

    #[test]
    fn single_object_is_one_record() {
        let upload = parse_upload(r#"{"score": 42.0, "detected_at": 1700000000000}"#).unwrap();
        match upload {
            Upload::One(record) => assert_eq!(record.detected_at, 1_700_000_000_000),
            Upload::Many(_) => panic!("expected a single record"),
        }
    }

    #[test]
    fn array_is_batch() {
        let upload = parse_upload(r#"[{"score": 1.0}, {"score": 2.0}]"#).unwrap();
        assert!(matches!(upload, Upload::Many(ref records) if records.len() == 2));
    }

    #[test]
    fn scalar_is_rejected() {
        assert!(parse_upload("12").is_err());
    }
}
