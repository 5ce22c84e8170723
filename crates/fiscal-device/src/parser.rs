//! # Response Parser
//!
//! Positional decoding of device response text.
//!
//! ```text
//!   raw "P,1500.00,0.00,3000.00"
//!        │
//!        ├── starts with "E:"?          ──► ProtocolError (raw kept)
//!        ├── split on delimiter
//!        ├── fewer than min fields?     ──► ProtocolError (raw kept)
//!        ▼
//!   ParsedResponse ["P", "1500.00", "0.00", "3000.00"]
//! ```
//!
//! Timestamp fields are tolerant: a malformed one decodes to `None`
//! instead of failing the response.

use chrono::{DateTime, FixedOffset};
use fiscal_core::{decode_device_timestamp, Amount};

use crate::error::{DeviceError, DeviceResult};
use crate::protocol::{Step, DEVICE_ERROR_MARKER};

/// Returns true when `raw` is an explicit device error.
pub fn is_device_error(raw: &str) -> bool {
    raw.trim_start().starts_with(DEVICE_ERROR_MARKER)
}

/// Splits and validates device responses for one protocol step.
#[derive(Debug, Clone, Copy)]
pub struct ResponseParser {
    step: Step,
    delimiter: char,
    min_fields: usize,
}

impl ResponseParser {
    pub fn new(step: Step, delimiter: char, min_fields: usize) -> Self {
        ResponseParser {
            step,
            delimiter,
            min_fields,
        }
    }

    /// Splits `raw` into fields, failing on a device error marker or a
    /// short response.
    pub fn parse<'a>(&self, raw: &'a str) -> DeviceResult<ParsedResponse<'a>> {
        if is_device_error(raw) {
            return Err(DeviceError::protocol(self.step, "device reported an error", raw));
        }

        let response = self.split(raw);
        if response.len() < self.min_fields {
            return Err(DeviceError::protocol(
                self.step,
                format!(
                    "expected at least {} fields, got {}",
                    self.min_fields,
                    response.len()
                ),
                raw,
            ));
        }
        Ok(response)
    }

    /// Splits `raw` without enforcing the minimum field count.
    ///
    /// For queries that accept a short answer as "nothing to report".
    pub fn parse_lenient<'a>(&self, raw: &'a str) -> DeviceResult<Option<ParsedResponse<'a>>> {
        if is_device_error(raw) {
            return Err(DeviceError::protocol(self.step, "device reported an error", raw));
        }

        let response = self.split(raw);
        Ok((response.len() >= self.min_fields).then_some(response))
    }

    fn split<'a>(&self, raw: &'a str) -> ParsedResponse<'a> {
        let trimmed = raw.trim();
        let fields = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split(self.delimiter).map(str::trim).collect()
        };
        ParsedResponse {
            step: self.step,
            raw,
            fields,
        }
    }
}

/// Ordered fields of one device response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse<'a> {
    step: Step,
    raw: &'a str,
    fields: Vec<&'a str>,
}

impl<'a> ParsedResponse<'a> {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn fields(&self) -> &[&'a str] {
        &self.fields
    }

    /// Field at `index`, or `""` past the end.
    pub fn field(&self, index: usize) -> &'a str {
        self.fields.get(index).copied().unwrap_or_default()
    }

    /// Owned copy of the field at `index`.
    pub fn string(&self, index: usize) -> String {
        self.field(index).to_string()
    }

    /// Fails unless the first field equals `marker`.
    pub fn expect_marker(&self, marker: &str) -> DeviceResult<()> {
        match self.fields.first() {
            Some(first) if *first == marker => Ok(()),
            other => Err(DeviceError::protocol(
                self.step,
                format!(
                    "expected marker {marker:?}, got {:?}",
                    other.copied().unwrap_or_default()
                ),
                self.raw,
            )),
        }
    }

    /// Tolerant timestamp decode of the field at `index`.
    pub fn timestamp(&self, index: usize, tz: &FixedOffset) -> Option<DateTime<FixedOffset>> {
        decode_device_timestamp(self.field(index), tz)
    }

    /// Strict decimal decode of the field at `index`.
    pub fn amount(&self, index: usize) -> DeviceResult<Amount> {
        let field = self
            .fields
            .get(index)
            .ok_or_else(|| DeviceError::protocol(self.step, format!("missing field {index}"), self.raw))?;
        field.parse().map_err(|_| {
            DeviceError::protocol(
                self.step,
                format!("field {index} is not a decimal: {field:?}"),
                self.raw,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn wat() -> FixedOffset {
        FixedOffset::east_opt(3600).unwrap()
    }

    #[test]
    fn test_parse_splits_fields() {
        let parser = ResponseParser::new(Step::Subtotal, ',', 4);
        let response = parser.parse("P,1500.00,0.00,3000.00\r\n").unwrap();
        assert_eq!(response.len(), 4);
        assert_eq!(response.field(3), "3000.00");
        assert_eq!(response.field(9), "");
        assert!(response.expect_marker("P").is_ok());
    }

    #[test]
    fn test_short_response_is_protocol_error_with_raw() {
        let parser = ResponseParser::new(Step::DeviceState, ',', 10);
        let err = parser.parse("N1,F1").unwrap_err();
        assert!(err.is_protocol_error());
        assert_eq!(err.step(), Some(Step::DeviceState));
        assert_eq!(err.raw_response(), Some("N1,F1"));

        assert!(parser.parse("").is_err());
    }

    #[test]
    fn test_device_error_marker() {
        let parser = ResponseParser::new(Step::Payment, ',', 1);
        let err = parser.parse("E:0042,paper out").unwrap_err();
        assert!(err.is_protocol_error());
        assert_eq!(err.raw_response(), Some("E:0042,paper out"));

        assert!(parser.parse_lenient(" E:1").is_err());
    }

    #[test]
    fn test_marker_mismatch() {
        let parser = ResponseParser::new(Step::Subtotal, ',', 4);
        let response = parser.parse("X,1,2,3").unwrap();
        let err = response.expect_marker("P").unwrap_err();
        assert_eq!(err.raw_response(), Some("X,1,2,3"));
    }

    #[test]
    fn test_lenient_short_response() {
        let parser = ResponseParser::new(Step::NetworkState, ',', 3);
        assert!(parser.parse_lenient("12").unwrap().is_none());
        assert!(parser.parse_lenient("").unwrap().is_none());
        assert_eq!(parser.parse_lenient("1,2,3").unwrap().unwrap().len(), 3);
    }

    #[test]
    fn test_timestamp_field_is_tolerant() {
        let parser = ResponseParser::new(Step::NetworkState, ',', 3);
        let response = parser.parse("1,2,20240101120000").unwrap();
        assert_eq!(response.timestamp(2, &wat()).unwrap().hour(), 12);
        assert!(response.timestamp(0, &wat()).is_none());
        assert!(response.timestamp(7, &wat()).is_none());
    }

    #[test]
    fn test_amount_field() {
        let parser = ResponseParser::new(Step::Payment, ',', 5);
        let response = parser.parse("P,3000.00,3000.00,0.00,250.50").unwrap();
        assert_eq!(response.amount(4).unwrap(), Amount::from_micros(250_500_000));
        assert!(response.amount(0).is_err());
        assert!(response.amount(5).is_err());
    }

    #[test]
    fn test_custom_delimiter() {
        let parser = ResponseParser::new(Step::Finalize, ';', 5);
        let response = parser.parse("F;N1;SIG;F1;20240101120000").unwrap();
        assert!(response.expect_marker("F").is_ok());
        assert_eq!(response.field(2), "SIG");
    }
}
