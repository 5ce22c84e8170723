//! # Device Info Reader
//!
//! Read-only queries about the device and its taxpayer.
//!
//! ## Queries
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DEV_STATE       ≥10 fields, hard fail when short                       │
//! │                  NIM,IFU,time,counter,sell,settlement,A,B,C,D           │
//! │                                                                         │
//! │  NETWORK_STATE   ≥3 fields, empty record when short or E: (no error)    │
//! │                  uploaded,on-device,last-connection                     │
//! │                                                                         │
//! │  TAXPAYER_INFO   I0 name │ I1 + " " + I2 address │ I3 city              │
//! │                  I4 phone │ I5 email                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each query fills only its own slice of [`DeviceInfo`].

use chrono::FixedOffset;
use fiscal_core::DeviceInfo;
use tracing::{debug, warn};

use crate::channel::{exchange, DeviceChannel};
use crate::error::{DeviceError, DeviceResult};
use crate::parser::{is_device_error, ResponseParser};
use crate::payload::taxpayer_info_payload;
use crate::protocol::{
    Command, Step, DEVICE_STATE_FIELDS, FIELD_DELIMITER, NETWORK_STATE_FIELDS, TAXPAYER_INFO_FIELDS,
};

/// Issues the read-only queries against one device.
pub struct DeviceInfoReader<'a, C: DeviceChannel + ?Sized> {
    channel: &'a mut C,
    tz: FixedOffset,
}

impl<'a, C: DeviceChannel + ?Sized> DeviceInfoReader<'a, C> {
    /// Creates a reader decoding device timestamps in `tz`.
    pub fn new(channel: &'a mut C, tz: FixedOffset) -> Self {
        DeviceInfoReader { channel, tz }
    }

    /// Device identity, clock, counters and tax rates.
    pub fn device_state(&mut self) -> DeviceResult<DeviceInfo> {
        let step = Step::DeviceState;
        let raw = exchange(&mut *self.channel, step, Command::DeviceState.code(), "")?;
        let response = ResponseParser::new(step, FIELD_DELIMITER, DEVICE_STATE_FIELDS).parse(&raw)?;

        let time = response.timestamp(2, &self.tz);
        if time.is_none() {
            warn!(raw = response.field(2), "Device clock field is not a valid timestamp");
        }

        Ok(DeviceInfo {
            nim: response.string(0),
            ifu: response.string(1),
            time,
            counter: response.string(3),
            sell_bill_counter: response.string(4),
            settlement_bill_counter: response.string(5),
            tax_a: response.string(6),
            tax_b: response.string(7),
            tax_c: response.string(8),
            tax_d: response.string(9),
            ..Default::default()
        })
    }

    /// Document upload state with the tax authority server.
    ///
    /// Any answer shorter than three fields, a device error included,
    /// yields an empty record instead of an error. Only a channel fault
    /// fails.
    pub fn tax_server_state(&mut self) -> DeviceResult<DeviceInfo> {
        let step = Step::NetworkState;
        let raw = exchange(&mut *self.channel, step, Command::NetworkState.code(), "")?;
        if is_device_error(&raw) {
            warn!(raw = %raw, "Device error on network state query, nothing to report");
            return Ok(DeviceInfo::default());
        }

        let parser = ResponseParser::new(step, FIELD_DELIMITER, NETWORK_STATE_FIELDS);

        let Some(response) = parser.parse_lenient(&raw)? else {
            debug!(raw = %raw, "Short network state response, nothing to report");
            return Ok(DeviceInfo::default());
        };

        Ok(DeviceInfo {
            uploaded_document_count: response.string(0),
            document_on_device_count: response.string(1),
            last_connection_to_server: response.timestamp(2, &self.tz),
            ..Default::default()
        })
    }

    /// Taxpayer name, address and contacts, one sub-query per field.
    pub fn taxpayer_info(&mut self) -> DeviceResult<DeviceInfo> {
        let mut info = DeviceInfo::default();

        for index in 0..TAXPAYER_INFO_FIELDS {
            let value = self.taxpayer_field(index)?;
            match index {
                0 => info.company_name = value,
                1 => info.company_location_address = value,
                2 => {
                    info.company_location_address.push(' ');
                    info.company_location_address.push_str(&value);
                }
                3 => info.company_location_city = value,
                4 => info.company_contact_phone = value,
                _ => info.company_contact_email = value,
            }
        }

        Ok(info)
    }

    /// Runs all three queries and merges them into one record.
    pub fn snapshot(&mut self) -> DeviceResult<DeviceInfo> {
        let state = self.device_state()?;
        let link = self.tax_server_state()?;
        let taxpayer = self.taxpayer_info()?;
        Ok(state.merge(link).merge(taxpayer))
    }

    fn taxpayer_field(&mut self, index: u8) -> DeviceResult<String> {
        let step = Step::TaxpayerInfo;
        let raw = exchange(
            &mut *self.channel,
            step,
            Command::TaxpayerInfo.code(),
            &taxpayer_info_payload(index),
        )?;
        if is_device_error(&raw) {
            return Err(DeviceError::protocol(
                step,
                format!("taxpayer field I{index} rejected"),
                raw,
            ));
        }
        Ok(raw.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelError;
    use crate::mock::ScriptedChannel;
    use chrono::{Datelike, Timelike};

    fn wat() -> FixedOffset {
        FixedOffset::east_opt(3600).unwrap()
    }

    #[test]
    fn test_device_state_populates_fields_in_order() {
        let mut channel = ScriptedChannel::new();
        channel.push_ok("N1,F1,20240101120000,5,3,2,A,B,C,D");

        let info = DeviceInfoReader::new(&mut channel, wat()).device_state().unwrap();
        assert_eq!(info.nim, "N1");
        assert_eq!(info.ifu, "F1");
        assert_eq!(info.time.unwrap().year(), 2024);
        assert_eq!(info.counter, "5");
        assert_eq!(info.sell_bill_counter, "3");
        assert_eq!(info.settlement_bill_counter, "2");
        assert_eq!(info.tax_rates(), ["A", "B", "C", "D"]);
        assert_eq!(channel.sent(), &[(Command::DeviceState.code(), String::new())]);
    }

    #[test]
    fn test_device_state_short_response_fails() {
        let mut channel = ScriptedChannel::new();
        channel.push_ok("N1,F1,20240101120000,5,3,2,A,B,C");

        let err = DeviceInfoReader::new(&mut channel, wat()).device_state().unwrap_err();
        assert!(err.is_protocol_error());
        assert_eq!(err.step(), Some(Step::DeviceState));
        assert_eq!(err.raw_response(), Some("N1,F1,20240101120000,5,3,2,A,B,C"));
    }

    #[test]
    fn test_device_state_bad_clock_is_tolerated() {
        let mut channel = ScriptedChannel::new();
        channel.push_ok("N1,F1,garbage,5,3,2,A,B,C,D");

        let info = DeviceInfoReader::new(&mut channel, wat()).device_state().unwrap();
        assert!(info.time.is_none());
        assert_eq!(info.tax_d, "D");
    }

    #[test]
    fn test_tax_server_state() {
        let mut channel = ScriptedChannel::new();
        channel.push_ok("12,3,20240315093000");

        let info = DeviceInfoReader::new(&mut channel, wat())
            .tax_server_state()
            .unwrap();
        assert_eq!(info.uploaded_document_count, "12");
        assert_eq!(info.document_on_device_count, "3");
        let last = info.last_connection_to_server.unwrap();
        assert_eq!((last.month(), last.hour()), (3, 9));
    }

    #[test]
    fn test_tax_server_state_short_response_is_empty_record() {
        for raw in ["12,3", "", "E:05", "E:05,link down,x"] {
            let mut channel = ScriptedChannel::new();
            channel.push_ok(raw);

            let info = DeviceInfoReader::new(&mut channel, wat())
                .tax_server_state()
                .unwrap();
            assert_eq!(info, DeviceInfo::default(), "response {raw:?}");
        }
    }

    #[test]
    fn test_tax_server_state_channel_error_fails() {
        let mut channel = ScriptedChannel::new();
        channel.push_error(ChannelError::Framing("bad checksum".into()));

        let err = DeviceInfoReader::new(&mut channel, wat())
            .tax_server_state()
            .unwrap_err();
        assert!(err.is_channel_error());
        assert_eq!(err.step(), Some(Step::NetworkState));
    }

    #[test]
    fn test_device_state_error_marker_fails() {
        let mut channel = ScriptedChannel::new();
        channel.push_ok("E:05");

        let err = DeviceInfoReader::new(&mut channel, wat()).device_state().unwrap_err();
        assert!(err.is_protocol_error());
        assert_eq!(err.raw_response(), Some("E:05"));
    }

    #[test]
    fn test_taxpayer_field_error_marker_fails() {
        let mut channel = ScriptedChannel::new();
        channel.push_ok("ACME SARL").push_ok("E:07");

        let err = DeviceInfoReader::new(&mut channel, wat())
            .taxpayer_info()
            .unwrap_err();
        assert!(err.is_protocol_error());
        assert_eq!(err.step(), Some(Step::TaxpayerInfo));
        assert_eq!(channel.sent().len(), 2);
    }

    #[test]
    fn test_taxpayer_info_joins_address_lines() {
        let mut channel = ScriptedChannel::new();
        channel
            .push_ok("ACME SARL")
            .push_ok("Lot 12")
            .push_ok("Quartier Zongo")
            .push_ok("Cotonou")
            .push_ok("+229 0000")
            .push_ok("info@acme.bj");

        let info = DeviceInfoReader::new(&mut channel, wat()).taxpayer_info().unwrap();
        assert_eq!(info.company_name, "ACME SARL");
        assert_eq!(info.company_location_address, "Lot 12 Quartier Zongo");
        assert_eq!(info.company_location_city, "Cotonou");
        assert_eq!(info.company_contact_phone, "+229 0000");
        assert_eq!(info.company_contact_email, "info@acme.bj");

        let payloads: Vec<&str> = channel.sent().iter().map(|(_, p)| p.as_str()).collect();
        assert_eq!(payloads, ["I0", "I1", "I2", "I3", "I4", "I5"]);
    }

    #[test]
    fn test_taxpayer_info_stops_on_channel_error() {
        let mut channel = ScriptedChannel::new();
        channel
            .push_ok("ACME SARL")
            .push_error(ChannelError::Framing("bad checksum".into()));

        let err = DeviceInfoReader::new(&mut channel, wat())
            .taxpayer_info()
            .unwrap_err();
        assert!(err.is_channel_error());
        assert_eq!(channel.sent().len(), 2);
    }

    #[test]
    fn test_snapshot_merges_all_queries() {
        let mut channel = ScriptedChannel::new();
        channel
            .push_ok("N1,F1,20240101120000,5,3,2,A,B,C,D")
            .push_ok("12,3,20240101110000")
            .push_ok("ACME")
            .push_ok("Lot 12")
            .push_ok("Zongo")
            .push_ok("Cotonou")
            .push_ok("0000")
            .push_ok("a@b.bj");

        let info = DeviceInfoReader::new(&mut channel, wat()).snapshot().unwrap();
        assert_eq!(info.nim, "N1");
        assert_eq!(info.uploaded_document_count, "12");
        assert_eq!(info.company_location_address, "Lot 12 Zongo");
    }
}
