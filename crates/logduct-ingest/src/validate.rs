//! Field accessor and validator
//!
//! Converts a [`RawEntry`] into a [`TypedRow`], enforcing the destination
//! schema: integer and float fields must parse, string fields must fit their
//! column.
//!
//! `upstream_response_time` is logged as `-` when nginx served the request
//! without contacting an upstream; that placeholder loads as `0.0`.
//! `request_time` is always set by nginx, so `-` there is rejected like any
//! other non-number.

use logduct_common::types::{TypedRow, LONG_TEXT_MAX, SHORT_TEXT_MAX};

use crate::error::ValidationError;
use crate::reader::RawEntry;

/// Raw value nginx writes for a variable with no value
pub const ABSENT_PLACEHOLDER: &str = "-";

/// Typed lookups into one raw entry
pub struct FieldAccessor<'a> {
    entry: &'a RawEntry,
    line: u64,
}

impl<'a> FieldAccessor<'a> {
    pub fn new(entry: &'a RawEntry, line: u64) -> Self {
        Self { entry, line }
    }

    fn raw(&self, field: &str) -> Result<&'a str, ValidationError> {
        self.entry
            .get(field)
            .ok_or_else(|| ValidationError::MissingField {
                line: self.line,
                field: field.to_string(),
            })
    }

    /// Verbatim string, at most `limit` bytes of UTF-8
    pub fn string(&self, field: &str, limit: usize) -> Result<String, ValidationError> {
        let value = self.raw(field)?;
        if value.len() > limit {
            return Err(ValidationError::TooLong {
                line: self.line,
                field: field.to_string(),
                limit,
                value: value.to_string(),
            });
        }
        Ok(value.to_string())
    }

    /// Base-10 signed integer
    pub fn integer(&self, field: &str) -> Result<i64, ValidationError> {
        let value = self.raw(field)?;
        value.parse().map_err(|_| ValidationError::InvalidInteger {
            line: self.line,
            field: field.to_string(),
            value: value.to_string(),
        })
    }

    /// Decimal number
    pub fn float(&self, field: &str) -> Result<f64, ValidationError> {
        let value = self.raw(field)?;
        self.parse_float(field, value)
    }

    /// Decimal number, or `0.0` when the raw value is exactly `-`
    pub fn float_or_zero(&self, field: &str) -> Result<f64, ValidationError> {
        let value = self.raw(field)?;
        if value == ABSENT_PLACEHOLDER {
            return Ok(0.0);
        }
        self.parse_float(field, value)
    }

    fn parse_float(&self, field: &str, value: &str) -> Result<f64, ValidationError> {
        value.parse().map_err(|_| ValidationError::InvalidFloat {
            line: self.line,
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

/// Validate one entry read from source line `line`
pub fn validate(entry: &RawEntry, line: u64) -> Result<TypedRow, ValidationError> {
    let fields = FieldAccessor::new(entry, line);

    let status = fields.integer("status")?;
    let body_bytes_sent = fields.integer("body_bytes_sent")?;
    let upstream_response_time = fields.float_or_zero("upstream_response_time")?;
    let request_time = fields.float("request_time")?;

    Ok(TypedRow {
        line_no: line,
        request: fields.string("request", LONG_TEXT_MAX)?,
        status,
        body_bytes_sent,
        remote_addr: fields.string("remote_addr", SHORT_TEXT_MAX)?,
        upstream_response_time,
        http_x_forwarded_for: fields.string("http_x_forwarded_for", SHORT_TEXT_MAX)?,
        host: fields.string("host", SHORT_TEXT_MAX)?,
        remote_user: fields.string("remote_user", SHORT_TEXT_MAX)?,
        time_local: fields.string("time_local", SHORT_TEXT_MAX)?,
        http_referer: fields.string("http_referer", LONG_TEXT_MAX)?,
        http_user_agent: fields.string("http_user_agent", LONG_TEXT_MAX)?,
        request_time,
    })
}
