//! Log entry reader
//!
//! Streams a line source through a compiled [`LogFormatTemplate`], yielding one
//! [`RawEntry`] per line. The first line that cannot be read or matched ends the
//! stream with an error.

use std::collections::HashMap;
use std::io::BufRead;
use std::iter::FusedIterator;

use crate::error::{IngestError, ParseError, ParseFailure, Result};
use crate::template::LogFormatTemplate;

/// Untyped field values extracted from one line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    values: HashMap<String, String>,
}

impl RawEntry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: HashMap::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    /// Raw value of a field, `None` if the format has no such placeholder
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawEntry {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Iterator of `(line_no, RawEntry)` over a line source
///
/// Line numbers are 1-based and count every physical line. After an error the
/// iterator is exhausted.
pub struct EntryReader<'t, R> {
    source: R,
    template: &'t LogFormatTemplate,
    buf: Vec<u8>,
    line_no: u64,
    done: bool,
}

impl<'t, R: BufRead> EntryReader<'t, R> {
    pub fn new(source: R, template: &'t LogFormatTemplate) -> Self {
        Self {
            source,
            template,
            buf: Vec::new(),
            line_no: 0,
            done: false,
        }
    }

    /// Number of lines consumed so far
    pub fn lines_read(&self) -> u64 {
        self.line_no
    }

    fn fail(&mut self, err: IngestError) -> Option<Result<(u64, RawEntry)>> {
        self.done = true;
        Some(Err(err))
    }
}

impl<R: BufRead> Iterator for EntryReader<'_, R> {
    type Item = Result<(u64, RawEntry)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.buf.clear();
        match self.source.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.done = true;
                return None;
            },
            Ok(_) => {},
            Err(e) => return self.fail(e.into()),
        }
        self.line_no += 1;
        let line_no = self.line_no;

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }

        let matched = match std::str::from_utf8(&self.buf) {
            Ok(line) => self.template.match_line(line).ok_or(ParseFailure::NoMatch),
            Err(_) => Err(ParseFailure::InvalidUtf8),
        };

        match matched {
            Ok(entry) => Some(Ok((line_no, entry))),
            Err(reason) => self.fail(
                ParseError {
                    line: line_no,
                    reason,
                }
                .into(),
            ),
        }
    }
}

impl<R: BufRead> FusedIterator for EntryReader<'_, R> {}
