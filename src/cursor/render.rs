//! # Step Output Rendering
//!
//! Every traversal mode funnels its result through the helpers here, so the
//! Structured/Flattened split lives in one place. Flattened output is
//! assembled in the cursor's reusable [`OutputBuf`] with the escaping rules
//! of [`crate::encoding::escape`]; Structured output clones the record's
//! parts into an owned value.

use crate::buffer::OutputBuf;
use crate::encoding::escape::append_pair;
use crate::record::GlobalRecord;

/// One rendered traversal step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutput {
    /// A bare value: a single-subscript key or a global name.
    Value(String),
    /// A structured key (all subscripts, in order) with optional data.
    Record {
        key: Vec<String>,
        data: Option<String>,
    },
    /// One SQL row as ordered `(column name, value)` pairs.
    Row(Vec<(String, String)>),
    /// The flattened `name=value&...` escaped encoding.
    Flat(String),
}

/// How a cursor renders each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Values, structured keys, and row maps.
    #[default]
    Structured,
    /// Percent-escaped `key..=..&data=..` strings.
    Flattened,
}

/// Single-global order output: a bare value for a one-subscript key without
/// data, a structured record otherwise. Flattened uses a plain `key=` for
/// one subscript and 1-based suffixes beyond that.
pub(crate) fn order_output(
    record: &GlobalRecord,
    want_data: bool,
    format: OutputFormat,
    buf: &mut OutputBuf,
) -> StepOutput {
    match format {
        OutputFormat::Flattened => flatten(record, want_data, false, buf),
        OutputFormat::Structured => {
            if !want_data && record.keyn() == 1 {
                StepOutput::Value(record.keys[0].clone())
            } else {
                StepOutput::Record {
                    key: record.keys.to_vec(),
                    data: if want_data { record.data.clone() } else { None },
                }
            }
        }
    }
}

/// Range output: always the full key list; Flattened always suffixes
/// (`key1=..`), even for a single subscript.
pub(crate) fn range_output(
    record: &GlobalRecord,
    want_data: bool,
    format: OutputFormat,
    buf: &mut OutputBuf,
) -> StepOutput {
    match format {
        OutputFormat::Flattened => flatten(record, want_data, true, buf),
        OutputFormat::Structured => StepOutput::Record {
            key: record.keys.to_vec(),
            data: if want_data { record.data.clone() } else { None },
        },
    }
}

/// Directory output: the global name, escaped as a single `key=` pair in
/// Flattened form.
pub(crate) fn name_output(name: &str, format: OutputFormat, buf: &mut OutputBuf) -> StepOutput {
    match format {
        OutputFormat::Structured => StepOutput::Value(name.to_string()),
        OutputFormat::Flattened => {
            buf.reset();
            append_pair(buf, "key", None, name.as_bytes());
            StepOutput::Flat(buf.take_string())
        }
    }
}

fn flatten(
    record: &GlobalRecord,
    want_data: bool,
    always_suffix: bool,
    buf: &mut OutputBuf,
) -> StepOutput {
    buf.reset();
    if record.keyn() == 1 && !always_suffix {
        append_pair(buf, "key", None, record.keys[0].as_bytes());
    } else {
        for (i, part) in record.keys.iter().enumerate() {
            append_pair(buf, "key", Some(i + 1), part.as_bytes());
        }
    }
    if want_data {
        if let Some(data) = &record.data {
            append_pair(buf, "data", None, data.as_bytes());
        }
    }
    StepOutput::Flat(buf.take_string())
}
