use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use qwire_proto::{check_error, deserialize_atom, deserialize_symbol, deserialize_vector, peek_type};
use qwire_proto::{wire, ByteBuffer, ProtoError};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A command result: serialized as-is for JSON, shown as field/value rows
/// otherwise.
pub trait Report: Serialize {
    fn rows(&self) -> Vec<(&'static str, String)>;
}

pub fn print_report<R: Report>(report: &R, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (field, value) in report.rows() {
                table.add_row(vec![field.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line: Vec<String> = report
                .rows()
                .into_iter()
                .map(|(field, value)| format!("{field}={value}"))
                .collect();
            println!("{}", line.join(" "));
        }
    }
}

/// Generic null, the usual answer to a statement with no value.
const GENERIC_NULL: i8 = 101;

/// Short human-readable rendering of a response payload.
pub fn describe_payload(payload: &ByteBuffer) -> Result<String, ProtoError> {
    check_error(payload)?;
    let ty = peek_type(payload)?;
    let text = match ty {
        -1 => deserialize_atom::<wire::Boolean>(payload)?.to_string(),
        -6 => deserialize_atom::<wire::Int>(payload)?.to_string(),
        -7 => deserialize_atom::<wire::Long>(payload)?.to_string(),
        -9 => deserialize_atom::<wire::Float>(payload)?.to_string(),
        -11 => format!("`{}", deserialize_symbol(payload)?),
        6 => join(deserialize_vector::<wire::Int>(payload)?),
        7 => join(deserialize_vector::<wire::Long>(payload)?),
        9 => join(deserialize_vector::<wire::Float>(payload)?),
        10 => {
            let chars = deserialize_vector::<wire::Char>(payload)?;
            format!("{:?}", String::from_utf8_lossy(&chars))
        }
        GENERIC_NULL => "::".to_string(),
        other => format!("<type {other}, {} bytes>", payload.len()),
    };
    Ok(text)
}

fn join<T: ToString>(values: Vec<T>) -> String {
    let parts: Vec<String> = values.iter().map(ToString::to_string).collect();
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use qwire_proto::{Endian, ProtocolLevel, Serializer};

    use super::*;

    #[test]
    fn describes_common_payloads() {
        let ser = Serializer::new(ProtocolLevel::LATEST);
        let ints = ser.vector::<wire::Int, _>(vec![1, 2, 3]).unwrap();
        assert_eq!(describe_payload(&ints).unwrap(), "1 2 3");

        let atom = ser.atom::<wire::Long>(42).unwrap();
        assert_eq!(describe_payload(&atom).unwrap(), "42");

        let text = ser.vector::<wire::Char, _>(b"hi".iter().copied()).unwrap();
        assert_eq!(describe_payload(&text).unwrap(), "\"hi\"");

        let null = ByteBuffer::from_slice(&[101, 0], Endian::Little);
        assert_eq!(describe_payload(&null).unwrap(), "::");
    }

    #[test]
    fn server_errors_are_not_described() {
        let err = ByteBuffer::from_slice(b"\x80rank\0", Endian::Little);
        assert!(matches!(describe_payload(&err), Err(ProtoError::Remote(msg)) if msg == "rank"));
    }
}
