use qwire_conn::Message;
use qwire_proto::{wire, ByteBuffer, ProtoError, Serializer};
use serde::Serialize;

use crate::cmd::handshake::open;
use crate::cmd::{PayloadArgs, SendArgs};
use crate::exit::{conn_error, proto_error, CliResult, SUCCESS};
use crate::output::{describe_payload, print_report, OutputFormat, Report};

#[derive(Serialize)]
struct SendOutput {
    kind: &'static str,
    level: u8,
    sent_bytes: usize,
    response: Option<ResponseOutput>,
}

#[derive(Serialize)]
struct ResponseOutput {
    kind: String,
    compression: String,
    wire_bytes: u64,
    payload_bytes: usize,
    value: String,
}

impl Report for SendOutput {
    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("kind", self.kind.to_string()),
            ("level", self.level.to_string()),
            ("sent_bytes", self.sent_bytes.to_string()),
        ];
        if let Some(response) = &self.response {
            rows.extend([
                ("response_kind", response.kind.clone()),
                ("response_compression", response.compression.clone()),
                ("response_wire_bytes", response.wire_bytes.to_string()),
                ("response_payload_bytes", response.payload_bytes.to_string()),
                ("response_value", response.value.clone()),
            ]);
        }
        rows
    }
}

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let mut conn = open(&args.connect)?;
    let payload = build_payload(&conn.serializer(), &args.payload)
        .map_err(|err| proto_error("invalid payload", &err))?;
    let sent_bytes = payload.len();

    let response = if args.async_ {
        conn.send_async(payload)
            .map_err(|err| conn_error("send failed", err))?;
        None
    } else {
        let message = conn
            .send_sync(payload)
            .map_err(|err| conn_error("request failed", err))?;
        Some(describe(&message)?)
    };

    let out = SendOutput {
        kind: if args.async_ { "async" } else { "sync" },
        level: conn.level().get(),
        sent_bytes,
        response,
    };
    print_report(&out, format);
    Ok(SUCCESS)
}

fn build_payload(ser: &Serializer, args: &PayloadArgs) -> Result<ByteBuffer, ProtoError> {
    if let Some(value) = args.int {
        return ser.atom::<wire::Int>(value);
    }
    if let Some(values) = &args.ints {
        return ser.vector::<wire::Int, _>(values.iter().copied());
    }
    if let Some(values) = &args.longs {
        return ser.vector::<wire::Long, _>(values.iter().copied());
    }
    let query = args.query.as_deref().unwrap_or_default();
    ser.vector::<wire::Char, _>(query.bytes())
}

fn describe(message: &Message) -> CliResult<ResponseOutput> {
    let value = describe_payload(&message.payload)
        .map_err(|err| proto_error("server replied", &err))?;
    Ok(ResponseOutput {
        kind: message.kind.to_string(),
        compression: format!("{:?}", message.compression).to_lowercase(),
        wire_bytes: message.wire_len,
        payload_bytes: message.payload.len(),
        value,
    })
}
