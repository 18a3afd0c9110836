use std::fs;

use qwire_proto::{decode_frame, Compression, MessageKind};
use serde::Serialize;
use tracing::info;

use crate::cmd::DecompressArgs;
use crate::exit::{io_error, proto_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat, Report};

#[derive(Serialize)]
struct DecompressOutput {
    input: String,
    kind: MessageKind,
    compression: Compression,
    little_endian: bool,
    frame_bytes: u64,
    payload_bytes: usize,
    out: Option<String>,
}

impl Report for DecompressOutput {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("input", self.input.clone()),
            ("kind", self.kind.to_string()),
            ("compression", format!("{:?}", self.compression).to_lowercase()),
            ("little_endian", self.little_endian.to_string()),
            ("frame_bytes", self.frame_bytes.to_string()),
            ("payload_bytes", self.payload_bytes.to_string()),
            ("out", self.out.clone().unwrap_or_else(|| "-".to_string())),
        ]
    }
}

pub fn run(args: DecompressArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = fs::read(&args.input)
        .map_err(|err| io_error(&format!("failed reading {}", args.input.display()), err))?;
    let (header, payload) =
        decode_frame(&bytes).map_err(|err| proto_error("decode failed", &err))?;

    if let Some(path) = &args.out {
        fs::write(path, payload.as_slice())
            .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
        info!(path = %path.display(), bytes = payload.len(), "payload written");
    }

    let out = DecompressOutput {
        input: args.input.display().to_string(),
        kind: header.kind,
        compression: header.compression,
        little_endian: header.endian.flag() == 1,
        frame_bytes: header.total_len,
        payload_bytes: payload.len(),
        out: args.out.as_ref().map(|path| path.display().to_string()),
    };
    print_report(&out, format);
    Ok(SUCCESS)
}
