use std::fs;

use qwire_proto::{encode_frame, ByteBuffer, Compression, Endian, FrameOptions, MessageKind};
use serde::Serialize;
use tracing::info;

use crate::cmd::CompressArgs;
use crate::exit::{io_error, proto_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat, Report};

#[derive(Serialize)]
struct CompressOutput {
    input: String,
    payload_bytes: usize,
    uncompressed_frame_bytes: u64,
    frame_bytes: usize,
    compression: Compression,
    ratio: f64,
    out: Option<String>,
}

impl Report for CompressOutput {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("input", self.input.clone()),
            ("payload_bytes", self.payload_bytes.to_string()),
            (
                "uncompressed_frame_bytes",
                self.uncompressed_frame_bytes.to_string(),
            ),
            ("frame_bytes", self.frame_bytes.to_string()),
            ("compression", format!("{:?}", self.compression).to_lowercase()),
            ("ratio", format!("{:.3}", self.ratio)),
            ("out", self.out.clone().unwrap_or_else(|| "-".to_string())),
        ]
    }
}

pub fn run(args: CompressArgs, format: OutputFormat) -> CliResult<i32> {
    let data = fs::read(&args.input)
        .map_err(|err| io_error(&format!("failed reading {}", args.input.display()), err))?;
    let payload_bytes = data.len();

    let options = FrameOptions {
        compression_threshold: args.threshold,
        ..FrameOptions::default()
    };
    let frame = encode_frame(
        ByteBuffer::from_vec(data, Endian::NATIVE),
        MessageKind::Async,
        &options,
    )
    .map_err(|err| proto_error("encode failed", &err))?;

    if let Some(path) = &args.out {
        fs::write(path, frame.to_bytes())
            .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
        info!(path = %path.display(), bytes = frame.wire_size(), "frame written");
    }

    let out = CompressOutput {
        input: args.input.display().to_string(),
        payload_bytes,
        uncompressed_frame_bytes: frame.uncompressed_len,
        frame_bytes: frame.wire_size(),
        compression: frame.compression,
        ratio: frame.wire_size() as f64 / frame.uncompressed_len as f64,
        out: args.out.as_ref().map(|path| path.display().to_string()),
    };
    print_report(&out, format);
    Ok(SUCCESS)
}
