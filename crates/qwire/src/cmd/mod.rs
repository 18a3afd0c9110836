use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use qwire_conn::HandshakeConfig;
use qwire_proto::{ProtocolLevel, DEFAULT_COMPRESSION_THRESHOLD};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod compress;
pub mod decompress;
pub mod handshake;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect, negotiate a protocol level and print it.
    Handshake(ConnectArgs),
    /// Serialize a value and send it to a server.
    Send(SendArgs),
    /// Wrap a file as the payload of a compressed frame.
    Compress(CompressArgs),
    /// Decode a frame file, decompressing it if flagged.
    Decompress(DecompressArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Handshake(args) => handshake::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Compress(args) => compress::run(args, format),
        Command::Decompress(args) => decompress::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Credentials as user:password.
    #[arg(long, env = "QWIRE_CREDENTIALS", hide_env_values = true)]
    pub credentials: Option<String>,
    /// Protocol level to request (0-3, 5 or 6).
    #[arg(long, default_value = "6", value_parser = parse_level)]
    pub level: ProtocolLevel,
    /// Socket timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

impl ConnectArgs {
    pub fn handshake_config(&self) -> CliResult<HandshakeConfig> {
        let mut config = HandshakeConfig::default()
            .with_level(self.level)
            .with_timeout(Some(parse_duration(&self.timeout)?));
        if let Some(credentials) = &self.credentials {
            config = config.with_credentials(credentials.clone());
        }
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Send asynchronously and do not wait for a response.
    #[arg(long = "async")]
    pub async_: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct PayloadArgs {
    /// A single int atom.
    #[arg(long)]
    pub int: Option<i32>,
    /// An int vector (comma-separated).
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub ints: Option<Vec<i32>>,
    /// A long vector (comma-separated).
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub longs: Option<Vec<i64>>,
    /// A q expression, sent as a char vector.
    #[arg(long)]
    pub query: Option<String>,
}

#[derive(Args, Debug)]
pub struct CompressArgs {
    /// File whose contents become the frame payload.
    pub input: PathBuf,
    /// Write the encoded frame here.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
    /// Compress only frames larger than this many bytes.
    #[arg(long, default_value_t = DEFAULT_COMPRESSION_THRESHOLD)]
    pub threshold: usize,
}

#[derive(Args, Debug)]
pub struct DecompressArgs {
    /// Frame file, as written by `compress --out`.
    pub input: PathBuf,
    /// Write the decoded payload here.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_level(input: &str) -> Result<ProtocolLevel, String> {
    let raw: u8 = input
        .parse()
        .map_err(|_| format!("invalid protocol level: {input}"))?;
    ProtocolLevel::new(raw).map_err(|err| err.to_string())
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn parse_level_rejects_reserved_level() {
        assert_eq!(parse_level("3").unwrap().get(), 3);
        assert!(parse_level("4").is_err());
        assert!(parse_level("7").is_err());
        assert!(parse_level("x").is_err());
    }
}
