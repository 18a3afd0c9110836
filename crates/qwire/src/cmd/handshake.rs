use qwire_conn::{ConnectOptions, Connection, ConnectionState};
use serde::Serialize;
use tracing::debug;

use crate::cmd::ConnectArgs;
use crate::exit::{conn_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat, Report};

#[derive(Serialize)]
struct HandshakeOutput {
    host: String,
    port: u16,
    transport: &'static str,
    state: ConnectionState,
    requested_level: u8,
    level: u8,
    compression: bool,
}

impl Report for HandshakeOutput {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("host", self.host.clone()),
            ("port", self.port.to_string()),
            ("transport", self.transport.to_string()),
            ("state", self.state.to_string()),
            ("requested_level", self.requested_level.to_string()),
            ("level", self.level.to_string()),
            ("compression", self.compression.to_string()),
        ]
    }
}

pub fn run(args: ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let conn = open(&args)?;

    let out = HandshakeOutput {
        host: args.host,
        port: args.port,
        transport: conn.transport().transport_name(),
        state: ConnectionState::Ready,
        requested_level: args.level.get(),
        level: conn.level().get(),
        compression: conn.frame_options().compression,
    };
    print_report(&out, format);
    Ok(SUCCESS)
}

/// Connect and negotiate according to `args`.
pub fn open(args: &ConnectArgs) -> CliResult<Connection<qwire_transport::KxStream>> {
    let config = args.handshake_config()?;
    debug!(?config, host = %args.host, port = args.port, "connecting");

    let options = ConnectOptions::new(args.host.clone(), args.port).with_timeout(config.timeout);
    Connection::connect_with(&options, &config).map_err(|err| conn_error("connect failed", err))
}
