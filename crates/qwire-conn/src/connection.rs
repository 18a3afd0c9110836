use std::time::Duration;

use qwire_proto::{
    decode_payload, encode_frame, ByteBuffer, Compression, Endian, FrameOptions, MessageHeader,
    MessageKind, ProtoError, ProtocolLevel, Serializer, HEADER_SIZE,
};
use qwire_transport::{KxStream, Transport};
use tracing::{debug, info};

use crate::error::{ConnError, Result};
use crate::handshake::{handshake, HandshakeConfig};
use crate::io::{recv_exact, send_all};

/// Where and how to open the underlying stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    /// Socket read and write timeout. `None` blocks indefinitely.
    pub timeout: Option<Duration>,
    /// Always rejected; kept so callers fail loudly instead of silently
    /// talking plaintext.
    pub use_tls: bool,
}

impl ConnectOptions {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: None,
            use_tls: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// One received frame.
#[derive(Debug, Clone)]
pub struct Message {
    pub kind: MessageKind,
    /// Compression the frame arrived with. The payload is always
    /// decompressed.
    pub compression: Compression,
    /// Frame size on the wire, header included.
    pub wire_len: u64,
    pub payload: ByteBuffer,
}

/// A negotiated connection to a q process.
///
/// Not safe to share between threads: [`Connection::send_sync`] assumes no
/// one else reads from the transport between its send and receive.
pub struct Connection<T> {
    transport: T,
    level: ProtocolLevel,
    options: FrameOptions,
}

impl Connection<KxStream> {
    /// Open a stream to `host:port` and run the handshake.
    ///
    /// `config.timeout` becomes the socket timeout.
    pub fn connect(host: &str, port: u16, config: &HandshakeConfig) -> Result<Self> {
        let options = ConnectOptions::new(host, port).with_timeout(config.timeout);
        Self::connect_with(&options, config)
    }

    pub fn connect_with(options: &ConnectOptions, config: &HandshakeConfig) -> Result<Self> {
        let stream = KxStream::connect(&options.host, options.port, options.timeout, options.use_tls)
            .map_err(ConnError::transport("connecting"))?;
        info!(
            host = %options.host,
            port = options.port,
            transport = stream.transport_name(),
            "connected"
        );
        Self::handshake(stream, config)
    }
}

impl<T: Transport> Connection<T> {
    /// Run the handshake over an already connected transport.
    pub fn handshake(mut transport: T, config: &HandshakeConfig) -> Result<Self> {
        let level = handshake(&mut transport, config)?;
        let options = FrameOptions::new(level).with_compression(!transport.is_local());
        Ok(Self {
            transport,
            level,
            options,
        })
    }

    /// Negotiated protocol level.
    pub fn level(&self) -> ProtocolLevel {
        self.level
    }

    pub fn frame_options(&self) -> &FrameOptions {
        &self.options
    }

    /// Override the size above which outgoing frames are compressed.
    pub fn set_compression_threshold(&mut self, threshold: usize) {
        self.options.compression_threshold = threshold;
    }

    /// A serializer for the negotiated level.
    pub fn serializer(&self) -> Serializer {
        Serializer::new(self.level)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Send `payload` and wait for the server's response.
    pub fn send_sync(&mut self, payload: ByteBuffer) -> Result<Message> {
        self.send(payload, MessageKind::Sync)?;
        let message = self.receive()?;
        if message.kind != MessageKind::Response {
            return Err(ConnError::UnexpectedMessageKind {
                expected: MessageKind::Response,
                found: message.kind,
            });
        }
        Ok(message)
    }

    /// Send `payload` without waiting for a reply.
    pub fn send_async(&mut self, payload: ByteBuffer) -> Result<()> {
        self.send(payload, MessageKind::Async)
    }

    fn send(&mut self, payload: ByteBuffer, kind: MessageKind) -> Result<()> {
        let frame = encode_frame(payload, kind, &self.options)?;
        debug!(
            %kind,
            compression = ?frame.compression,
            uncompressed = frame.uncompressed_len,
            wire = frame.wire_size(),
            "sending frame"
        );
        send_all(&mut self.transport, &frame.header, "sending frame header")?;
        send_all(
            &mut self.transport,
            frame.payload.as_slice(),
            "sending frame payload",
        )
    }

    /// Block until one complete frame has arrived and return its payload,
    /// decompressed if it was compressed.
    pub fn receive(&mut self) -> Result<Message> {
        let raw = recv_exact(
            &mut self.transport,
            HEADER_SIZE,
            Endian::NATIVE,
            "reading frame header",
        )?;
        let mut bytes = [0u8; HEADER_SIZE];
        bytes.copy_from_slice(raw.as_slice());
        let header = MessageHeader::decode(&bytes)?;

        let payload_len = usize::try_from(header.payload_len()).map_err(|_| {
            ProtoError::Allocation {
                size: header.payload_len(),
            }
        })?;
        let body = recv_exact(
            &mut self.transport,
            payload_len,
            header.endian,
            "reading frame payload",
        )?;
        let payload = decode_payload(&header, body)?;

        debug!(
            kind = %header.kind,
            compression = ?header.compression,
            wire = header.total_len,
            payload = payload.len(),
            "received frame"
        );
        Ok(Message {
            kind: header.kind,
            compression: header.compression,
            wire_len: header.total_len,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use qwire_proto::{decode_frame, deserialize_vector, wire};

    use super::*;
    use crate::testing::ScriptedTransport;

    fn compressible(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i / 16 % 4) as u8).collect()
    }

    fn noise(len: usize) -> Vec<u8> {
        let mut state = 0x9e37_79b9u32;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state as u8
            })
            .collect()
    }

    fn response_frame(kind: MessageKind, payload: &[u8]) -> Vec<u8> {
        let header = MessageHeader {
            endian: Endian::Little,
            kind,
            compression: Compression::None,
            total_len: (HEADER_SIZE + payload.len()) as u64,
        };
        let mut frame = header.encode().expect("valid header").to_vec();
        frame.extend_from_slice(payload);
        frame
    }

    fn ready(inbound: Vec<Vec<u8>>) -> Connection<ScriptedTransport> {
        let mut script = vec![vec![6]];
        script.extend(inbound);
        Connection::handshake(ScriptedTransport::new(script), &HandshakeConfig::default())
            .expect("handshake should succeed")
    }

    #[test]
    fn insufficient_level_sends_nothing_further() {
        let mut transport = ScriptedTransport::new(vec![vec![3]]);
        let err = match Connection::handshake(&mut transport, &HandshakeConfig::default()) {
            Ok(_) => panic!("handshake should fail"),
            Err(err) => err,
        };
        assert!(matches!(err, ConnError::InsufficientLevel { supported: 3, .. }));
        assert_eq!(transport.sends, vec![vec![6, 0]]);
    }

    #[test]
    fn sync_send_compresses_over_remote_transport() {
        let data = compressible(3000);
        let mut conn = ready(vec![response_frame(MessageKind::Response, &[0xfa, 1, 0, 0, 0])]);

        let reply = conn
            .send_sync(ByteBuffer::from_slice(&data, Endian::Little))
            .expect("send_sync should succeed");
        assert_eq!(reply.kind, MessageKind::Response);
        assert_eq!(reply.payload.as_slice(), &[0xfa, 1, 0, 0, 0]);

        let sends = &conn.transport().sends;
        // capability, header, payload
        assert_eq!(sends.len(), 3);
        let header = &sends[1];
        assert_eq!(header.len(), 12);
        assert_eq!(header[1], MessageKind::Sync as u8);
        assert_eq!(header[2], 1);
        assert_eq!(&header[8..12], &3008u32.to_le_bytes());
        assert!(sends[2].len() < data.len() / 2);

        // the frame we sent decodes back to the original payload
        let sent = [&sends[1][..], &sends[2][..]].concat();
        let (_, decoded) = decode_frame(&sent).unwrap();
        assert_eq!(decoded.as_slice(), data.as_slice());
    }

    #[test]
    fn sync_send_of_incompressible_payload_is_raw() {
        let data = noise(3000);
        let mut conn = ready(vec![response_frame(MessageKind::Response, &[0xfa, 1, 0, 0, 0])]);

        conn.send_sync(ByteBuffer::from_slice(&data, Endian::Little))
            .expect("send_sync should succeed");

        let sends = &conn.transport().sends;
        assert_eq!(sends[1].len(), HEADER_SIZE);
        assert_eq!(sends[1][2], 0);
        assert_eq!(sends[2], data);
    }

    #[test]
    fn local_transport_never_compresses() {
        let data = compressible(3000);
        let transport = ScriptedTransport::new(vec![vec![6]]).local();
        let mut conn =
            Connection::handshake(transport, &HandshakeConfig::default()).expect("handshake");
        assert!(!conn.frame_options().compression);

        conn.send_async(ByteBuffer::from_slice(&data, Endian::Little))
            .expect("send_async should succeed");
        let sends = &conn.transport().sends;
        assert_eq!(sends[1][1], MessageKind::Async as u8);
        assert_eq!(sends[1][2], 0);
        assert_eq!(sends[2].len(), 3000);
    }

    #[test]
    fn level_zero_never_compresses() {
        let data = compressible(3000);
        let transport = ScriptedTransport::new(vec![vec![0]]);
        let config = HandshakeConfig::default().with_level(ProtocolLevel::new(0).unwrap());
        let mut conn = Connection::handshake(transport, &config).expect("handshake");

        conn.send_async(ByteBuffer::from_slice(&data, Endian::Little))
            .unwrap();
        assert_eq!(conn.transport().sends[1][2], 0);
    }

    #[test]
    fn sync_answered_with_wrong_kind_fails() {
        let mut conn = ready(vec![response_frame(MessageKind::Async, &[0xfa, 1, 0, 0, 0])]);
        let err = conn
            .send_sync(ByteBuffer::from_slice(&[0xfa, 1, 0, 0, 0], Endian::Little))
            .unwrap_err();
        assert!(matches!(
            err,
            ConnError::UnexpectedMessageKind {
                expected: MessageKind::Response,
                found: MessageKind::Async
            }
        ));
    }

    #[test]
    fn receive_reassembles_split_frames() {
        let frame = response_frame(MessageKind::Response, b"\x0a\x00\x05\x00\x00\x00hello");
        let chunks = frame.chunks(3).map(<[u8]>::to_vec).collect();
        let mut conn = ready(chunks);

        let message = conn.receive().expect("receive should succeed");
        assert_eq!(message.wire_len, frame.len() as u64);
        assert_eq!(
            deserialize_vector::<wire::Char>(&message.payload).unwrap(),
            b"hello"
        );
    }

    #[test]
    fn receive_decompresses_big_endian_frames() {
        let data = compressible(4000);
        let frame = encode_frame(
            ByteBuffer::from_slice(&data, Endian::Big),
            MessageKind::Response,
            &FrameOptions::default(),
        )
        .unwrap();
        assert_eq!(frame.compression, Compression::Compressed32);

        let mut conn = ready(vec![frame.to_bytes().to_vec()]);
        let message = conn.receive().unwrap();
        assert_eq!(message.compression, Compression::Compressed32);
        assert_eq!(message.payload.endian(), Endian::Big);
        assert_eq!(message.payload.as_slice(), data.as_slice());
    }

    #[test]
    fn truncated_payload_is_short_read() {
        let mut frame = response_frame(MessageKind::Response, &[1; 12]);
        frame.truncate(HEADER_SIZE + 3);
        let mut conn = ready(vec![frame]);

        let err = conn.receive().unwrap_err();
        assert!(matches!(
            err,
            ConnError::ShortRead {
                expected: 12,
                received: 3
            }
        ));
    }

    #[test]
    fn truncated_header_is_short_read() {
        let mut conn = ready(vec![vec![1, 2, 0]]);
        assert!(matches!(
            conn.receive().unwrap_err(),
            ConnError::ShortRead {
                expected: 8,
                received: 3
            }
        ));
    }

    #[test]
    fn invalid_header_is_proto_error() {
        let mut conn = ready(vec![vec![1, 9, 0, 0, 8, 0, 0, 0]]);
        assert!(matches!(
            conn.receive().unwrap_err(),
            ConnError::Proto(ProtoError::InvalidMessageKind(9))
        ));
    }

    /// Minimal server: answers the handshake, then echoes each sync frame
    /// back as a response.
    fn serve_echo(listener: TcpListener, frames: usize) -> thread::JoinHandle<Vec<u8>> {
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");

            let mut hello = Vec::new();
            let mut byte = [0u8; 1];
            loop {
                stream.read_exact(&mut byte).expect("read handshake");
                if byte[0] == 0 {
                    break;
                }
                hello.push(byte[0]);
            }
            let requested = *hello.last().expect("capability byte");
            stream.write_all(&[requested]).expect("write handshake reply");

            for _ in 0..frames {
                let mut header = [0u8; HEADER_SIZE];
                stream.read_exact(&mut header).expect("read header");
                let decoded = MessageHeader::decode(&header).expect("valid header");
                let mut body = vec![0u8; decoded.payload_len() as usize];
                stream.read_exact(&mut body).expect("read body");

                header[1] = MessageKind::Response as u8;
                stream.write_all(&header).expect("write header");
                stream.write_all(&body).expect("write body");
            }
            hello
        })
    }

    #[test]
    fn tcp_roundtrip_against_echo_server() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let server = serve_echo(listener, 2);

        let stream = KxStream::connect_tcp(addr, Some(Duration::from_secs(5))).expect("connect");
        let config = HandshakeConfig::default().with_credentials("user:pass");
        let mut conn = Connection::handshake(stream, &config).expect("handshake");
        assert_eq!(conn.level(), ProtocolLevel::LATEST);

        let ints = conn
            .serializer()
            .vector::<wire::Int, _>(vec![1, 2, 3])
            .unwrap();
        let reply = conn.send_sync(ints).expect("small sync");
        assert_eq!(
            deserialize_vector::<wire::Int>(&reply.payload).unwrap(),
            vec![1, 2, 3]
        );

        let big: Vec<i64> = (0..1000).map(|i| i % 10).collect();
        let longs = conn
            .serializer()
            .vector::<wire::Long, _>(big.clone())
            .unwrap();
        let reply = conn.send_sync(longs).expect("large sync");
        assert!(reply.compression.is_compressed());
        assert_eq!(deserialize_vector::<wire::Long>(&reply.payload).unwrap(), big);

        let mut expected_hello = b"user:pass".to_vec();
        expected_hello.push(6);
        assert_eq!(server.join().expect("server thread"), expected_hello);
    }

    #[cfg(unix)]
    #[test]
    fn unix_socket_pair_is_local() {
        let (client, mut server) = std::os::unix::net::UnixStream::pair().expect("pair");
        let handle = thread::spawn(move || {
            let mut hello = [0u8; 2];
            server.read_exact(&mut hello).expect("read capability");
            server.write_all(&[6]).expect("reply");
            hello
        });

        let conn = Connection::handshake(KxStream::from_unix(client), &HandshakeConfig::default())
            .expect("handshake");
        assert!(conn.transport().is_local());
        assert!(!conn.frame_options().compression);
        assert_eq!(handle.join().unwrap(), [6, 0]);
    }
}
