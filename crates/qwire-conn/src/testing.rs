use std::collections::VecDeque;

use bytes::BytesMut;
use qwire_transport::{Result, Transport};

/// In-memory transport replaying scripted inbound chunks and recording
/// every send.
pub(crate) struct ScriptedTransport {
    inbound: VecDeque<Vec<u8>>,
    pub sends: Vec<Vec<u8>>,
    send_limit: Option<usize>,
    local: bool,
}

impl ScriptedTransport {
    pub fn new(inbound: Vec<Vec<u8>>) -> Self {
        Self {
            inbound: inbound.into(),
            sends: Vec::new(),
            send_limit: None,
            local: false,
        }
    }

    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }

    pub fn with_send_limit(mut self, limit: usize) -> Self {
        self.send_limit = Some(limit);
        self
    }

    pub fn sent_bytes(&self) -> Vec<u8> {
        self.sends.concat()
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<usize> {
        let n = self.send_limit.map_or(bytes.len(), |limit| limit.min(bytes.len()));
        if n > 0 {
            self.sends.push(bytes[..n].to_vec());
        }
        Ok(n)
    }

    fn recv(&mut self, max_bytes: usize) -> Result<BytesMut> {
        let Some(front) = self.inbound.front_mut() else {
            return Ok(BytesMut::new());
        };
        let n = max_bytes.min(front.len());
        let chunk = BytesMut::from(&front[..n]);
        front.drain(..n);
        if front.is_empty() {
            self.inbound.pop_front();
        }
        Ok(chunk)
    }

    fn peek(&mut self, max_bytes: usize) -> Result<BytesMut> {
        Ok(self
            .inbound
            .front()
            .map(|front| BytesMut::from(&front[..max_bytes.min(front.len())]))
            .unwrap_or_default())
    }

    fn is_local(&self) -> bool {
        self.local
    }
}
