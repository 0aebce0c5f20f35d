use bytes::{Bytes, BytesMut};
use patchwire_codec::KEEPALIVE;
use patchwire_core::PatchwireError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeFlag {
    Batch,
    Streaming,
}

/// Encoded blocks of one response, in call order.
///
/// Owned by a single request's control flow; never shared.
#[derive(Debug)]
pub struct ResponseBuffer {
    blocks: Vec<Bytes>,
    mode: ModeFlag,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            mode: ModeFlag::Batch,
        }
    }

    pub fn mode(&self) -> ModeFlag {
        self.mode
    }

    /// Appends a block. Once the response is streaming nothing may be buffered.
    pub fn push(&mut self, block: Bytes) -> Result<(), PatchwireError> {
        if self.mode == ModeFlag::Streaming {
            return Err(PatchwireError::usage(
                "response is streaming; emit from inside the stream callback",
            ));
        }
        self.blocks.push(block);
        Ok(())
    }

    /// Flips Batch -> Streaming. Irreversible, and allowed once.
    pub fn enter_streaming(&mut self) -> Result<(), PatchwireError> {
        if self.mode == ModeFlag::Streaming {
            return Err(PatchwireError::usage("stream() may only be called once per response"));
        }
        self.mode = ModeFlag::Streaming;
        Ok(())
    }

    /// Hands over everything buffered so far, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<Bytes> {
        std::mem::take(&mut self.blocks)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Joins all blocks into one batch payload.
    pub fn into_payload(self, keepalive: bool) -> Bytes {
        let size = self.blocks.iter().map(Bytes::len).sum::<usize>() + KEEPALIVE.len();
        let mut out = BytesMut::with_capacity(size);
        if keepalive {
            out.extend_from_slice(KEEPALIVE.as_bytes());
        }
        for block in &self.blocks {
            out.extend_from_slice(block);
        }
        out.freeze()
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}
