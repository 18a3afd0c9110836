//! Block-based back-reference codec.
//!
//! The compressed stream is a sequence of blocks. Each block is one header
//! byte followed by up to eight slots; header bit `i` (LSB first) says
//! whether slot `i` is a one-byte literal (0) or a two-byte back-reference
//! (1). A back-reference is `(signature, extra)`: copy `2 + extra` bytes
//! starting at the most recent earlier position whose adjacent-pair XOR
//! equals `signature`.
//!
//! Both sides maintain the same 256-entry signature index, so the stream
//! carries no offsets. The encoder records a literal's signature one step
//! late; the decoder reproduces that by indexing only pairs that are fully
//! written and skipping the interior of copied runs.

use crate::buffer::ByteBuffer;
use crate::error::{ProtoError, Result};
use crate::header::{Compression, HEADER_SIZE};

/// Worst-case block size: header byte plus eight two-byte slots.
const MAX_BLOCK_LEN: usize = 17;

/// Longest run extension a back-reference can encode.
const MAX_RUN_EXTENSION: usize = 255;

/// Compress `input`, or hand it back unchanged if the result would not be
/// smaller than half its size.
pub fn compress(input: ByteBuffer) -> ByteBuffer {
    match try_compress(input.as_slice()) {
        Some(out) => ByteBuffer::from_vec(out, input.endian()),
        None => input,
    }
}

/// Compress `input` into a block stream strictly shorter than half of it.
///
/// Returns `None` as soon as the output budget is exhausted.
pub fn try_compress(input: &[u8]) -> Option<Vec<u8>> {
    let len = input.len();
    let budget = len / 2;
    if budget <= MAX_BLOCK_LEN {
        return None;
    }

    let mut out = vec![0u8; budget];
    let mut out_idx = 0usize;
    let mut header_idx = 0usize;
    let mut block = 0u8;
    let mut mask = 0u8;

    let mut index: [Option<usize>; 256] = [None; 256];
    let mut pending: Option<(u8, usize)> = None;
    let mut pos = 0usize;

    while pos < len {
        if mask == 0 {
            // A full block must still leave the output under budget.
            if out_idx + MAX_BLOCK_LEN >= budget {
                return None;
            }
            out[header_idx] = block;
            header_idx = out_idx;
            out_idx += 1;
            block = 0;
            mask = 1;
        }

        let signature = input.get(pos + 1).map(|next| input[pos] ^ next);
        let earlier = match signature {
            Some(sig) if pos + 3 <= len => {
                index[usize::from(sig)].filter(|&prev| input[prev] == input[pos])
            }
            _ => None,
        };

        if let Some((sig, at)) = pending.take() {
            index[usize::from(sig)] = Some(at);
        }

        match (earlier, signature) {
            (Some(prev), Some(sig)) => {
                index[usize::from(sig)] = Some(pos);
                block |= mask;

                let mut src = prev + 2;
                pos += 2;
                let run_start = pos;
                let run_end = (pos + MAX_RUN_EXTENSION).min(len);
                while pos < run_end && input[src] == input[pos] {
                    pos += 1;
                    src += 1;
                }

                out[out_idx] = sig;
                out[out_idx + 1] = (pos - run_start) as u8;
                out_idx += 2;
            }
            _ => {
                pending = signature.map(|sig| (sig, pos));
                out[out_idx] = input[pos];
                out_idx += 1;
                pos += 1;
            }
        }

        mask <<= 1;
    }

    out[header_idx] = block;
    out.truncate(out_idx);
    Some(out)
}

/// Decompress a compressed frame payload.
///
/// `payload` starts with the original total message length (header
/// included) in a 4- or 8-byte field, per `marker`, in the payload's byte
/// order; the block stream follows.
pub fn decompress(payload: &ByteBuffer, marker: Compression) -> Result<ByteBuffer> {
    let width = marker.size_field_width();
    let declared_total = match marker {
        Compression::None => return Ok(payload.clone()),
        Compression::Compressed32 => payload.get::<u32>(0).map(u64::from),
        Compression::Compressed64 => payload.get::<u64>(0),
    }
    .ok_or(ProtoError::Truncated {
        needed: width,
        available: payload.len(),
    })?;

    let out_len = declared_total
        .checked_sub(HEADER_SIZE as u64)
        .ok_or(ProtoError::InvalidLength(declared_total))?;
    let out_len = usize::try_from(out_len).map_err(|_| ProtoError::Allocation {
        size: out_len,
    })?;

    let mut out = ByteBuffer::try_zeroed(out_len, payload.endian())?;
    decompress_blocks(&payload.as_slice()[width..], out.as_mut_slice())?;
    Ok(out)
}

/// Decode a block stream into `out`, filling it exactly.
pub fn decompress_blocks(input: &[u8], out: &mut [u8]) -> Result<()> {
    let out_len = out.len();
    let mut index: [Option<usize>; 256] = [None; 256];
    let mut indexed_to = 0usize;
    let mut in_idx = 0usize;
    let mut out_idx = 0usize;
    let mut block = 0u8;
    let mut mask = 0u8;

    let next = |in_idx: &mut usize| -> Result<u8> {
        let byte = input
            .get(*in_idx)
            .copied()
            .ok_or(ProtoError::CorruptCompressedPayload("block stream ends early"))?;
        *in_idx += 1;
        Ok(byte)
    };

    while out_idx < out_len {
        if mask == 0 {
            block = next(&mut in_idx)?;
            mask = 1;
        }

        if block & mask != 0 {
            let sig = next(&mut in_idx)?;
            let extra = usize::from(next(&mut in_idx)?);
            let src = index[usize::from(sig)].ok_or(ProtoError::CorruptCompressedPayload(
                "back-reference to unseen signature",
            ))?;
            let count = 2 + extra;
            if out_idx + count > out_len {
                return Err(ProtoError::CorruptCompressedPayload(
                    "run overflows declared size",
                ));
            }

            // Source and destination may overlap; copy forwards byte by byte.
            for i in 0..count {
                out[out_idx + i] = out[src + i];
            }

            while indexed_to + 1 < out_idx + 2 {
                index[usize::from(out[indexed_to] ^ out[indexed_to + 1])] = Some(indexed_to);
                indexed_to += 1;
            }
            out_idx += count;
            indexed_to = out_idx;
        } else {
            out[out_idx] = next(&mut in_idx)?;
            out_idx += 1;

            while indexed_to + 1 < out_idx {
                index[usize::from(out[indexed_to] ^ out[indexed_to + 1])] = Some(indexed_to);
                indexed_to += 1;
            }
        }

        mask <<= 1;
    }

    Ok(())
}
