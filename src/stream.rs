// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::io;

use crate::error::FfsError;

/// Bounded byte buffer with separate read and write cursors.
///
/// A stream is simultaneously readable (the bytes in
/// `[processed, data)`) and writable (the bytes in `[data, capacity)`).
/// Reads and writes never wrap: once the capacity is exhausted the
/// stream stays full until it is flushed. Invariant:
/// `processed <= data <= capacity`.
///
/// This is the primitive under all DSS I/O: the client's host,
/// session-id, nonce and body buffers are streams, the base64/base85
/// codecs read from and write into streams, and `io::Write` lets
/// `serde_json` serialize request bodies straight into the shared body
/// buffer.
#[derive(Debug, Clone)]
pub struct Stream {
    buf: Vec<u8>,
    /// Write cursor: number of valid bytes from the start of the buffer.
    data: usize,
    /// Read cursor: number of bytes already consumed.
    processed: usize,
}

impl Stream {
    /// An empty stream with `capacity` bytes of writable space.
    pub fn output(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity],
            data: 0,
            processed: 0,
        }
    }

    /// A stream pre-filled with `bytes`, fully readable and with no
    /// writable space left.
    pub fn input(bytes: &[u8]) -> Self {
        Self {
            buf: bytes.to_vec(),
            data: bytes.len(),
            processed: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of readable bytes.
    pub fn data_size(&self) -> usize {
        self.data - self.processed
    }

    /// Number of writable bytes.
    pub fn space_size(&self) -> usize {
        self.buf.len() - self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data_size() == 0
    }

    /// The readable region without consuming it.
    pub fn peek(&self) -> &[u8] {
        &self.buf[self.processed..self.data]
    }

    /// Consume and return the next `n` readable bytes.
    pub fn read(&mut self, n: usize) -> Result<&[u8], FfsError> {
        if self.data_size() < n {
            return Err(FfsError::Underrun);
        }
        let start = self.processed;
        self.processed += n;
        Ok(&self.buf[start..self.processed])
    }

    /// Consume and return the whole readable region.
    pub fn read_all(&mut self) -> &[u8] {
        let start = self.processed;
        self.processed = self.data;
        &self.buf[start..self.data]
    }

    /// Consume one byte.
    pub fn read_byte(&mut self) -> Result<u8, FfsError> {
        Ok(self.read(1)?[0])
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<(), FfsError> {
        if self.space_size() < bytes.len() {
            return Err(FfsError::Overrun);
        }
        self.buf[self.data..self.data + bytes.len()].copy_from_slice(bytes);
        self.data += bytes.len();
        Ok(())
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<(), FfsError> {
        self.write(&[byte])
    }

    /// Write a string without a terminator.
    pub fn write_str(&mut self, s: &str) -> Result<(), FfsError> {
        self.write(s.as_bytes())
    }

    /// Reset both cursors; the whole capacity becomes writable again.
    pub fn flush(&mut self) {
        self.data = 0;
        self.processed = 0;
    }

    /// Reset the read cursor without losing data. Idempotent.
    pub fn rewind(&mut self) {
        self.processed = 0;
    }

    /// Copy the readable region of `self` into `dst`, consuming it.
    pub fn append_to(&mut self, dst: &mut Stream) -> Result<(), FfsError> {
        if dst.space_size() < self.data_size() {
            return Err(FfsError::Overrun);
        }
        let start = self.processed;
        self.processed = self.data;
        let bytes = &self.buf[start..self.data];
        dst.buf[dst.data..dst.data + bytes.len()].copy_from_slice(bytes);
        dst.data += bytes.len();
        Ok(())
    }

    /// Compare the readable region with `expected` without consuming it.
    pub fn matches(&self, expected: &[u8]) -> bool {
        self.peek() == expected
    }

    pub fn matches_str(&self, expected: &str) -> bool {
        self.matches(expected.as_bytes())
    }

    /// Shift the readable bytes to the tail of the buffer so that the
    /// head becomes writable scratch. Used by in-place transforms that
    /// read their own output buffer (base64-then-prefix and the like);
    /// `copy_within` keeps overlapping moves well-defined.
    pub fn move_data_to_end(&mut self) {
        let len = self.data_size();
        let dst = self.buf.len() - len;
        self.buf.copy_within(self.processed..self.data, dst);
        self.processed = dst;
        self.data = self.buf.len();
    }
}

impl io::Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Stream::write(self, buf).map_err(|_| {
            io::Error::new(io::ErrorKind::WriteZero, "stream overrun")
        })?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
