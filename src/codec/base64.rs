// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use once_cell::sync::Lazy;

use crate::{error::FfsError, stream::Stream};

const ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const PAD: u8 = b'=';

/// Reverse lookup table; 0xff marks bytes outside the alphabet.
static DECODE_TABLE: Lazy<[u8; 256]> = Lazy::new(|| {
    let mut table = [0xffu8; 256];
    for (i, &c) in ALPHABET.iter().enumerate() {
        table[c as usize] = i as u8;
    }
    table
});

/// Encode the readable region of `src` into `dst`.
///
/// `line_length` of zero disables wrapping; otherwise `terminator` is
/// emitted after every `line_length` output characters (never after the
/// final one).
pub fn encode(
    src: &mut Stream,
    line_length: usize,
    terminator: &str,
    dst: &mut Stream,
) -> Result<(), FfsError> {
    let mut column = 0usize;

    let mut put = |dst: &mut Stream, c: u8| -> Result<(), FfsError> {
        if line_length > 0 && column == line_length {
            dst.write_str(terminator)?;
            column = 0;
        }
        dst.write_byte(c)?;
        column += 1;
        Ok(())
    };

    while !src.is_empty() {
        let take = src.data_size().min(3);
        let chunk = src.read(take)?;
        let b0 = chunk[0];
        let b1 = chunk.get(1).copied();
        let b2 = chunk.get(2).copied();

        put(dst, ALPHABET[(b0 >> 2) as usize])?;
        put(
            dst,
            ALPHABET[(((b0 & 0x03) << 4) | (b1.unwrap_or(0) >> 4)) as usize],
        )?;
        match b1 {
            Some(b1) => put(
                dst,
                ALPHABET[(((b1 & 0x0f) << 2) | (b2.unwrap_or(0) >> 6)) as usize],
            )?,
            None => put(dst, PAD)?,
        }
        match b2 {
            Some(b2) => put(dst, ALPHABET[(b2 & 0x3f) as usize])?,
            None => put(dst, PAD)?,
        }
    }

    Ok(())
}

/// Decode the readable region of `src` into `dst`.
///
/// Non-alphabet bytes (whitespace, header artifacts) are skipped.
/// Decoding fails if an alphabet character follows a `=` pad or if more
/// than two pads appear.
pub fn decode(src: &mut Stream, dst: &mut Stream) -> Result<(), FfsError> {
    let mut quantum = [0u8; 4];
    let mut filled = 0usize;
    let mut pads = 0usize;

    while !src.is_empty() {
        let byte = src.read_byte()?;

        if byte == PAD {
            pads += 1;
            if pads > 2 {
                return Err(FfsError::Error);
            }
            continue;
        }

        let value = DECODE_TABLE[byte as usize];
        if value == 0xff {
            continue;
        }
        // Data after padding is malformed.
        if pads > 0 {
            return Err(FfsError::Error);
        }

        quantum[filled] = value;
        filled += 1;
        if filled == 4 {
            dst.write_byte((quantum[0] << 2) | (quantum[1] >> 4))?;
            dst.write_byte((quantum[1] << 4) | (quantum[2] >> 2))?;
            dst.write_byte((quantum[2] << 6) | quantum[3])?;
            filled = 0;
        }
    }

    // Final partial quantum, closed by pads.
    match filled {
        0 => {},
        2 => {
            dst.write_byte((quantum[0] << 2) | (quantum[1] >> 4))?;
        },
        3 => {
            dst.write_byte((quantum[0] << 2) | (quantum[1] >> 4))?;
            dst.write_byte((quantum[1] << 4) | (quantum[2] >> 2))?;
        },
        _ => return Err(FfsError::Error),
    }

    Ok(())
}

/// Convenience wrappers over byte slices.
pub fn encode_to_string(bytes: &[u8]) -> String {
    let mut src = Stream::input(bytes);
    let mut dst = Stream::output(bytes.len().div_ceil(3) * 4);
    // The destination is sized for the input; overrun is unreachable.
    let _ = encode(&mut src, 0, "", &mut dst);
    String::from_utf8_lossy(dst.peek()).into_owned()
}

pub fn decode_to_vec(text: &[u8]) -> Result<Vec<u8>, FfsError> {
    let mut src = Stream::input(text);
    let mut dst = Stream::output(text.len().div_ceil(4) * 3);
    decode(&mut src, &mut dst)?;
    Ok(dst.peek().to_vec())
}
