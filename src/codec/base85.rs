// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{error::FfsError, stream::Stream};

/// RFC-1924 alphabet: digits, upper case, lower case, then punctuation.
const ALPHABET: &[u8; 85] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&()*+-;<=>?@^_`{|}~";

/// Encode the readable region of `src` into `dst`.
///
/// Each 4-byte group becomes 5 symbols, big-endian. A partial trailing
/// group (1-3 bytes) is zero-extended and still emits 5 symbols, so the
/// output length is always `ceil(input / 4) * 5`.
pub fn encode(src: &mut Stream, dst: &mut Stream) -> Result<(), FfsError> {
    while !src.is_empty() {
        let mut group = 0u32;
        for shift in [24u32, 16, 8, 0] {
            if src.is_empty() {
                break;
            }
            group |= u32::from(src.read_byte()?) << shift;
        }

        let mut symbols = [0u8; 5];
        for slot in symbols.iter_mut().rev() {
            *slot = ALPHABET[(group % 85) as usize];
            group /= 85;
        }
        dst.write(&symbols)?;
    }

    Ok(())
}

pub fn encode_to_string(bytes: &[u8]) -> String {
    let mut src = Stream::input(bytes);
    let mut dst = Stream::output(bytes.len().div_ceil(4) * 5);
    // The destination is sized for the input; overrun is unreachable.
    let _ = encode(&mut src, &mut dst);
    String::from_utf8_lossy(dst.peek()).into_owned()
}
