// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use serde::{Deserialize, Serialize};

/// Encoding of externally supplied key material.
///
/// The certificate chain must be PEM; DER certificates are rejected
/// before any I/O happens.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    #[serde(rename = "PEM", alias = "pem", alias = "Pem")]
    Pem,
    #[serde(rename = "DER", alias = "der", alias = "Der")]
    Der,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyType::Pem => "PEM",
            KeyType::Der => "DER",
        })
    }
}
