// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Base64 with the DSS decoder semantics (tolerant of interleaved
/// non-alphabet bytes, strict about padding).
pub mod base64;
/// RFC-1924 base85 encoding used by the encoded setup-network SSID.
pub mod base85;
