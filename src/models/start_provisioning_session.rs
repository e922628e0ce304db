// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde::{Deserialize, Serialize};

/// `startProvisioningSession` is the only request without a session ID:
/// the session does not exist yet.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StartProvisioningSessionRequest<'a> {
    pub nonce: &'a str,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StartProvisioningSessionResponse {
    pub session_id: String,
    pub can_proceed: bool,
    /// 8 random bytes, base64; mixed into the PIN hash later.
    #[serde(default)]
    pub salt: Option<String>,
}
