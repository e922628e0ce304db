// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde::{Deserialize, Serialize};

use crate::models::common::DeviceDetails;

/// The PIN itself never travels: `hashed_pin` is
/// `base64(SHA-256(pin || salt))`.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StartPinBasedSetupRequest<'a> {
    pub nonce: &'a str,
    pub session_id: &'a str,
    pub device_details: &'a DeviceDetails,
    pub hashed_pin: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StartPinBasedSetupResponse {
    pub can_proceed: bool,
}
