// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::common::DeviceDetails;

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GetWifiCredentialsRequest<'a> {
    pub nonce: &'a str,
    pub session_id: &'a str,
    pub sequence_number: u32,
    pub device_details: &'a DeviceDetails,
}

/// The credentials list stays as raw JSON values so the handler can
/// skip individual malformed entries without failing the operation.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GetWifiCredentialsResponse {
    pub can_proceed: bool,
    #[serde(default)]
    pub all_credentials_returned: bool,
    #[serde(default)]
    pub wifi_credentials_list: Vec<Value>,
}
