// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::common::{DeviceDetails, RegistrationDetails};

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ComputeConfigurationDataRequest<'a> {
    pub nonce: &'a str,
    pub session_id: &'a str,
    pub device_details: &'a DeviceDetails,
}

/// The `configuration` object carries arbitrary typed key/value pairs;
/// the handler persists the ones it recognizes and silently skips the
/// rest, so the tree is kept as raw JSON here.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ComputeConfigurationDataResponse {
    pub configuration: Option<Map<String, Value>>,
    pub registration_details: Option<RegistrationDetails>,
}
