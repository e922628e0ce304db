// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde::{Deserialize, Serialize};

use crate::models::{common::DeviceDetails, wifi::WifiScanResult};

/// `sequence_number` restarts at 1 whenever the machine re-enters the
/// post-scan-data state and increments per POST within it.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PostWifiScanDataRequest<'a> {
    pub nonce: &'a str,
    pub session_id: &'a str,
    pub sequence_number: u32,
    pub device_details: &'a DeviceDetails,
    pub wifi_scan_data_list: &'a [WifiScanResult],
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PostWifiScanDataResponse {
    pub can_proceed: bool,
    #[serde(default)]
    pub total_credentials_found: u32,
    #[serde(default)]
    pub all_credentials_found: bool,
}
