// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde::{Deserialize, Serialize};

use crate::{config_map::{ConfigurationMap, keys}, error::FfsError};

/// Provisionee states as the Device Setup Service spells them on the
/// wire. The service reports the next state in every `report` response;
/// the internal state machine maps these to its own enumeration.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DssWifiProvisioneeState {
    #[serde(rename = "NOT_PROVISIONED")]
    NotProvisioned,
    #[serde(rename = "START_PROVISIONING")]
    StartProvisioning,
    #[serde(rename = "START_PIN_BASED_SETUP")]
    StartPinBasedSetup,
    #[serde(rename = "COMPUTE_CONFIGURATION")]
    ComputeConfiguration,
    #[serde(rename = "POST_WIFI_SCAN_DATA")]
    PostWifiScanData,
    #[serde(rename = "GET_WIFI_LIST")]
    GetWifiList,
    #[serde(rename = "CONNECTING_TO_USER_NETWORK")]
    ConnectingToUserNetwork,
    #[serde(rename = "CONNECTED_TO_USER_NETWORK")]
    ConnectedToUserNetwork,
    #[serde(rename = "DONE")]
    Done,
}

/// Outcome of one state's action, as carried by the `report` request.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DssReportResult {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILURE")]
    Failure,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DssRegistrationState {
    #[serde(rename = "NOT_REGISTERED")]
    #[default]
    NotRegistered,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETE")]
    Complete,
    #[serde(rename = "FAILED")]
    Failed,
}

/// Registration details returned by `computeConfigurationData`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Device identity block embedded in every authenticated request.
///
/// Each entry mirrors one `DeviceInformation.*` configuration key and
/// is omitted from the JSON when the key is absent locally.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software_version_index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_version: Option<String>,
}

impl DeviceDetails {
    /// Assemble the details from the configuration map. Missing keys are
    /// simply omitted; type mismatches propagate.
    pub fn from_configuration(map: &ConfigurationMap) -> Result<Self, FfsError> {
        Ok(Self {
            manufacturer: map.optional_string(keys::MANUFACTURER_NAME)?,
            device_model: map.optional_string(keys::MODEL_NUMBER)?,
            device_serial: map.optional_string(keys::SERIAL_NUMBER)?,
            product_index: map.optional_string(keys::PRODUCT_INDEX)?,
            software_version_index: map.optional_string(keys::SOFTWARE_VERSION_INDEX)?,
            device_name: map.optional_string(keys::BLE_DEVICE_NAME)?,
            firmware_version: map.optional_string(keys::FIRMWARE_VERSION)?,
            hardware_version: map.optional_string(keys::HARDWARE_VERSION)?,
        })
    }
}
