// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::HashMap;

use crate::error::FfsError;

/// Stable configuration-map keys.
///
/// Values written back by the cloud during ComputeConfigurationData use
/// the same namespace; unrecognized keys are silently skipped by the
/// response handler.
pub mod keys {
    pub const COUNTRY_CODE: &str = "LocaleConfiguration.CountryCode";
    pub const REALM: &str = "LocaleConfiguration.Realm";
    pub const MARKETPLACE: &str = "LocaleConfiguration.Marketplace";
    pub const LANGUAGE_LOCALE: &str = "LocaleConfiguration.LanguageLocale";
    pub const COUNTRY_OF_RESIDENCE: &str = "LocaleConfiguration.CountryOfResidence";
    pub const REGION: &str = "LocaleConfiguration.Region";
    pub const REPORTING_URL: &str = "DSS.ReportUrl";
    pub const DSS_HOST: &str = "DSS.Host";
    pub const DSS_PORT: &str = "DSS.Port";
    pub const CLOUD_PUBLIC_KEY: &str = "DSS.PublicKey";
    pub const ALEXA_EVENT_GATEWAY_ENDPOINT: &str =
        "SmartHome.AlexaEventGatewayEndpoint";
    pub const SESSION_TOKEN: &str = "FFS.SessionToken";
    pub const UTC_TIME: &str = "Time.UTC";
    pub const MANUFACTURER_NAME: &str = "DeviceInformation.ManufacturerName";
    pub const MODEL_NUMBER: &str = "DeviceInformation.ModelNumber";
    pub const SERIAL_NUMBER: &str = "DeviceInformation.SerialNumber";
    pub const HARDWARE_VERSION: &str = "DeviceInformation.HardwareVersion";
    pub const FIRMWARE_VERSION: &str = "DeviceInformation.FirmwareVersion";
    pub const PIN: &str = "DeviceInformation.Pin";
    pub const CPU_ID: &str = "DeviceInformation.CpuId";
    pub const BLE_DEVICE_NAME: &str = "DeviceInformation.BleDeviceName";
    pub const BLE_TRANSMIT_POWER: &str = "DeviceInformation.BleTransmitPower";
    pub const WIFI_MAC_ADDRESS: &str = "DeviceInformation.WifiMacAddress";
    pub const PRODUCT_INDEX: &str = "DeviceInformation.ProductIndex";
    pub const SOFTWARE_VERSION_INDEX: &str =
        "DeviceInformation.SoftwareVersionIndex";
    pub const DEVICE_PUBLIC_KEY: &str = "DeviceInformation.PublicKey";
}

/// Discriminated configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapValue {
    Bytes(Vec<u8>),
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl MapValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            MapValue::Bytes(_) => "bytes",
            MapValue::String(_) => "string",
            MapValue::Integer(_) => "integer",
            MapValue::Boolean(_) => "boolean",
        }
    }
}

/// String-keyed map of typed configuration values.
///
/// `get` distinguishes "key absent" (`NotImplemented`, never fatal for
/// callers that know the entry is optional) from type mismatches
/// (`Error`).
#[derive(Debug, Default, Clone)]
pub struct ConfigurationMap {
    entries: HashMap<String, MapValue>,
}

impl ConfigurationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: MapValue) {
        self.entries.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Result<&MapValue, FfsError> {
        self.entries.get(key).ok_or(FfsError::NotImplemented)
    }

    pub fn get_string(&self, key: &str) -> Result<&str, FfsError> {
        match self.get(key)? {
            MapValue::String(s) => Ok(s),
            _ => Err(FfsError::Error),
        }
    }

    pub fn get_bytes(&self, key: &str) -> Result<&[u8], FfsError> {
        match self.get(key)? {
            MapValue::Bytes(b) => Ok(b),
            _ => Err(FfsError::Error),
        }
    }

    pub fn get_integer(&self, key: &str) -> Result<i64, FfsError> {
        match self.get(key)? {
            MapValue::Integer(v) => Ok(*v),
            _ => Err(FfsError::Error),
        }
    }

    pub fn get_boolean(&self, key: &str) -> Result<bool, FfsError> {
        match self.get(key)? {
            MapValue::Boolean(v) => Ok(*v),
            _ => Err(FfsError::Error),
        }
    }

    /// Optional string read: absent keys become `None`, type mismatches
    /// stay errors.
    pub fn optional_string(&self, key: &str) -> Result<Option<String>, FfsError> {
        match self.get_string(key) {
            Ok(s) => Ok(Some(s.to_string())),
            Err(FfsError::NotImplemented) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether a key is one this device persists when the cloud sends it
    /// back. Anything else is skipped by the configuration-data handler.
    pub fn recognizes(key: &str) -> bool {
        RECOGNIZED_KEYS.contains(&key)
    }
}

/// Keys accepted from `computeConfigurationData` responses.
const RECOGNIZED_KEYS: &[&str] = &[
    keys::COUNTRY_CODE,
    keys::REALM,
    keys::MARKETPLACE,
    keys::LANGUAGE_LOCALE,
    keys::COUNTRY_OF_RESIDENCE,
    keys::REGION,
    keys::REPORTING_URL,
    keys::DSS_HOST,
    keys::DSS_PORT,
    keys::ALEXA_EVENT_GATEWAY_ENDPOINT,
    keys::SESSION_TOKEN,
    keys::UTC_TIME,
];
