// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{
    cfg::enums::KeyType,
    config_map::{ConfigurationMap, MapValue, keys},
    provisionee::ProvisioningArguments,
};

/// Device configuration file: identity, service endpoint, locale and
/// key material locations. Seeds the configuration map for one session.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DeviceConfig {
    /// `DeviceInformation.*` entries.
    pub device: DeviceInformation,
    /// Device Setup Service endpoint overrides.
    #[serde(default)]
    pub dss: DssEndpoint,
    /// `LocaleConfiguration.*` entries.
    #[serde(default)]
    pub locale: LocaleConfiguration,
    /// Paths to the key material on disk.
    pub keys: KeyMaterial,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceInformation {
    /// Manufacturer name, e.g. "Amazon".
    pub manufacturer_name: String,
    /// Device model number, e.g. "A39GNED7NAJGKP".
    pub model_number: String,
    /// Device serial number, e.g. "G030JU0660540206".
    pub serial_number: String,
    #[serde(default)]
    pub hardware_version: Option<String>,
    #[serde(default)]
    pub firmware_version: Option<String>,
    /// Product index, always 4 characters, e.g. "CbtN".
    pub product_index: String,
    #[serde(default)]
    pub software_version_index: Option<String>,
    #[serde(default)]
    pub ble_device_name: Option<String>,
    /// Device PIN for PIN-based setup; only its salted hash travels.
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(default)]
    pub cpu_id: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct DssEndpoint {
    /// Overrides the compiled-in default host.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct LocaleConfiguration {
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub realm: Option<String>,
    #[serde(default)]
    pub marketplace: Option<String>,
    #[serde(default)]
    pub language_locale: Option<String>,
    #[serde(default)]
    pub country_of_residence: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct KeyMaterial {
    pub private_key: String,
    pub public_key: String,
    pub device_type_public_key: String,
    pub certificate: String,
    /// Encoding of the three keys; the certificate must be PEM.
    #[serde(default = "default_key_type")]
    pub key_type: KeyType,
}

fn default_key_type() -> KeyType {
    KeyType::Pem
}

impl DeviceConfig {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(&path).with_context(|| {
            format!("failed to read {}", path.as_ref().display())
        })?;
        let config: DeviceConfig =
            serde_yaml::from_str(&text).context("failed to parse config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.device.manufacturer_name.is_empty(),
            "ManufacturerName must not be empty"
        );
        ensure!(
            !self.device.model_number.is_empty(),
            "ModelNumber must not be empty"
        );
        ensure!(
            !self.device.serial_number.is_empty(),
            "SerialNumber must not be empty"
        );
        ensure!(
            self.device.product_index.len() == 4,
            "ProductIndex must be exactly 4 characters"
        );
        if let Some(pin) = &self.device.pin {
            ensure!(!pin.is_empty(), "Pin must not be empty when present");
        }
        Ok(())
    }

    /// Seed the configuration map with every configured entry.
    pub fn to_configuration_map(&self) -> ConfigurationMap {
        let mut map = ConfigurationMap::new();
        let mut set = |key: &str, value: &Option<String>| {
            if let Some(value) = value {
                map.set(key, MapValue::String(value.clone()));
            }
        };

        set(
            keys::MANUFACTURER_NAME,
            &Some(self.device.manufacturer_name.clone()),
        );
        set(keys::MODEL_NUMBER, &Some(self.device.model_number.clone()));
        set(keys::SERIAL_NUMBER, &Some(self.device.serial_number.clone()));
        set(keys::HARDWARE_VERSION, &self.device.hardware_version);
        set(keys::FIRMWARE_VERSION, &self.device.firmware_version);
        set(keys::PRODUCT_INDEX, &Some(self.device.product_index.clone()));
        set(
            keys::SOFTWARE_VERSION_INDEX,
            &self.device.software_version_index,
        );
        set(keys::BLE_DEVICE_NAME, &self.device.ble_device_name);
        set(keys::PIN, &self.device.pin);
        set(keys::CPU_ID, &self.device.cpu_id);

        set(keys::DSS_HOST, &self.dss.host);
        set(keys::COUNTRY_CODE, &self.locale.country_code);
        set(keys::REALM, &self.locale.realm);
        set(keys::MARKETPLACE, &self.locale.marketplace);
        set(keys::LANGUAGE_LOCALE, &self.locale.language_locale);
        set(
            keys::COUNTRY_OF_RESIDENCE,
            &self.locale.country_of_residence,
        );
        set(keys::REGION, &self.locale.region);

        if let Some(port) = self.dss.port {
            map.set(keys::DSS_PORT, MapValue::Integer(i64::from(port)));
        }

        map
    }

    /// Read the key files and assemble the provisioning arguments.
    pub fn provisioning_arguments(&self) -> Result<ProvisioningArguments> {
        let read = |path: &str| {
            fs::read(path).with_context(|| format!("failed to read {path}"))
        };
        Ok(ProvisioningArguments {
            private_key: read(&self.keys.private_key)?,
            private_key_type: self.keys.key_type,
            public_key: read(&self.keys.public_key)?,
            public_key_type: self.keys.key_type,
            device_type_public_key: read(&self.keys.device_type_public_key)?,
            device_type_public_key_type: self.keys.key_type,
            certificate: read(&self.keys.certificate)?,
            // The certificate chain is PEM regardless of the key encoding.
            certificate_type: KeyType::Pem,
        })
    }
}
