// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{Arc, Mutex};

use crate::{
    client::http::HttpTransport,
    config_map::ConfigurationMap,
    crypto::DeviceKeys,
    wifi::manager::WifiManager,
};

/// Everything owned for the lifetime of one provisioning session: key
/// material, the HTTPS transport, the Wi-Fi manager handle and the
/// configuration map. Created before the session starts, dropped after
/// teardown.
pub struct UserContext {
    pub keys: DeviceKeys,
    pub transport: Arc<dyn HttpTransport>,
    pub wifi: WifiManager,
    pub configuration: Mutex<ConfigurationMap>,
}

impl UserContext {
    pub fn new(
        keys: DeviceKeys,
        transport: Arc<dyn HttpTransport>,
        wifi: WifiManager,
        configuration: ConfigurationMap,
    ) -> Self {
        Self {
            keys,
            transport,
            wifi,
            configuration: Mutex::new(configuration),
        }
    }

    /// Run a closure over the configuration map.
    pub fn with_configuration<T>(
        &self,
        f: impl FnOnce(&mut ConfigurationMap) -> T,
    ) -> T {
        let mut map = self.configuration.lock().expect("configuration lock");
        f(&mut map)
    }
}
