// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod setup_network;
pub mod states;
pub mod task;

use std::{sync::Arc, time::Duration};

use tracing::error;

use crate::{
    cfg::enums::KeyType,
    client::{
        context::UserContext,
        dss_client::{DSS_DEFAULT_HOST, DssClientContext},
        transport::ReqwestTransport,
    },
    config_map::{ConfigurationMap, MapValue, keys},
    crypto::DeviceKeys,
    error::ProvisioningResult,
    provisionee::task::{DefaultCallbacks, ProvisioneeCallbacks, ProvisioneeTask},
    wifi::{manager::WifiManager, platform::SystemWifi},
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Key material handed in by the host application.
#[derive(Debug, Clone)]
pub struct ProvisioningArguments {
    pub private_key: Vec<u8>,
    pub private_key_type: KeyType,
    pub public_key: Vec<u8>,
    pub public_key_type: KeyType,
    pub device_type_public_key: Vec<u8>,
    pub device_type_public_key_type: KeyType,
    /// Device certificate chain; PEM is mandatory.
    pub certificate: Vec<u8>,
    pub certificate_type: KeyType,
}

/// The exported entry point: run one complete provisioning session
/// against the real transport and the system Wi-Fi radio.
pub async fn provision_device(
    arguments: &ProvisioningArguments,
    configuration: ConfigurationMap,
) -> ProvisioningResult {
    provision_device_with_callbacks(arguments, configuration, &DefaultCallbacks)
        .await
}

pub async fn provision_device_with_callbacks(
    arguments: &ProvisioningArguments,
    mut configuration: ConfigurationMap,
    callbacks: &dyn ProvisioneeCallbacks,
) -> ProvisioningResult {
    if arguments.certificate_type != KeyType::Pem {
        error!("the device certificate chain must be PEM");
        return ProvisioningResult::InvalidArgument;
    }

    let device_keys = match DeviceKeys::new(
        &arguments.private_key,
        arguments.private_key_type,
        &arguments.public_key,
        arguments.public_key_type,
        &arguments.device_type_public_key,
        arguments.device_type_public_key_type,
    ) {
        Ok(keys) => keys,
        Err(e) => {
            error!("failed to load key material: {e:#}");
            return ProvisioningResult::InitError;
        },
    };

    // The derivation and signature paths read the DER forms through the
    // configuration map as well.
    configuration.set(
        keys::DEVICE_PUBLIC_KEY,
        MapValue::Bytes(device_keys.public_key_der().to_vec()),
    );
    configuration.set(
        keys::CLOUD_PUBLIC_KEY,
        MapValue::Bytes(device_keys.cloud_public_key_der().to_vec()),
    );

    let transport = match ReqwestTransport::new(HTTP_TIMEOUT) {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            error!("failed to set up the HTTPS transport: {e:#}");
            return ProvisioningResult::InitError;
        },
    };

    let probe_host = configuration
        .optional_string(keys::DSS_HOST)
        .ok()
        .flatten()
        .unwrap_or_else(|| DSS_DEFAULT_HOST.to_string());
    let wifi = WifiManager::spawn(Arc::new(SystemWifi::new()), probe_host);

    let user = Arc::new(UserContext::new(
        device_keys,
        transport,
        wifi,
        configuration,
    ));

    let result = run_session(Arc::clone(&user), callbacks).await;
    if let Err(e) = user.wifi.deinit().await {
        error!("Wi-Fi manager teardown failed: {e:#}");
    }
    result
}

/// Run a session against an already-built user context. Tests inject
/// scripted transports and fake radios through this seam.
pub async fn run_session(
    user: Arc<UserContext>,
    callbacks: &dyn ProvisioneeCallbacks,
) -> ProvisioningResult {
    let dss = match DssClientContext::new(Arc::clone(&user)) {
        Ok(dss) => dss,
        Err(e) => {
            error!("failed to initialize the DSS client: {e:#}");
            return ProvisioningResult::InitError;
        },
    };
    ProvisioneeTask::new(user, dss, callbacks).run().await
}
