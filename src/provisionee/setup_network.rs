// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result, ensure};
use tracing::debug;

use crate::{
    codec::{base64, base85},
    config_map::{ConfigurationMap, keys},
    crypto::{self, DeviceKeys},
    models::wifi::{WifiConfiguration, WifiSecurityProtocol},
};

/// The derived SSID is always exactly 32 characters.
pub const ENCODED_SSID_LEN: usize = 32;

/// Reserved control field carried in the high nibble of the first SSID
/// word.
const CONTROL_NIBBLE: u8 = 0x00;
const CLIENT_NONCE_SIZE: usize = 12;
const AUTH_MATERIAL_INDEX_SIZE: usize = 9;
const PRODUCT_INDEX_SIZE: usize = 4;

const DEFAULT_SETUP_SSID: &str = "simple_setup";

/// Compute the one-shot Amazon encoded setup network: a hidden WPA-PSK
/// network whose SSID and passphrase are both derived from the device
/// key material and a fresh 12-byte nonce. The same nonce feeds the
/// SSID and the passphrase.
pub fn compute_encoded_setup_network(
    keys: &DeviceKeys,
    configuration: &ConfigurationMap,
) -> Result<WifiConfiguration> {
    let mut nonce = [0u8; CLIENT_NONCE_SIZE];
    crypto::random_bytes(&mut nonce);
    compute_with_nonce(keys, configuration, &nonce)
}

pub(crate) fn compute_with_nonce(
    keys: &DeviceKeys,
    configuration: &ConfigurationMap,
    nonce: &[u8; CLIENT_NONCE_SIZE],
) -> Result<WifiConfiguration> {
    let ssid = compute_ssid(keys, configuration, nonce)?;
    debug!("derived setup SSID: {ssid}");

    Ok(WifiConfiguration {
        ssid,
        security_protocol: WifiSecurityProtocol::WpaPsk,
        key: Some(compute_passphrase(keys, nonce)),
        is_hidden_network: true,
        network_priority: None,
        wep_index: None,
    })
}

/// SSID layout: 2 characters of base64 over a control word built from
/// the first auth-material byte, then 30 characters of base85 over the
/// remaining 8 auth-material bytes, the 4-byte product index and the
/// 12-byte nonce.
fn compute_ssid(
    keys: &DeviceKeys,
    configuration: &ConfigurationMap,
    nonce: &[u8; CLIENT_NONCE_SIZE],
) -> Result<String> {
    // Auth material index: the last 9 bytes of the SHA-256 of the
    // device public key DER.
    let digest = crypto::sha256(keys.public_key_der());
    let auth_material = &digest[digest.len() - AUTH_MATERIAL_INDEX_SIZE..];

    // First 2 characters: control nibble and the split first byte,
    // base64-encoded with the padding discarded.
    let word = [
        (CONTROL_NIBBLE << 4) | ((auth_material[0] >> 4) & 0x0f),
        (auth_material[0] << 4) & 0xf0,
    ];
    let prefix = base64::encode_to_string(&word);

    let product_index = configuration
        .get_string(keys::PRODUCT_INDEX)
        .context("product index is not configured")?;
    ensure!(
        product_index.len() == PRODUCT_INDEX_SIZE,
        "product index must be exactly {PRODUCT_INDEX_SIZE} bytes, got {}",
        product_index.len()
    );

    // Last 30 characters: base85 over 24 bytes (6 whole groups).
    let mut source =
        Vec::with_capacity(AUTH_MATERIAL_INDEX_SIZE - 1 + PRODUCT_INDEX_SIZE
            + CLIENT_NONCE_SIZE);
    source.extend_from_slice(&auth_material[1..]);
    source.extend_from_slice(product_index.as_bytes());
    source.extend_from_slice(nonce);

    let mut ssid = String::with_capacity(ENCODED_SSID_LEN);
    ssid.push_str(&prefix[..2]);
    ssid.push_str(&base85::encode_to_string(&source));
    Ok(ssid)
}

/// Passphrase: base64 of `HMAC-SHA-256(SHA-256(ECDH(device, cloud)),
/// nonce)`, no line breaks.
fn compute_passphrase(keys: &DeviceKeys, nonce: &[u8]) -> String {
    let secret = keys.ecdh_shared_secret();
    base64::encode_to_string(&crypto::hmac_sha256(&secret, nonce))
}

/// Legacy open setup network, used when no encoded network can be
/// derived.
pub fn default_setup_network() -> WifiConfiguration {
    WifiConfiguration {
        is_hidden_network: true,
        ..WifiConfiguration::open(DEFAULT_SETUP_SSID)
    }
}
