// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use ffs_client_rs::{
    codec::base64,
    config_map::{ConfigurationMap, MapValue, keys},
    models::wifi::WifiSecurityProtocol,
    provisionee::setup_network::compute_encoded_setup_network,
};

use crate::unit_tests::TestKeyring;

fn configuration() -> ConfigurationMap {
    let mut map = ConfigurationMap::new();
    map.set(keys::PRODUCT_INDEX, MapValue::String("CbtN".into()));
    map
}

#[test]
fn encoded_network_has_the_documented_shape() -> Result<()> {
    let keyring = TestKeyring::new();
    let network = compute_encoded_setup_network(&keyring.device, &configuration())?;

    assert_eq!(network.ssid.len(), 32);
    assert!(network.ssid.is_ascii());
    assert!(network.is_hidden_network);
    assert_eq!(network.security_protocol, WifiSecurityProtocol::WpaPsk);

    let passphrase = network.key.expect("passphrase");
    let mac = base64::decode_to_vec(passphrase.as_bytes())?;
    assert_eq!(mac.len(), 32);
    Ok(())
}

#[test]
fn every_session_gets_a_fresh_network() -> Result<()> {
    let keyring = TestKeyring::new();
    let map = configuration();
    let first = compute_encoded_setup_network(&keyring.device, &map)?;
    let second = compute_encoded_setup_network(&keyring.device, &map)?;

    // The nonce feeds both halves, so both must change together.
    assert_ne!(first.ssid, second.ssid);
    assert_ne!(first.key, second.key);
    // The 2-character prefix depends only on the device key.
    assert_eq!(first.ssid[..2], second.ssid[..2]);
    Ok(())
}

#[test]
fn different_devices_derive_different_networks() -> Result<()> {
    let map = configuration();
    let a = compute_encoded_setup_network(&TestKeyring::new().device, &map)?;
    let b = compute_encoded_setup_network(&TestKeyring::new().device, &map)?;
    assert_ne!(a.ssid, b.ssid);
    Ok(())
}

#[test]
fn derivation_requires_the_product_index() {
    let keyring = TestKeyring::new();
    let empty = ConfigurationMap::new();
    assert!(compute_encoded_setup_network(&keyring.device, &empty).is_err());
}
