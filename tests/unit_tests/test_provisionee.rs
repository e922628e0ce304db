// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{Arc, Mutex};

use anyhow::Result;
use ffs_client_rs::{
    client::dss_client::{
        PATH_COMPUTE_CONFIGURATION_DATA, PATH_GET_WIFI_CREDENTIALS,
        PATH_POST_WIFI_SCAN_DATA, PATH_REPORT, PATH_START_PIN_BASED_SETUP,
        PATH_START_PROVISIONING_SESSION, hashed_pin,
    },
    config_map::keys,
    error::ProvisioningResult,
    models::common::RegistrationDetails,
    models::wifi::{WifiScanResult, WifiSecurityProtocol},
    provisionee::{
        run_session,
        task::{DefaultCallbacks, ProvisioneeCallbacks},
    },
    wifi::platform::AssociationError,
};
use serde_json::{Value, json};

use crate::unit_tests::{
    FakeWifi, Scripted, ScriptedTransport, TestKeyring, device_configuration,
    test_user,
};

const SALT_B64: &str = "c2FsdHNhbHQ=";
const SALT_BYTES: &[u8] = b"saltsalt";

fn scan_snapshot() -> Vec<WifiScanResult> {
    vec![
        WifiScanResult {
            ssid: "home".into(),
            bssid: "74:c2:46:bb:44:41".into(),
            security_protocol: WifiSecurityProtocol::WpaPsk,
            frequency: 2437,
            signal_strength: -52,
        },
        WifiScanResult {
            ssid: "corp".into(),
            bssid: "74:c2:46:bb:44:42".into(),
            security_protocol: WifiSecurityProtocol::Other,
            frequency: 5180,
            signal_strength: -60,
        },
    ]
}

/// Queue the standard happy-path server script. `scan_rounds` controls
/// how many postWifiScanData calls the cloud requires.
fn script_happy_path(transport: &ScriptedTransport, scan_rounds: usize) {
    transport.push(
        PATH_START_PROVISIONING_SESSION,
        Scripted::Json(json!({
            "sessionId": "sess-1",
            "canProceed": true,
            "salt": SALT_B64
        })),
    );
    transport.push(
        PATH_START_PIN_BASED_SETUP,
        Scripted::Json(json!({"canProceed": true})),
    );
    transport.push(
        PATH_COMPUTE_CONFIGURATION_DATA,
        Scripted::Json(json!({
            "configuration": {
                "LocaleConfiguration.Realm": "USAmazon",
                "Time.UTC": "2019-09-06T18:14:12.62Z",
                "Vendor.Unrecognized": {"nested": true}
            },
            "registrationDetails": {
                "registrationToken": "tok-1",
                "expiresAt": "2019-09-06T19:14:12.62Z"
            }
        })),
    );
    for round in 1..=scan_rounds {
        let last = round == scan_rounds;
        transport.push(
            PATH_POST_WIFI_SCAN_DATA,
            Scripted::Json(json!({
                "canProceed": true,
                "totalCredentialsFound": if last { 1 } else { 0 },
                "allCredentialsFound": last
            })),
        );
    }
    transport.push(
        PATH_GET_WIFI_CREDENTIALS,
        Scripted::Json(json!({
            "canProceed": true,
            "allCredentialsReturned": true,
            "wifiCredentialsList": [
                {"ssid": "home", "securityProtocol": "WPA_PSK", "key": "hunter22"}
            ]
        })),
    );
    for next in [
        "START_PIN_BASED_SETUP",
        "COMPUTE_CONFIGURATION",
        "POST_WIFI_SCAN_DATA",
        "GET_WIFI_LIST",
        "CONNECTING_TO_USER_NETWORK",
        "DONE",
    ] {
        transport.push(
            PATH_REPORT,
            Scripted::Json(json!({
                "canProceed": true,
                "nextProvisioningState": next
            })),
        );
    }
}

#[derive(Default)]
struct RecordingCallbacks {
    registration: Mutex<Option<RegistrationDetails>>,
}

impl ProvisioneeCallbacks for RecordingCallbacks {
    fn save_registration_details(&self, details: &RegistrationDetails) {
        *self.registration.lock().expect("registration lock") =
            Some(details.clone());
    }
}

fn report_bodies(transport: &ScriptedTransport) -> Vec<Value> {
    transport
        .sent()
        .into_iter()
        .filter(|r| r.path == PATH_REPORT)
        .map(|r| r.body)
        .collect()
}

#[tokio::test]
async fn happy_path_provisions_the_device() -> Result<()> {
    let keyring = Arc::new(TestKeyring::new());
    let transport = Arc::new(ScriptedTransport::new(Arc::clone(&keyring)));
    let platform = Arc::new(FakeWifi {
        scan: scan_snapshot(),
        ..FakeWifi::default()
    });
    let user =
        test_user(&keyring, &transport, &platform, device_configuration());
    script_happy_path(&transport, 1);
    let callbacks = RecordingCallbacks::default();

    let result = run_session(Arc::clone(&user), &callbacks).await;
    assert_eq!(result, ProvisioningResult::Provisioned);

    // Every state action is followed by exactly one report; the state
    // with no DSS operation reports alone.
    assert_eq!(
        transport.sent_paths(),
        vec![
            PATH_START_PROVISIONING_SESSION,
            PATH_REPORT,
            PATH_START_PIN_BASED_SETUP,
            PATH_REPORT,
            PATH_COMPUTE_CONFIGURATION_DATA,
            PATH_REPORT,
            PATH_POST_WIFI_SCAN_DATA,
            PATH_REPORT,
            PATH_GET_WIFI_CREDENTIALS,
            PATH_REPORT,
            PATH_REPORT,
        ]
    );

    // The PIN traveled only as its salted hash.
    let pin_body = transport
        .body_for(PATH_START_PIN_BASED_SETUP)
        .expect("pin body");
    assert_eq!(
        pin_body["hashedPin"],
        hashed_pin("01234567", SALT_BYTES)
    );
    assert!(pin_body.get("pin").is_none());

    // Enterprise networks were filtered from the scan payload.
    let scan_body = transport
        .body_for(PATH_POST_WIFI_SCAN_DATA)
        .expect("scan body");
    let posted = scan_body["wifiScanDataList"].as_array().expect("list");
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0]["ssid"], "home");

    // Known cloud configuration was persisted, unknown keys skipped.
    user.with_configuration(|map| {
        assert_eq!(map.get_string(keys::REALM), Ok("USAmazon"));
        assert_eq!(
            map.get_string(keys::UTC_TIME),
            Ok("2019-09-06T18:14:12.62Z")
        );
        assert!(map.get("Vendor.Unrecognized").is_err());
    });

    // Registration details were surfaced and reflected in later reports.
    let registration = callbacks
        .registration
        .lock()
        .expect("registration lock")
        .clone()
        .expect("registration details");
    assert_eq!(registration.registration_token.as_deref(), Some("tok-1"));
    let reports = report_bodies(&transport);
    assert_eq!(reports[0]["registrationState"], "NOT_REGISTERED");
    assert_eq!(reports[2]["registrationState"], "IN_PROGRESS");

    // The final report carries the association attempt onto the user
    // network; the setup association is not reported.
    let last = reports.last().expect("final report");
    let attempts = last["connectionAttempts"].as_array().expect("attempts");
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0]["ssid"], "home");
    assert_eq!(attempts[0]["connectionState"], "ASSOCIATED");
    assert!(attempts[0].get("errorDetails").is_none());

    // The radio saw the derived 32-character setup SSID first, then the
    // user network.
    let associated = platform.associated.lock().expect("associated").clone();
    assert_eq!(associated.len(), 2);
    assert_eq!(associated[0].len(), 32);
    assert_eq!(associated[1], "home");
    Ok(())
}

#[tokio::test]
async fn cloud_refusal_terminates_without_further_posts() {
    let keyring = Arc::new(TestKeyring::new());
    let transport = Arc::new(ScriptedTransport::new(Arc::clone(&keyring)));
    let platform = Arc::new(FakeWifi::default());
    let user =
        test_user(&keyring, &transport, &platform, device_configuration());
    transport.push(
        PATH_START_PROVISIONING_SESSION,
        Scripted::Json(json!({
            "sessionId": "sess-1",
            "canProceed": false
        })),
    );

    let result = run_session(user, &DefaultCallbacks).await;
    assert_eq!(result, ProvisioningResult::NotProvisioned);
    assert_eq!(transport.sent_paths(), vec![PATH_START_PROVISIONING_SESSION]);
}

#[tokio::test]
async fn scan_loop_posts_until_all_credentials_are_found() -> Result<()> {
    let keyring = Arc::new(TestKeyring::new());
    let transport = Arc::new(ScriptedTransport::new(Arc::clone(&keyring)));
    let platform = Arc::new(FakeWifi {
        scan: scan_snapshot(),
        ..FakeWifi::default()
    });
    let user =
        test_user(&keyring, &transport, &platform, device_configuration());
    script_happy_path(&transport, 2);

    let result = run_session(user, &DefaultCallbacks).await;
    assert_eq!(result, ProvisioningResult::Provisioned);

    let scans: Vec<Value> = transport
        .sent()
        .into_iter()
        .filter(|r| r.path == PATH_POST_WIFI_SCAN_DATA)
        .map(|r| r.body)
        .collect();
    assert_eq!(scans.len(), 2);
    assert_eq!(scans[0]["sequenceNumber"], 1);
    assert_eq!(scans[1]["sequenceNumber"], 2);

    // The credentials loop still ran once.
    assert!(
        transport
            .sent_paths()
            .contains(&PATH_GET_WIFI_CREDENTIALS.to_string())
    );
    Ok(())
}

#[tokio::test]
async fn failed_association_is_reported_with_error_details() -> Result<()> {
    let keyring = Arc::new(TestKeyring::new());
    let transport = Arc::new(ScriptedTransport::new(Arc::clone(&keyring)));
    let platform = Arc::new(FakeWifi {
        scan: scan_snapshot(),
        ..FakeWifi::default()
    });
    platform.fail_ssid("neighbor", AssociationError::AuthenticationFailed);
    let user =
        test_user(&keyring, &transport, &platform, device_configuration());

    script_happy_path(&transport, 1);
    // Replace the credentials answer: the mistyped neighbor network
    // comes back first, the good one second.
    transport
        .scripts
        .lock()
        .expect("script lock")
        .get_mut(PATH_GET_WIFI_CREDENTIALS)
        .expect("queued")
        .clear();
    transport.push(
        PATH_GET_WIFI_CREDENTIALS,
        Scripted::Json(json!({
            "canProceed": true,
            "allCredentialsReturned": true,
            "wifiCredentialsList": [
                {"ssid": "neighbor", "securityProtocol": "WPA_PSK", "key": "wrong"},
                {"ssid": "home", "securityProtocol": "WPA_PSK", "key": "right"}
            ]
        })),
    );

    let result = run_session(user, &DefaultCallbacks).await;
    assert_eq!(result, ProvisioningResult::Provisioned);

    let reports = report_bodies(&transport);
    let last = reports.last().expect("final report");
    let attempts = last["connectionAttempts"].as_array().expect("attempts");
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0]["ssid"], "neighbor");
    assert_eq!(attempts[0]["connectionState"], "AUTHENTICATION_FAILED");
    assert_eq!(attempts[0]["errorDetails"]["code"], "3:2:0:1");
    assert_eq!(attempts[1]["ssid"], "home");
    assert!(attempts[1].get("errorDetails").is_none());
    Ok(())
}

#[tokio::test]
async fn malformed_credential_entries_are_skipped() -> Result<()> {
    let keyring = Arc::new(TestKeyring::new());
    let transport = Arc::new(ScriptedTransport::new(Arc::clone(&keyring)));
    let platform = Arc::new(FakeWifi {
        scan: scan_snapshot(),
        ..FakeWifi::default()
    });
    let user =
        test_user(&keyring, &transport, &platform, device_configuration());

    script_happy_path(&transport, 1);
    transport
        .scripts
        .lock()
        .expect("script lock")
        .get_mut(PATH_GET_WIFI_CREDENTIALS)
        .expect("queued")
        .clear();
    transport.push(
        PATH_GET_WIFI_CREDENTIALS,
        Scripted::Json(json!({
            "canProceed": true,
            "allCredentialsReturned": true,
            "wifiCredentialsList": [
                {"securityProtocol": 12, "junk": true},
                {"ssid": "home", "securityProtocol": "WPA_PSK", "key": "right"}
            ]
        })),
    );

    let result = run_session(Arc::clone(&user), &DefaultCallbacks).await;
    assert_eq!(result, ProvisioningResult::Provisioned);
    Ok(())
}

#[tokio::test]
async fn a_failed_report_fails_the_session() {
    let keyring = Arc::new(TestKeyring::new());
    let transport = Arc::new(ScriptedTransport::new(Arc::clone(&keyring)));
    let platform = Arc::new(FakeWifi::default());
    let user =
        test_user(&keyring, &transport, &platform, device_configuration());
    transport.push(
        PATH_START_PROVISIONING_SESSION,
        Scripted::Json(json!({
            "sessionId": "sess-1",
            "canProceed": true,
            "salt": SALT_B64
        })),
    );
    // No report response is scripted: the oracle is unreachable.

    let result = run_session(user, &DefaultCallbacks).await;
    assert_eq!(result, ProvisioningResult::NotProvisioned);
}
