// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use ffs_client_rs::models::{
    common::{
        DeviceDetails, DssRegistrationState, DssReportResult,
        DssWifiProvisioneeState,
    },
    compute_configuration_data::ComputeConfigurationDataResponse,
    get_wifi_credentials::GetWifiCredentialsResponse,
    post_wifi_scan_data::{PostWifiScanDataRequest, PostWifiScanDataResponse},
    report::{ReportRequest, ReportResponse},
    start_provisioning_session::StartProvisioningSessionResponse,
    wifi::{WifiScanResult, WifiSecurityProtocol},
};
use serde_json::json;

fn sample_details() -> DeviceDetails {
    DeviceDetails {
        manufacturer: Some("Amazon".into()),
        device_model: Some("A39GNED7NAJGKP".into()),
        device_serial: Some("G030JU0660540206".into()),
        product_index: Some("CbtN".into()),
        software_version_index: Some("00".into()),
        device_name: Some("DashButton".into()),
        firmware_version: Some("0.6.195".into()),
        hardware_version: Some("0.0.0".into()),
    }
}

#[test]
fn post_wifi_scan_data_request_snapshot() -> Result<()> {
    let details = sample_details();
    let scan = [WifiScanResult {
        ssid: "cafe".into(),
        bssid: "74:c2:46:bb:44:41".into(),
        security_protocol: WifiSecurityProtocol::Wep,
        frequency: 2412,
        signal_strength: -71,
    }];
    let request = PostWifiScanDataRequest {
        nonce: "T84yTlBWa3YfXIXs2y3zdA",
        session_id: "sess-1",
        sequence_number: 3,
        device_details: &details,
        wifi_scan_data_list: &scan,
    };

    assert_eq!(
        serde_json::to_value(&request)?,
        json!({
            "nonce": "T84yTlBWa3YfXIXs2y3zdA",
            "sessionId": "sess-1",
            "sequenceNumber": 3,
            "deviceDetails": {
                "manufacturer": "Amazon",
                "deviceModel": "A39GNED7NAJGKP",
                "deviceSerial": "G030JU0660540206",
                "productIndex": "CbtN",
                "softwareVersionIndex": "00",
                "deviceName": "DashButton",
                "firmwareVersion": "0.6.195",
                "hardwareVersion": "0.0.0"
            },
            "wifiScanDataList": [{
                "ssid": "cafe",
                "bssid": "74:c2:46:bb:44:41",
                "securityProtocol": "WEP",
                "frequency": 2412,
                "signalStrength": -71
            }]
        })
    );
    Ok(())
}

#[test]
fn report_request_snapshot() -> Result<()> {
    let details = DeviceDetails::default();
    let request = ReportRequest {
        nonce: "n",
        session_id: "sess-1",
        sequence_number: 7,
        device_details: &details,
        provisionee_state: DssWifiProvisioneeState::ComputeConfiguration,
        state_transition_result: DssReportResult::Failure,
        registration_state: DssRegistrationState::InProgress,
        connection_attempts: &[],
    };

    assert_eq!(
        serde_json::to_value(&request)?,
        json!({
            "nonce": "n",
            "sessionId": "sess-1",
            "sequenceNumber": 7,
            "deviceDetails": {},
            "provisioneeState": "COMPUTE_CONFIGURATION",
            "stateTransitionResult": "FAILURE",
            "registrationState": "IN_PROGRESS"
        })
    );
    Ok(())
}

#[test]
fn every_response_tolerates_unknown_keys() -> Result<()> {
    let _: StartProvisioningSessionResponse = serde_json::from_value(json!({
        "sessionId": "s",
        "canProceed": true,
        "salt": "c2FsdHNhbHQ=",
        "brandNewField": {"x": 1}
    }))?;
    let _: ComputeConfigurationDataResponse = serde_json::from_value(json!({
        "configuration": {},
        "somethingElse": 9
    }))?;
    let _: PostWifiScanDataResponse = serde_json::from_value(json!({
        "canProceed": true,
        "extra": [1, 2]
    }))?;
    let _: GetWifiCredentialsResponse = serde_json::from_value(json!({
        "canProceed": true,
        "futureFlag": false
    }))?;
    let _: ReportResponse = serde_json::from_value(json!({
        "canProceed": true,
        "nextProvisioningState": "DONE",
        "advice": "ignore me"
    }))?;
    Ok(())
}

#[test]
fn loop_counters_default_when_absent() -> Result<()> {
    let response: PostWifiScanDataResponse =
        serde_json::from_value(json!({"canProceed": true}))?;
    assert_eq!(response.total_credentials_found, 0);
    assert!(!response.all_credentials_found);

    let response: GetWifiCredentialsResponse =
        serde_json::from_value(json!({"canProceed": true}))?;
    assert!(!response.all_credentials_returned);
    assert!(response.wifi_credentials_list.is_empty());
    Ok(())
}
