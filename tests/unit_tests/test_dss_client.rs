// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::Result;
use ffs_client_rs::{
    client::dss_client::{
        DSS_DEFAULT_HOST, DssClientContext, PATH_REPORT,
        PATH_START_PROVISIONING_SESSION,
    },
    config_map::keys,
    models::common::{
        DssRegistrationState, DssReportResult, DssWifiProvisioneeState,
    },
};
use serde_json::json;

use crate::unit_tests::{
    FakeWifi, Scripted, ScriptedTransport, TestKeyring, device_configuration,
    test_user,
};

fn session_response() -> serde_json::Value {
    json!({
        "sessionId": "sess-1",
        "canProceed": true,
        "salt": "AAAAAAAAAAA="
    })
}

struct Fixture {
    keyring: Arc<TestKeyring>,
    transport: Arc<ScriptedTransport>,
    client: DssClientContext,
    user: Arc<ffs_client_rs::client::context::UserContext>,
}

fn fixture() -> Fixture {
    let keyring = Arc::new(TestKeyring::new());
    let transport = Arc::new(ScriptedTransport::new(Arc::clone(&keyring)));
    let platform = Arc::new(FakeWifi::default());
    let user = test_user(&keyring, &transport, &platform, device_configuration());
    let client = DssClientContext::new(Arc::clone(&user)).expect("client");
    Fixture {
        keyring,
        transport,
        client,
        user,
    }
}

#[tokio::test]
async fn nonce_is_fresh_and_fixed_length() -> Result<()> {
    let mut fx = fixture();
    fx.client.refresh_nonce()?;
    let first = fx.client.nonce();
    fx.client.refresh_nonce()?;
    let second = fx.client.nonce();

    assert_eq!(first.len(), 22);
    assert_eq!(second.len(), 22);
    assert_ne!(first, second);
    Ok(())
}

#[tokio::test]
async fn start_session_assigns_the_session_id() -> Result<()> {
    let mut fx = fixture();
    fx.transport.push(
        PATH_START_PROVISIONING_SESSION,
        Scripted::Json(session_response()),
    );

    let response = fx.client.start_provisioning_session().await?;
    assert!(response.can_proceed);
    assert_eq!(fx.client.session_id().as_deref(), Some("sess-1"));

    let body = fx
        .transport
        .body_for(PATH_START_PROVISIONING_SESSION)
        .expect("request body");
    assert_eq!(body["nonce"].as_str().expect("nonce").len(), 22);
    assert!(body.get("sessionId").is_none());
    Ok(())
}

#[tokio::test]
async fn unsigned_body_never_reaches_the_parser() {
    let mut fx = fixture();
    // Not even valid JSON: proof the parser never sees it.
    for _ in 0..3 {
        fx.transport.push(
            PATH_START_PROVISIONING_SESSION,
            Scripted::Raw {
                status: 200,
                headers: vec![],
                body: Some(b"not json at all".to_vec()),
            },
        );
    }

    let result = fx.client.start_provisioning_session().await;
    assert!(result.is_err());
    assert_eq!(fx.client.session_id(), None);
    // All three attempts were spent on the retry budget.
    assert_eq!(fx.transport.sent().len(), 3);
}

#[tokio::test]
async fn transport_faults_are_retried_with_a_budget() -> Result<()> {
    let mut fx = fixture();
    fx.transport
        .push(PATH_START_PROVISIONING_SESSION, Scripted::Failure);
    fx.transport
        .push(PATH_START_PROVISIONING_SESSION, Scripted::Failure);
    fx.transport.push(
        PATH_START_PROVISIONING_SESSION,
        Scripted::Json(session_response()),
    );

    let response = fx.client.start_provisioning_session().await?;
    assert!(response.can_proceed);
    assert_eq!(fx.transport.sent().len(), 3);
    Ok(())
}

#[tokio::test]
async fn invalid_signature_fails_then_a_retry_succeeds() -> Result<()> {
    let mut fx = fixture();
    fx.transport.push(
        PATH_START_PROVISIONING_SESSION,
        Scripted::BadSignature(session_response()),
    );
    fx.transport.push(
        PATH_START_PROVISIONING_SESSION,
        Scripted::Json(session_response()),
    );

    let response = fx.client.start_provisioning_session().await?;
    assert!(response.can_proceed);
    assert_eq!(fx.transport.sent().len(), 2);
    Ok(())
}

#[tokio::test]
async fn duplicate_signature_header_is_a_hard_error() {
    let mut fx = fixture();
    let body = serde_json::to_vec(&session_response()).expect("body");
    let signature = fx.keyring.signature_header(&body);
    for _ in 0..3 {
        fx.transport.push(
            PATH_START_PROVISIONING_SESSION,
            Scripted::Raw {
                status: 200,
                headers: vec![
                    ("x-amzn-dss-signature".into(), signature.clone()),
                    ("x-amzn-dss-signature".into(), signature.clone()),
                ],
                body: Some(body.clone()),
            },
        );
    }

    assert!(fx.client.start_provisioning_session().await.is_err());
}

#[tokio::test]
async fn three_redirect_hops_are_followed() -> Result<()> {
    let mut fx = fixture();
    fx.transport.push(
        PATH_START_PROVISIONING_SESSION,
        Scripted::Redirect(307, "https://h1.amazon.com"),
    );
    fx.transport.push(
        PATH_START_PROVISIONING_SESSION,
        Scripted::Redirect(307, "https://h2.amazon.com"),
    );
    fx.transport.push(
        PATH_START_PROVISIONING_SESSION,
        Scripted::Redirect(307, "https://h3.amazon.com"),
    );
    fx.transport.push(
        PATH_START_PROVISIONING_SESSION,
        Scripted::Json(session_response()),
    );

    fx.client.start_provisioning_session().await?;

    let hosts: Vec<String> =
        fx.transport.sent().into_iter().map(|r| r.host).collect();
    assert_eq!(
        hosts,
        vec![
            DSS_DEFAULT_HOST.to_string(),
            "h1.amazon.com".to_string(),
            "h2.amazon.com".to_string(),
            "h3.amazon.com".to_string(),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn a_fourth_redirect_fails_the_call() {
    let mut fx = fixture();
    for host in [
        "https://h1.amazon.com",
        "https://h2.amazon.com",
        "https://h3.amazon.com",
        "https://h4.amazon.com",
    ] {
        fx.transport.push(
            PATH_START_PROVISIONING_SESSION,
            Scripted::Redirect(307, host),
        );
    }
    // A valid response is waiting, but the cap fires first.
    fx.transport.push(
        PATH_START_PROVISIONING_SESSION,
        Scripted::Json(session_response()),
    );

    assert!(fx.client.start_provisioning_session().await.is_err());
    assert_eq!(fx.transport.sent().len(), 4);
}

#[tokio::test]
async fn permanent_redirect_persists_the_new_host() -> Result<()> {
    let mut fx = fixture();
    fx.transport.push(
        PATH_START_PROVISIONING_SESSION,
        Scripted::Redirect(308, "https://dp-sps-eu.amazon.com"),
    );
    fx.transport.push(
        PATH_START_PROVISIONING_SESSION,
        Scripted::Json(session_response()),
    );

    fx.client.start_provisioning_session().await?;

    let stored = fx
        .user
        .with_configuration(|map| map.optional_string(keys::DSS_HOST))?;
    assert_eq!(stored.as_deref(), Some("dp-sps-eu.amazon.com"));

    // A fresh client built from the same user context starts there.
    let fresh = DssClientContext::new(Arc::clone(&fx.user))?;
    assert_eq!(fresh.host(), "dp-sps-eu.amazon.com");
    Ok(())
}

#[tokio::test]
async fn temporary_redirect_leaves_the_stored_host_alone() -> Result<()> {
    let mut fx = fixture();
    fx.transport.push(
        PATH_START_PROVISIONING_SESSION,
        Scripted::Redirect(307, "https://dp-sps-eu.amazon.com"),
    );
    fx.transport.push(
        PATH_START_PROVISIONING_SESSION,
        Scripted::Json(session_response()),
    );

    fx.client.start_provisioning_session().await?;

    let stored = fx
        .user
        .with_configuration(|map| map.optional_string(keys::DSS_HOST))?;
    assert_eq!(stored, None);

    let fresh = DssClientContext::new(Arc::clone(&fx.user))?;
    assert_eq!(fresh.host(), DSS_DEFAULT_HOST);
    Ok(())
}

#[tokio::test]
async fn report_carries_the_global_sequence_number() -> Result<()> {
    let mut fx = fixture();
    fx.transport.push(
        PATH_START_PROVISIONING_SESSION,
        Scripted::Json(session_response()),
    );
    fx.transport.push(
        PATH_REPORT,
        Scripted::Json(json!({
            "canProceed": true,
            "nextProvisioningState": "START_PIN_BASED_SETUP"
        })),
    );

    fx.client.start_provisioning_session().await?;
    let response = fx
        .client
        .report(
            DssWifiProvisioneeState::StartProvisioning,
            DssReportResult::Success,
            DssRegistrationState::NotRegistered,
            &[],
        )
        .await?;

    assert_eq!(
        response.next_provisioning_state,
        DssWifiProvisioneeState::StartPinBasedSetup
    );
    let body = fx.transport.body_for(PATH_REPORT).expect("report body");
    // startProvisioningSession consumed 1, the report took 2.
    assert_eq!(body["sequenceNumber"], 2);
    assert_eq!(body["sessionId"], "sess-1");
    assert_eq!(body["provisioneeState"], "START_PROVISIONING");
    // Nonces are regenerated per request.
    let first = fx
        .transport
        .body_for(PATH_START_PROVISIONING_SESSION)
        .expect("first body");
    assert_ne!(first["nonce"], body["nonce"]);
    Ok(())
}
