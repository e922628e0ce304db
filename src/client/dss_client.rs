// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::{
    client::{
        context::UserContext,
        http::{HttpRequest, HttpResponseHandler},
    },
    codec::base64,
    config_map::{ConfigurationMap, MapValue, keys},
    crypto::{self, DeviceKeys},
    error::FfsError,
    models::{
        common::{
            DeviceDetails, DssRegistrationState, DssReportResult,
            DssWifiProvisioneeState,
        },
        compute_configuration_data::{
            ComputeConfigurationDataRequest, ComputeConfigurationDataResponse,
        },
        get_wifi_credentials::{
            GetWifiCredentialsRequest, GetWifiCredentialsResponse,
        },
        post_wifi_scan_data::{PostWifiScanDataRequest, PostWifiScanDataResponse},
        report::{ReportRequest, ReportResponse},
        start_pin_based_setup::{
            StartPinBasedSetupRequest, StartPinBasedSetupResponse,
        },
        start_provisioning_session::{
            StartProvisioningSessionRequest, StartProvisioningSessionResponse,
        },
        wifi::{WifiConfiguration, WifiConnectionAttempt, WifiScanResult},
    },
    stream::Stream,
};

pub const DSS_DEFAULT_HOST: &str = "dp-sps-na.amazon.com";
pub const DSS_HTTPS_PORT: u16 = 443;
/// Redirect hops followed within one call.
pub const DSS_MAX_REDIRECTS: usize = 3;
/// Transport attempts per call. A failed attempt resets the per-call
/// response state through `before_retry` and re-sends the same body.
pub const DSS_HTTP_ATTEMPTS: usize = 3;

const LOCATION_HEADER: &str = "location";
const SIGNATURE_HEADER: &str = "x-amzn-dss-signature";
const HTTP_TEMPORARY_REDIRECT: u16 = 307;
const HTTP_PERMANENT_REDIRECT: u16 = 308;

pub const PATH_START_PROVISIONING_SESSION: &str =
    "/api/v1/startProvisioningSession";
pub const PATH_START_PIN_BASED_SETUP: &str = "/api/v1/startPinBasedSetup";
pub const PATH_COMPUTE_CONFIGURATION_DATA: &str =
    "/api/v1/computeConfigurationData";
pub const PATH_POST_WIFI_SCAN_DATA: &str = "/api/v1/postWifiScanData";
pub const PATH_GET_WIFI_CREDENTIALS: &str = "/api/v1/getWifiCredentials";
pub const PATH_REPORT: &str = "/api/v1/report";

const HOST_CAPACITY: usize = 253;
const SESSION_ID_CAPACITY: usize = 256;
/// 22 base64 characters plus the terminator.
const NONCE_CAPACITY: usize = 23;
const BODY_CAPACITY: usize = 8192;
/// A DER ECDSA-P256 signature tops out at 72 bytes.
const SIGNATURE_CAPACITY: usize = 80;

/// Per-call response state, reset by `before_retry`.
struct DssResponseState<'a> {
    keys: &'a DeviceKeys,
    has_status: bool,
    status: u16,
    has_signature: bool,
    signature: Stream,
    has_body: bool,
    body_verified: bool,
    has_redirect: bool,
    redirect_host: Option<String>,
    verified_body: Option<Vec<u8>>,
    summary: Result<(), FfsError>,
}

impl<'a> DssResponseState<'a> {
    fn new(keys: &'a DeviceKeys) -> Self {
        Self {
            keys,
            has_status: false,
            status: 0,
            has_signature: false,
            signature: Stream::output(SIGNATURE_CAPACITY),
            has_body: false,
            body_verified: false,
            has_redirect: false,
            redirect_host: None,
            verified_body: None,
            summary: Ok(()),
        }
    }

    fn is_redirect_status(&self) -> bool {
        self.has_status
            && (self.status == HTTP_TEMPORARY_REDIRECT
                || self.status == HTTP_PERMANENT_REDIRECT)
    }

    fn fail(&mut self, message: &'static str) -> anyhow::Error {
        self.summary = Err(FfsError::Error);
        anyhow::anyhow!(message)
    }
}

impl HttpResponseHandler for DssResponseState<'_> {
    fn on_status(&mut self, status: u16) -> Result<()> {
        self.has_status = true;
        self.status = status;
        Ok(())
    }

    fn on_header(&mut self, name: &str, value: &str) -> Result<()> {
        if name.eq_ignore_ascii_case(LOCATION_HEADER) && self.is_redirect_status()
        {
            if self.has_redirect {
                return Err(self.fail("duplicate Location header"));
            }
            match extract_redirect_host(value) {
                Ok(host) => {
                    self.redirect_host = Some(host);
                    self.has_redirect = true;
                },
                Err(e) => {
                    self.summary = Err(FfsError::Error);
                    return Err(e);
                },
            }
        }

        if name.eq_ignore_ascii_case(SIGNATURE_HEADER) {
            if self.has_signature {
                return Err(self.fail("duplicate signature header"));
            }
            let mut encoded = Stream::input(value.as_bytes());
            if base64::decode(&mut encoded, &mut self.signature).is_err() {
                return Err(self.fail("signature header is not valid base64"));
            }
            self.has_signature = true;
        }

        Ok(())
    }

    fn on_body(&mut self, body: &[u8]) -> Result<()> {
        if !self.has_signature {
            return Err(self.fail("response body without a signature header"));
        }
        if self.has_body {
            return Err(self.fail("second response body"));
        }
        self.has_body = true;

        if !self.keys.verify_cloud_signature(body, self.signature.peek()) {
            return Err(self.fail("signature is invalid, failing the call"));
        }

        debug!("signature is valid");
        self.body_verified = true;
        self.verified_body = Some(body.to_vec());
        Ok(())
    }

    fn before_retry(&mut self) -> Result<()> {
        self.has_status = false;
        self.has_signature = false;
        self.has_body = false;
        self.body_verified = false;
        self.has_redirect = false;
        self.redirect_host = None;
        self.verified_body = None;
        self.signature.flush();
        self.summary = Ok(());
        Ok(())
    }
}

/// Extract the host from a redirect target of the form
/// `https://{host}(:port)?(/path)?`. The port and path are parsed but
/// not honored.
fn extract_redirect_host(value: &str) -> Result<String> {
    let url = Url::parse(value).context("redirect Location is not a valid URL")?;
    if url.scheme() != "https" {
        bail!("redirect scheme must be https, got {}", url.scheme());
    }
    let host = url
        .host_str()
        .context("redirect Location carries no host")?;
    Ok(host.to_string())
}

fn map_value_from_json(value: &Value) -> Option<MapValue> {
    match value {
        Value::String(s) => Some(MapValue::String(s.clone())),
        Value::Bool(b) => Some(MapValue::Boolean(*b)),
        Value::Number(n) => n.as_i64().map(MapValue::Integer),
        _ => None,
    }
}

/// `base64(SHA-256(pin || salt))` -- the PIN appears on the wire only
/// inside this hash.
pub fn hashed_pin(pin: &str, salt: &[u8]) -> String {
    let mut salted = Vec::with_capacity(pin.len() + salt.len());
    salted.extend_from_slice(pin.as_bytes());
    salted.extend_from_slice(salt);
    base64::encode_to_string(&crypto::sha256(&salted))
}

/// Device Setup Service client for one provisioning session.
///
/// Owns the four long-lived buffers, the current host and port, the
/// session ID assigned by the first `startProvisioningSession` response,
/// the per-request nonce and the call sequence number.
pub struct DssClientContext {
    user: Arc<UserContext>,
    host: Stream,
    session_id: Stream,
    nonce: Stream,
    body: Stream,
    port: u16,
    sequence_number: u32,
}

impl DssClientContext {
    pub fn new(user: Arc<UserContext>) -> Result<Self> {
        let stored_host = user.with_configuration(|map| {
            map.optional_string(keys::DSS_HOST)
        })?;
        let stored_port = user.with_configuration(|map| {
            match map.get_integer(keys::DSS_PORT) {
                Ok(port) => Ok(Some(port)),
                Err(FfsError::NotImplemented) => Ok(None),
                Err(e) => Err(e),
            }
        })?;

        let mut host = Stream::output(HOST_CAPACITY);
        host.write_str(stored_host.as_deref().unwrap_or(DSS_DEFAULT_HOST))?;
        let port = match stored_port {
            Some(p) => u16::try_from(p).context("DSS.Port is out of range")?,
            None => DSS_HTTPS_PORT,
        };

        Ok(Self {
            user,
            host,
            session_id: Stream::output(SESSION_ID_CAPACITY),
            nonce: Stream::output(NONCE_CAPACITY),
            body: Stream::output(BODY_CAPACITY),
            port,
            sequence_number: 1,
        })
    }

    pub fn host(&self) -> String {
        String::from_utf8_lossy(self.host.peek()).into_owned()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The current nonce, without its terminator.
    pub fn nonce(&self) -> String {
        let bytes = self.nonce.peek();
        let end = bytes.len().saturating_sub(1);
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    }

    pub fn session_id(&self) -> Option<String> {
        let bytes = self.session_id.peek();
        if bytes.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(&bytes[..bytes.len() - 1]).into_owned())
    }

    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    fn next_sequence_number(&mut self) -> u32 {
        let current = self.sequence_number;
        self.sequence_number += 1;
        current
    }

    /// Refresh the per-request nonce: base64 of fresh random bytes,
    /// generated 4 characters at a time, filling the buffer up to its
    /// capacity minus one, then terminated.
    pub fn refresh_nonce(&mut self) -> Result<(), FfsError> {
        self.nonce.flush();

        let mut data = Stream::output(3);
        let mut encoded = Stream::output(4);

        while self.nonce.space_size() > 1 {
            if encoded.is_empty() {
                data.flush();
                let mut random = [0u8; 3];
                crypto::random_bytes(&mut random);
                data.write(&random)?;
                encoded.flush();
                base64::encode(&mut data, 0, "", &mut encoded)?;
            }
            let character = encoded.read_byte()?;
            self.nonce.write_byte(character)?;
        }

        self.nonce.write_byte(0)
    }

    fn set_session_id(&mut self, id: &str) -> Result<(), FfsError> {
        self.session_id.flush();
        self.session_id.write_str(id)?;
        self.session_id.write_byte(0)
    }

    fn require_session_id(&self) -> Result<String> {
        self.session_id()
            .context("no session ID; startProvisioningSession must run first")
    }

    fn device_details(&self) -> Result<DeviceDetails> {
        self.user
            .with_configuration(|map| DeviceDetails::from_configuration(map))
            .context("failed to assemble device details")
    }

    fn serialize_body<T: Serialize>(&mut self, request: &T) -> Result<()> {
        self.body.flush();
        serde_json::to_writer(&mut self.body, request)
            .context("request body does not fit the shared buffer")
    }

    fn set_host(&mut self, host: &str) -> Result<(), FfsError> {
        self.host.flush();
        self.host.write_str(host)
    }

    /// Persist the current host so later sessions start there directly.
    fn persist_default_host(&self) {
        let host = self.host();
        self.user.with_configuration(|map| {
            map.set(keys::DSS_HOST, MapValue::String(host));
        });
    }

    /// Send the serialized body to `path` and return the verified
    /// response body, following up to three redirect hops and retrying
    /// failed attempts with a state reset in between.
    async fn execute(&mut self, path: &'static str) -> Result<Vec<u8>> {
        let user = Arc::clone(&self.user);
        let mut state = DssResponseState::new(&user.keys);
        let mut request = HttpRequest {
            host: self.host(),
            port: self.port,
            path,
            body: Bytes::copy_from_slice(self.body.peek()),
        };

        let mut redirects = 0usize;
        let mut failures = 0usize;

        loop {
            debug!(
                "DSS client sending request to https://{}:{}{}",
                request.host, request.port, request.path
            );

            let outcome = match user.transport.execute(&request, &mut state).await
            {
                Ok(()) => state.summary.map_err(anyhow::Error::new),
                Err(e) => Err(e),
            };

            if let Err(e) = outcome {
                failures += 1;
                if failures >= DSS_HTTP_ATTEMPTS {
                    return Err(e.context("DSS call failed after retries"));
                }
                warn!("DSS attempt failed, retrying: {e:#}");
                state.before_retry()?;
                continue;
            }

            if !state.has_status {
                bail!("failed to get a status code");
            }
            debug!("DSS client received HTTP status code {}", state.status);

            if state.has_redirect {
                redirects += 1;
                if redirects > DSS_MAX_REDIRECTS {
                    bail!("too many redirects ({DSS_MAX_REDIRECTS} allowed)");
                }
                let host = state
                    .redirect_host
                    .take()
                    .context("redirect without a target host")?;
                debug!("DSS client was redirected to {host}");
                self.set_host(&host)?;
                request.host = host;
                if state.status == HTTP_PERMANENT_REDIRECT {
                    self.persist_default_host();
                }
                state.before_retry()?;
                continue;
            }

            if !state.body_verified {
                bail!("response finished without a verified body");
            }

            return state
                .verified_body
                .take()
                .context("verified body disappeared");
        }
    }

    /// `POST /startProvisioningSession`. Assigns the session ID used by
    /// every later call.
    pub async fn start_provisioning_session(
        &mut self,
    ) -> Result<StartProvisioningSessionResponse> {
        let _ = self.next_sequence_number();
        self.refresh_nonce()?;
        let nonce = self.nonce();
        self.serialize_body(&StartProvisioningSessionRequest { nonce: &nonce })?;

        let body = self.execute(PATH_START_PROVISIONING_SESSION).await?;
        let response: StartProvisioningSessionResponse =
            serde_json::from_slice(&body)
                .context("malformed startProvisioningSession response")?;

        self.set_session_id(&response.session_id)?;
        Ok(response)
    }

    /// `POST /startPinBasedSetup`. The PIN is read from the
    /// configuration map at call time and only its salted hash travels.
    pub async fn start_pin_based_setup(
        &mut self,
        salt: &[u8],
    ) -> Result<StartPinBasedSetupResponse> {
        let _ = self.next_sequence_number();
        self.refresh_nonce()?;
        let nonce = self.nonce();
        let session_id = self.require_session_id()?;
        let device_details = self.device_details()?;
        let pin = self
            .user
            .with_configuration(|map| {
                map.get_string(keys::PIN).map(str::to_owned)
            })
            .context("device PIN is not configured")?;

        self.serialize_body(&StartPinBasedSetupRequest {
            nonce: &nonce,
            session_id: &session_id,
            device_details: &device_details,
            hashed_pin: hashed_pin(&pin, salt),
        })?;

        let body = self.execute(PATH_START_PIN_BASED_SETUP).await?;
        serde_json::from_slice(&body)
            .context("malformed startPinBasedSetup response")
    }

    /// `POST /computeConfigurationData`. Recognized configuration keys
    /// are written back into the configuration map; unknown keys are
    /// silently skipped.
    pub async fn compute_configuration_data(
        &mut self,
    ) -> Result<ComputeConfigurationDataResponse> {
        let _ = self.next_sequence_number();
        self.refresh_nonce()?;
        let nonce = self.nonce();
        let session_id = self.require_session_id()?;
        let device_details = self.device_details()?;

        self.serialize_body(&ComputeConfigurationDataRequest {
            nonce: &nonce,
            session_id: &session_id,
            device_details: &device_details,
        })?;

        let body = self.execute(PATH_COMPUTE_CONFIGURATION_DATA).await?;
        let response: ComputeConfigurationDataResponse =
            serde_json::from_slice(&body)
                .context("malformed computeConfigurationData response")?;

        if let Some(configuration) = &response.configuration {
            self.user.with_configuration(|map| {
                for (key, value) in configuration {
                    match map_value_from_json(value) {
                        Some(v) if ConfigurationMap::recognizes(key) => {
                            map.set(key, v);
                        },
                        _ => {
                            debug!("ignoring unsupported configuration entry {key}");
                        },
                    }
                }
            });
        }

        Ok(response)
    }

    /// `POST /postWifiScanData`. Networks with non-postable security
    /// protocols are dropped before serialization.
    pub async fn post_wifi_scan_data(
        &mut self,
        sequence_number: u32,
        scan_results: &[WifiScanResult],
    ) -> Result<PostWifiScanDataResponse> {
        let _ = self.next_sequence_number();
        self.refresh_nonce()?;
        let nonce = self.nonce();
        let session_id = self.require_session_id()?;
        let device_details = self.device_details()?;
        let postable: Vec<WifiScanResult> = scan_results
            .iter()
            .filter(|r| r.security_protocol.is_postable())
            .cloned()
            .collect();

        self.serialize_body(&PostWifiScanDataRequest {
            nonce: &nonce,
            session_id: &session_id,
            sequence_number,
            device_details: &device_details,
            wifi_scan_data_list: &postable,
        })?;

        let body = self.execute(PATH_POST_WIFI_SCAN_DATA).await?;
        serde_json::from_slice(&body)
            .context("malformed postWifiScanData response")
    }

    /// `POST /getWifiCredentials`. Individual malformed entries are
    /// skipped with a warning; the operation still succeeds.
    pub async fn get_wifi_credentials(
        &mut self,
        sequence_number: u32,
    ) -> Result<(GetWifiCredentialsResponse, Vec<WifiConfiguration>)> {
        let _ = self.next_sequence_number();
        self.refresh_nonce()?;
        let nonce = self.nonce();
        let session_id = self.require_session_id()?;
        let device_details = self.device_details()?;

        self.serialize_body(&GetWifiCredentialsRequest {
            nonce: &nonce,
            session_id: &session_id,
            sequence_number,
            device_details: &device_details,
        })?;

        let body = self.execute(PATH_GET_WIFI_CREDENTIALS).await?;
        let response: GetWifiCredentialsResponse = serde_json::from_slice(&body)
            .context("malformed getWifiCredentials response")?;

        let mut credentials = Vec::new();
        for entry in &response.wifi_credentials_list {
            match serde_json::from_value::<WifiConfiguration>(entry.clone()) {
                Ok(config) if config.validate() => credentials.push(config),
                Ok(config) => {
                    warn!(
                        "ignoring out-of-range Wi-Fi configuration for {}",
                        config.ssid
                    );
                },
                Err(e) => {
                    warn!(
                        "error parsing a Wi-Fi configuration from the response, \
                         ignoring the entry: {e}"
                    );
                },
            }
        }

        Ok((response, credentials))
    }

    /// `POST /report`. The response is the authoritative transition
    /// oracle for the provisionee state machine.
    pub async fn report(
        &mut self,
        provisionee_state: DssWifiProvisioneeState,
        state_transition_result: DssReportResult,
        registration_state: DssRegistrationState,
        connection_attempts: &[WifiConnectionAttempt],
    ) -> Result<ReportResponse> {
        let sequence_number = self.next_sequence_number();
        self.refresh_nonce()?;
        let nonce = self.nonce();
        let session_id = self.require_session_id()?;
        let device_details = self.device_details()?;

        self.serialize_body(&ReportRequest {
            nonce: &nonce,
            session_id: &session_id,
            sequence_number,
            device_details: &device_details,
            provisionee_state,
            state_transition_result,
            registration_state,
            connection_attempts,
        })?;

        let body = self.execute(PATH_REPORT).await?;
        serde_json::from_slice(&body).context("malformed report response")
    }
}
