// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::{
    client::{context::UserContext, dss_client::DssClientContext},
    codec::base64,
    error::ProvisioningResult,
    models::common::{DssRegistrationState, RegistrationDetails},
    models::wifi::WifiConfiguration,
    provisionee::{
        setup_network::{compute_encoded_setup_network, default_setup_network},
        states::{ProvisioneeState, ServerAdvice, StateOutcome, advance},
    },
};

/// Default cap on postWifiScanData calls per visit of that state.
const MAX_WIFI_SCAN_POSTS: u32 = 5;
/// Default cap on getWifiCredentials calls per visit of that state.
const MAX_CREDENTIAL_FETCHES: u32 = 5;

/// Host hooks gating the session. The defaults proceed until the cloud
/// reports completeness or the per-state call caps are reached.
pub trait ProvisioneeCallbacks: Send + Sync {
    /// Polled at every state boundary; `false` terminates gracefully.
    fn can_proceed(&self) -> bool {
        true
    }

    fn can_post_wifi_scan_data(
        &self,
        sequence_number: u32,
        _total_credentials_found: u32,
        all_credentials_found: bool,
    ) -> bool {
        !all_credentials_found && sequence_number <= MAX_WIFI_SCAN_POSTS
    }

    fn can_get_wifi_credentials(
        &self,
        sequence_number: u32,
        all_credentials_returned: bool,
    ) -> bool {
        !all_credentials_returned && sequence_number <= MAX_CREDENTIAL_FETCHES
    }

    /// A host-supplied setup network overriding the derived one.
    fn custom_setup_network(&self) -> Option<WifiConfiguration> {
        None
    }

    fn save_registration_details(&self, _details: &RegistrationDetails) {}
}

/// Callbacks with every default.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCallbacks;

impl ProvisioneeCallbacks for DefaultCallbacks {}

/// What one state action concluded.
enum StepResult {
    Outcome(StateOutcome),
    /// The cloud answered `canProceed = false`: structured termination,
    /// no report, no error.
    Terminate,
}

/// Drives one provisioning session: setup-network association, the six
/// DSS operations with the report transition oracle between them, and
/// the final hop onto the customer network.
pub struct ProvisioneeTask<'a> {
    user: Arc<UserContext>,
    dss: DssClientContext,
    callbacks: &'a dyn ProvisioneeCallbacks,
    state: ProvisioneeState,
    salt: Vec<u8>,
    registration_state: DssRegistrationState,
    setup_network: Option<WifiConfiguration>,
}

impl<'a> ProvisioneeTask<'a> {
    pub fn new(
        user: Arc<UserContext>,
        dss: DssClientContext,
        callbacks: &'a dyn ProvisioneeCallbacks,
    ) -> Self {
        Self {
            user,
            dss,
            callbacks,
            state: ProvisioneeState::NotStarted,
            salt: Vec::new(),
            registration_state: DssRegistrationState::NotRegistered,
            setup_network: None,
        }
    }

    pub async fn run(mut self) -> ProvisioningResult {
        match self.session().await {
            Ok(result) => result,
            Err(e) => {
                error!("provisioning session failed: {e:#}");
                ProvisioningResult::InternalError
            },
        }
    }

    async fn session(&mut self) -> Result<ProvisioningResult> {
        if let Err(e) = self.join_setup_network().await {
            error!("could not join a setup network: {e:#}");
            return Ok(ProvisioningResult::NotProvisioned);
        }

        self.state = ProvisioneeState::StartProvisioning;

        loop {
            match self.state {
                ProvisioneeState::Completed => {
                    info!("provisioning session completed");
                    return Ok(ProvisioningResult::Provisioned);
                },
                ProvisioneeState::Failed => {
                    warn!("provisioning session failed");
                    return Ok(ProvisioningResult::NotProvisioned);
                },
                _ => {},
            }

            if !self.callbacks.can_proceed() {
                info!("host declined to proceed, terminating the session");
                return Ok(ProvisioningResult::NotProvisioned);
            }

            debug!("entering state {:?}", self.state);
            let outcome = match self.run_state_action().await {
                StepResult::Outcome(outcome) => outcome,
                StepResult::Terminate => {
                    info!("cloud declined to proceed, terminating the session");
                    return Ok(ProvisioningResult::NotProvisioned);
                },
            };

            let wire_state = self
                .state
                .to_wire()
                .context("current state has no wire form")?;
            let attempts =
                if self.state == ProvisioneeState::ConnectToUserNetwork {
                    self.user.wifi.drain_connection_attempts()
                } else {
                    Vec::new()
                };

            let advice = match self
                .dss
                .report(
                    wire_state,
                    outcome.into(),
                    self.registration_state,
                    &attempts,
                )
                .await
            {
                Ok(response) => ServerAdvice {
                    can_proceed: response.can_proceed,
                    next_state: response.next_provisioning_state,
                },
                Err(e) => {
                    // A failed report has no oracle to consult.
                    error!("report failed: {e:#}");
                    self.state = ProvisioneeState::Failed;
                    continue;
                },
            };

            self.state = advance(self.state, outcome, &advice);
        }
    }

    /// Associate with the setup network before any DSS traffic: the
    /// host-supplied network if there is one, otherwise the derived
    /// encoded network, with the legacy open network as a last resort.
    async fn join_setup_network(&mut self) -> Result<()> {
        let setup = match self.callbacks.custom_setup_network() {
            Some(custom) => {
                debug!("using client-defined setup network configuration");
                custom
            },
            None => self
                .user
                .with_configuration(|map| {
                    compute_encoded_setup_network(&self.user.keys, map)
                })
                .unwrap_or_else(|e| {
                    warn!("cannot derive the encoded setup network: {e:#}");
                    default_setup_network()
                }),
        };

        self.user
            .wifi
            .add_configuration(setup.clone())
            .context("setup network configuration is invalid")?;
        self.user
            .wifi
            .connect_to(setup.clone())
            .await
            .context("failed to associate with the setup network")?;
        self.setup_network = Some(setup);
        Ok(())
    }

    async fn run_state_action(&mut self) -> StepResult {
        match self.state {
            ProvisioneeState::StartProvisioning => {
                self.start_provisioning().await
            },
            ProvisioneeState::StartPinBasedSetup => {
                self.start_pin_based_setup().await
            },
            ProvisioneeState::ComputeConfigurationData => {
                self.compute_configuration_data().await
            },
            ProvisioneeState::PostWifiScanData => {
                self.post_wifi_scan_data().await
            },
            ProvisioneeState::GetWifiCredentials => {
                self.get_wifi_credentials().await
            },
            ProvisioneeState::ConnectToUserNetwork => {
                self.connect_to_user_network().await
            },
            ProvisioneeState::NotStarted
            | ProvisioneeState::Completed
            | ProvisioneeState::Failed => StepResult::Outcome(StateOutcome::Success),
        }
    }

    async fn start_provisioning(&mut self) -> StepResult {
        let response = match self.dss.start_provisioning_session().await {
            Ok(response) => response,
            Err(e) => {
                warn!("startProvisioningSession failed: {e:#}");
                return StepResult::Outcome(StateOutcome::Failure);
            },
        };

        if !response.can_proceed {
            return StepResult::Terminate;
        }

        if let Some(salt) = &response.salt {
            match base64::decode_to_vec(salt.as_bytes()) {
                Ok(bytes) => self.salt = bytes,
                Err(_) => {
                    warn!("session salt is not valid base64");
                    return StepResult::Outcome(StateOutcome::Failure);
                },
            }
        }

        StepResult::Outcome(StateOutcome::Success)
    }

    async fn start_pin_based_setup(&mut self) -> StepResult {
        match self.dss.start_pin_based_setup(&self.salt).await {
            Ok(response) if !response.can_proceed => StepResult::Terminate,
            Ok(_) => StepResult::Outcome(StateOutcome::Success),
            Err(e) => {
                warn!("startPinBasedSetup failed: {e:#}");
                StepResult::Outcome(StateOutcome::Failure)
            },
        }
    }

    async fn compute_configuration_data(&mut self) -> StepResult {
        let response = match self.dss.compute_configuration_data().await {
            Ok(response) => response,
            Err(e) => {
                warn!("computeConfigurationData failed: {e:#}");
                return StepResult::Outcome(StateOutcome::Failure);
            },
        };

        if let Some(details) = &response.registration_details
            && details.registration_token.is_some()
        {
            self.callbacks.save_registration_details(details);
            self.registration_state = DssRegistrationState::InProgress;
        }

        StepResult::Outcome(StateOutcome::Success)
    }

    /// Scan, then POST snapshots until the cloud has found every
    /// credential, the host says stop, or the cloud stops the session.
    async fn post_wifi_scan_data(&mut self) -> StepResult {
        if let Err(e) = self.user.wifi.start_scan().await {
            warn!("background Wi-Fi scan failed: {e:#}");
            return StepResult::Outcome(StateOutcome::Failure);
        }

        let mut sequence_number = 1u32;
        let mut total_found = 0u32;
        let mut all_found = false;

        loop {
            if !self.callbacks.can_post_wifi_scan_data(
                sequence_number,
                total_found,
                all_found,
            ) {
                break;
            }

            let snapshot = self.user.wifi.scan_results();
            let response = match self
                .dss
                .post_wifi_scan_data(sequence_number, &snapshot)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!("postWifiScanData failed: {e:#}");
                    return StepResult::Outcome(StateOutcome::Failure);
                },
            };

            if !response.can_proceed {
                return StepResult::Terminate;
            }

            total_found = response.total_credentials_found;
            all_found = response.all_credentials_found;
            sequence_number += 1;

            if all_found {
                debug!("all credentials found after {total_found} matches");
                break;
            }
        }

        StepResult::Outcome(StateOutcome::Success)
    }

    /// Fetch credentials until the cloud has returned them all or the
    /// host says stop; each valid entry joins the configuration list.
    async fn get_wifi_credentials(&mut self) -> StepResult {
        let mut sequence_number = 1u32;
        let mut all_returned = false;

        loop {
            if !self
                .callbacks
                .can_get_wifi_credentials(sequence_number, all_returned)
            {
                break;
            }

            let (response, credentials) =
                match self.dss.get_wifi_credentials(sequence_number).await {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("getWifiCredentials failed: {e:#}");
                        return StepResult::Outcome(StateOutcome::Failure);
                    },
                };

            for credential in credentials {
                debug!("storing credentials for {credential}");
                if let Err(e) = self.user.wifi.add_configuration(credential) {
                    warn!("dropping one returned network: {e}");
                }
            }

            if !response.can_proceed {
                return StepResult::Terminate;
            }

            all_returned = response.all_credentials_returned;
            sequence_number += 1;

            if all_returned {
                break;
            }
        }

        StepResult::Outcome(StateOutcome::Success)
    }

    /// Leave the setup network, then walk the stored configurations in
    /// order until one associates and resolves the probe host.
    async fn connect_to_user_network(&mut self) -> StepResult {
        if let Some(setup) = self.setup_network.take() {
            if let Err(e) =
                self.user.wifi.remove_configuration(&setup.ssid).await
            {
                warn!("failed to drop the setup network: {e:#}");
            }
        }

        match self.user.wifi.connect().await {
            Ok(()) => StepResult::Outcome(StateOutcome::Success),
            Err(e) => {
                warn!("no user network came up: {e:#}");
                StepResult::Outcome(StateOutcome::Failure)
            },
        }
    }
}
