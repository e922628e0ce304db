// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use tracing::debug;

use crate::models::common::{DssReportResult, DssWifiProvisioneeState};

/// Provisionee session states. The happy path is linear; the scan and
/// credential states may loop. The server is authoritative: every
/// `report` response names the next state, and the machine never moves
/// on its own except into `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioneeState {
    NotStarted,
    StartProvisioning,
    StartPinBasedSetup,
    ComputeConfigurationData,
    PostWifiScanData,
    GetWifiCredentials,
    ConnectToUserNetwork,
    Completed,
    Failed,
}

impl ProvisioneeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProvisioneeState::Completed | ProvisioneeState::Failed)
    }

    /// Wire spelling for the `report` body. `Failed` is client-local and
    /// has no wire form.
    pub fn to_wire(self) -> Option<DssWifiProvisioneeState> {
        match self {
            ProvisioneeState::NotStarted => {
                Some(DssWifiProvisioneeState::NotProvisioned)
            },
            ProvisioneeState::StartProvisioning => {
                Some(DssWifiProvisioneeState::StartProvisioning)
            },
            ProvisioneeState::StartPinBasedSetup => {
                Some(DssWifiProvisioneeState::StartPinBasedSetup)
            },
            ProvisioneeState::ComputeConfigurationData => {
                Some(DssWifiProvisioneeState::ComputeConfiguration)
            },
            ProvisioneeState::PostWifiScanData => {
                Some(DssWifiProvisioneeState::PostWifiScanData)
            },
            ProvisioneeState::GetWifiCredentials => {
                Some(DssWifiProvisioneeState::GetWifiList)
            },
            ProvisioneeState::ConnectToUserNetwork => {
                Some(DssWifiProvisioneeState::ConnectingToUserNetwork)
            },
            ProvisioneeState::Completed => Some(DssWifiProvisioneeState::Done),
            ProvisioneeState::Failed => None,
        }
    }

    pub fn from_wire(state: DssWifiProvisioneeState) -> Self {
        match state {
            DssWifiProvisioneeState::NotProvisioned => {
                ProvisioneeState::NotStarted
            },
            DssWifiProvisioneeState::StartProvisioning => {
                ProvisioneeState::StartProvisioning
            },
            DssWifiProvisioneeState::StartPinBasedSetup => {
                ProvisioneeState::StartPinBasedSetup
            },
            DssWifiProvisioneeState::ComputeConfiguration => {
                ProvisioneeState::ComputeConfigurationData
            },
            DssWifiProvisioneeState::PostWifiScanData => {
                ProvisioneeState::PostWifiScanData
            },
            DssWifiProvisioneeState::GetWifiList => {
                ProvisioneeState::GetWifiCredentials
            },
            DssWifiProvisioneeState::ConnectingToUserNetwork => {
                ProvisioneeState::ConnectToUserNetwork
            },
            DssWifiProvisioneeState::ConnectedToUserNetwork
            | DssWifiProvisioneeState::Done => ProvisioneeState::Completed,
        }
    }
}

/// Result of one state's action, fed into the `report` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOutcome {
    Success,
    Failure,
}

impl From<StateOutcome> for DssReportResult {
    fn from(outcome: StateOutcome) -> Self {
        match outcome {
            StateOutcome::Success => DssReportResult::Success,
            StateOutcome::Failure => DssReportResult::Failure,
        }
    }
}

/// The transition-relevant part of a `report` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerAdvice {
    pub can_proceed: bool,
    pub next_state: DssWifiProvisioneeState,
}

/// Pure transition function. `can_proceed = false` is the one path into
/// `Failed`; otherwise the server's advice is followed unconditionally.
/// Terminal states never move.
pub fn advance(
    current: ProvisioneeState,
    outcome: StateOutcome,
    advice: &ServerAdvice,
) -> ProvisioneeState {
    debug!(
        "state {current:?} finished with {outcome:?}, server advises \
         {:?} (canProceed={})",
        advice.next_state, advice.can_proceed
    );

    if current.is_terminal() {
        return current;
    }
    if !advice.can_proceed {
        return ProvisioneeState::Failed;
    }
    ProvisioneeState::from_wire(advice.next_state)
}
