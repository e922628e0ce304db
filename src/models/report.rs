// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde::{Deserialize, Serialize};

use crate::models::{
    common::{
        DeviceDetails, DssRegistrationState, DssReportResult,
        DssWifiProvisioneeState,
    },
    wifi::WifiConnectionAttempt,
};

/// State-transition report. The response is the transition oracle: the
/// machine goes wherever `next_provisioning_state` says, unless
/// `can_proceed` is false.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest<'a> {
    pub nonce: &'a str,
    pub session_id: &'a str,
    pub sequence_number: u32,
    pub device_details: &'a DeviceDetails,
    pub provisionee_state: DssWifiProvisioneeState,
    pub state_transition_result: DssReportResult,
    pub registration_state: DssRegistrationState,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub connection_attempts: &'a [WifiConnectionAttempt],
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub can_proceed: bool,
    pub next_provisioning_state: DssWifiProvisioneeState,
}
