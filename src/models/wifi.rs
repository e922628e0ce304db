// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use serde::{Deserialize, Serialize};

/// Maximum SSID length in octets.
pub const MAX_SSID_LEN: usize = 32;
/// Maximum WPA passphrase / PSK length in octets.
pub const MAX_KEY_LEN: usize = 64;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiSecurityProtocol {
    #[serde(rename = "OPEN")]
    None,
    #[serde(rename = "WPA_PSK")]
    WpaPsk,
    #[serde(rename = "WEP")]
    Wep,
    #[serde(rename = "OTHER_PROTOCOL")]
    Other,
    #[serde(rename = "UNKNOWN_PROTOCOL")]
    Unknown,
}

impl WifiSecurityProtocol {
    /// DSS only accepts scan data for open, WPA/PSK and WEP networks.
    pub fn is_postable(self) -> bool {
        matches!(
            self,
            WifiSecurityProtocol::None
                | WifiSecurityProtocol::WpaPsk
                | WifiSecurityProtocol::Wep
        )
    }
}

impl fmt::Display for WifiSecurityProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WifiSecurityProtocol::None => "OPEN",
            WifiSecurityProtocol::WpaPsk => "WPA_PSK",
            WifiSecurityProtocol::Wep => "WEP",
            WifiSecurityProtocol::Other => "OTHER_PROTOCOL",
            WifiSecurityProtocol::Unknown => "UNKNOWN_PROTOCOL",
        })
    }
}

/// One Wi-Fi network configuration: supplied by the cloud, cloned into
/// the device-maintained configuration list, removable by SSID.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WifiConfiguration {
    pub ssid: String,
    pub security_protocol: WifiSecurityProtocol,
    /// WPA passphrase or WEP key. Never logged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub is_hidden_network: bool,
    /// Deprecated on the wire but still delivered by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wep_index: Option<i32>,
}

impl WifiConfiguration {
    pub fn open(ssid: &str) -> Self {
        Self {
            ssid: ssid.to_string(),
            security_protocol: WifiSecurityProtocol::None,
            key: None,
            is_hidden_network: false,
            network_priority: None,
            wep_index: None,
        }
    }

    /// 802.11 length limits; entries violating them are treated as
    /// malformed.
    pub fn validate(&self) -> bool {
        self.ssid.len() <= MAX_SSID_LEN
            && !self.ssid.is_empty()
            && self.key.as_ref().is_none_or(|k| k.len() <= MAX_KEY_LEN)
    }
}

impl fmt::Display for WifiConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key material is deliberately not printed.
        write!(
            f,
            "{} ({}{})",
            self.ssid,
            self.security_protocol,
            if self.is_hidden_network { ", hidden" } else { "" }
        )
    }
}

/// One network from a background scan snapshot.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WifiScanResult {
    pub ssid: String,
    /// Colon-separated BSSID, e.g. "74:c2:46:bb:44:41".
    pub bssid: String,
    pub security_protocol: WifiSecurityProtocol,
    /// Center frequency in MHz.
    pub frequency: u32,
    /// RSSI in dBm.
    pub signal_strength: i32,
}

/// Connection states reported back to the service per attempt.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiConnectionState {
    #[serde(rename = "IDLE")]
    Idle,
    #[serde(rename = "DISCONNECTED")]
    Disconnected,
    #[serde(rename = "ASSOCIATED")]
    Associated,
    #[serde(rename = "AUTHENTICATION_FAILED")]
    AuthenticationFailed,
    #[serde(rename = "AP_NOT_FOUND")]
    ApNotFound,
    #[serde(rename = "LIMITED_CONNECTIVITY")]
    LimitedConnectivity,
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

/// Structured error record carried by failed connection attempts and
/// state-transition reports.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorDetails {
    fn connecting(cause: &str, code: &str) -> Self {
        Self {
            operation: Some("CONNECTING_TO_NETWORK".to_string()),
            cause: Some(cause.to_string()),
            details: Some(cause.to_string()),
            code: Some(code.to_string()),
        }
    }

    pub fn authentication_failed() -> Self {
        Self::connecting("Authentication failed", "3:2:0:1")
    }

    pub fn ap_not_found() -> Self {
        Self::connecting("AP not found", "3:16:0:1")
    }

    pub fn limited_connectivity() -> Self {
        Self::connecting("Limited connectivity", "3:5:0:1")
    }

    pub fn internal_failure() -> Self {
        Self {
            operation: Some("UNKNOWN".to_string()),
            cause: Some("Internal failure".to_string()),
            details: Some("Internal failure".to_string()),
            code: None,
        }
    }
}

/// Record of one association attempt, drained into the `report` body
/// after the connect-to-user-network state.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WifiConnectionAttempt {
    pub ssid: String,
    pub security_protocol: WifiSecurityProtocol,
    pub connection_state: WifiConnectionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<ErrorDetails>,
}

impl WifiConnectionAttempt {
    pub fn associated(config: &WifiConfiguration) -> Self {
        Self {
            ssid: config.ssid.clone(),
            security_protocol: config.security_protocol,
            connection_state: WifiConnectionState::Associated,
            error_details: None,
        }
    }

    pub fn failed(
        config: &WifiConfiguration,
        state: WifiConnectionState,
        details: ErrorDetails,
    ) -> Self {
        Self {
            ssid: config.ssid.clone(),
            security_protocol: config.security_protocol,
            connection_state: state,
            error_details: Some(details),
        }
    }
}

/// Current association as seen by the manager task.
#[derive(Debug, Clone, Default)]
pub struct WifiConnectionDetails {
    pub ssid: Option<String>,
    pub state: Option<WifiConnectionState>,
}
