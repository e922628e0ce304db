// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::models::wifi::{
    WifiConfiguration, WifiScanResult, WifiSecurityProtocol,
};

/// Why an association attempt failed, in terms the report body can
/// carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationError {
    AuthenticationFailed,
    ApNotFound,
    LimitedConnectivity,
    Internal,
}

/// The platform radio: scan, associate, disconnect, plus the DNS
/// reachability probe that upgrades "associated" to "usable".
#[async_trait]
pub trait WifiPlatform: Send + Sync {
    async fn scan(&self) -> Result<Vec<WifiScanResult>>;
    async fn associate(
        &self,
        config: &WifiConfiguration,
    ) -> Result<(), AssociationError>;
    async fn disconnect(&self, ssid: &str) -> Result<()>;
    async fn resolve(&self, host: &str) -> Result<()>;
}

/// `nmcli`-backed platform for Linux hosts.
#[derive(Debug, Default)]
pub struct SystemWifi;

impl SystemWifi {
    pub fn new() -> Self {
        Self
    }

    async fn nmcli(args: &[&str]) -> Result<String> {
        debug!("nmcli {}", args.join(" "));
        let output = Command::new("nmcli")
            .args(args)
            .output()
            .await
            .context("failed to spawn nmcli")?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("nmcli {:?} failed: {}", args.first(), stderr.trim());
        }
        Ok(stdout)
    }
}

/// Terse-mode nmcli escapes ':' inside fields as '\:'.
fn split_terse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in line.chars() {
        match (escaped, c) {
            (true, c) => {
                current.push(c);
                escaped = false;
            },
            (false, '\\') => escaped = true,
            (false, ':') => fields.push(std::mem::take(&mut current)),
            (false, c) => current.push(c),
        }
    }
    fields.push(current);
    fields
}

fn security_from_nmcli(text: &str) -> WifiSecurityProtocol {
    if text.is_empty() || text == "--" {
        WifiSecurityProtocol::None
    } else if text.contains("WPA3") || text.contains("802.1X") {
        WifiSecurityProtocol::Other
    } else if text.contains("WPA") {
        WifiSecurityProtocol::WpaPsk
    } else if text.contains("WEP") {
        WifiSecurityProtocol::Wep
    } else {
        WifiSecurityProtocol::Unknown
    }
}

/// NetworkManager reports signal as 0-100; map back to rough dBm.
fn rssi_from_signal(signal: i32) -> i32 {
    signal / 2 - 100
}

#[async_trait]
impl WifiPlatform for SystemWifi {
    async fn scan(&self) -> Result<Vec<WifiScanResult>> {
        let stdout = Self::nmcli(&[
            "-t",
            "-f",
            "SSID,BSSID,SECURITY,FREQ,SIGNAL",
            "dev",
            "wifi",
            "list",
            "--rescan",
            "yes",
        ])
        .await?;

        let mut results = Vec::new();
        for line in stdout.lines() {
            let fields = split_terse_line(line);
            if fields.len() < 5 || fields[0].is_empty() {
                continue;
            }
            let frequency = fields[3]
                .split_whitespace()
                .next()
                .and_then(|f| f.parse().ok())
                .unwrap_or(0);
            let signal = fields[4].parse().unwrap_or(0);
            results.push(WifiScanResult {
                ssid: fields[0].clone(),
                bssid: fields[1].to_lowercase(),
                security_protocol: security_from_nmcli(&fields[2]),
                frequency,
                signal_strength: rssi_from_signal(signal),
            });
        }
        Ok(results)
    }

    async fn associate(
        &self,
        config: &WifiConfiguration,
    ) -> Result<(), AssociationError> {
        let mut args = vec!["dev", "wifi", "connect", config.ssid.as_str()];
        if let Some(key) = config.key.as_deref() {
            args.push("password");
            args.push(key);
        }
        if config.is_hidden_network {
            args.push("hidden");
            args.push("yes");
        }

        match Self::nmcli(&args).await {
            Ok(_) => Ok(()),
            Err(e) => {
                let text = e.to_string();
                warn!("association with {} failed: {text}", config.ssid);
                if text.contains("Secrets were required")
                    || text.contains("802-11-wireless-security")
                {
                    Err(AssociationError::AuthenticationFailed)
                } else if text.contains("No network with SSID") {
                    Err(AssociationError::ApNotFound)
                } else if text.contains("Timeout") {
                    Err(AssociationError::LimitedConnectivity)
                } else {
                    Err(AssociationError::Internal)
                }
            },
        }
    }

    async fn disconnect(&self, ssid: &str) -> Result<()> {
        Self::nmcli(&["connection", "down", "id", ssid]).await?;
        Ok(())
    }

    async fn resolve(&self, host: &str) -> Result<()> {
        let resolver = TokioAsyncResolver::tokio_from_system_conf()
            .context("failed to build the system resolver")?;
        let response = tokio::time::timeout(
            Duration::from_secs(1),
            resolver.lookup_ip(host),
        )
        .await
        .context("resolution attempt timed out")?
        .with_context(|| format!("failed to resolve {host}"))?;
        if response.iter().next().is_none() {
            bail!("{host} resolved to no addresses");
        }
        Ok(())
    }
}
