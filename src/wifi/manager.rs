// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{Result, anyhow, bail};
use tokio::{
    sync::{mpsc, oneshot},
    time::{sleep, timeout},
};
use tracing::{debug, info, warn};

use crate::{
    error::FfsError,
    models::wifi::{
        ErrorDetails, WifiConfiguration, WifiConnectionAttempt,
        WifiConnectionDetails, WifiConnectionState, WifiScanResult,
    },
    wifi::platform::{AssociationError, WifiPlatform},
};

const EVENT_QUEUE_DEPTH: usize = 8;
const SCAN_TRIES: usize = 5;
const ASSOCIATE_TIMEOUT: Duration = Duration::from_secs(10);
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(20);
const RESOLVE_TRIES: usize = 5;
const RETRY_PAUSE: Duration = Duration::from_millis(250);

type Done = oneshot::Sender<Result<()>>;

enum WifiEvent {
    StartScan { done: Done },
    /// Associate with one specific network, no reachability probe and no
    /// attempt record (used for the setup network).
    ConnectTo { config: Box<WifiConfiguration>, done: Done },
    /// Walk the stored configuration list in priority order, probing
    /// reachability and recording every attempt.
    Connect { done: Done },
    RemoveConfiguration { ssid: String, done: Done },
    Disconnect { done: Done },
    Deinit { done: Done },
}

/// Shared state between the manager task (writer) and the provisionee
/// task (reader). The event completions are the happens-before edges;
/// the scan list additionally takes a mutex because it is read while a
/// scan may still be appending.
#[derive(Default)]
struct WifiShared {
    scan_results: Mutex<Vec<WifiScanResult>>,
    configurations: Mutex<Vec<WifiConfiguration>>,
    connection_attempts: Mutex<Vec<WifiConnectionAttempt>>,
    connection: Mutex<WifiConnectionDetails>,
}

/// Handle to the Wi-Fi manager task.
///
/// One manager exists per user context; it owns the platform radio and
/// serializes all Wi-Fi operations through a bounded event queue.
#[derive(Clone)]
pub struct WifiManager {
    tx: mpsc::Sender<WifiEvent>,
    shared: Arc<WifiShared>,
}

impl WifiManager {
    /// Spawn the manager task. `probe_host` is resolved after every
    /// user-network association to verify the network is usable.
    pub fn spawn(platform: Arc<dyn WifiPlatform>, probe_host: String) -> Self {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let shared = Arc::new(WifiShared::default());
        let task = ManagerTask {
            platform,
            probe_host,
            shared: Arc::clone(&shared),
        };
        tokio::spawn(task.run(rx));
        Self { tx, shared }
    }

    async fn dispatch(
        &self,
        make: impl FnOnce(Done) -> WifiEvent,
    ) -> Result<()> {
        let (done, wait) = oneshot::channel();
        self.tx
            .send(make(done))
            .await
            .map_err(|_| anyhow!("Wi-Fi manager task is gone"))?;
        wait.await
            .map_err(|_| anyhow!("Wi-Fi manager dropped the completion"))?
    }

    /// Run a background scan and publish the snapshot.
    pub async fn start_scan(&self) -> Result<()> {
        self.dispatch(|done| WifiEvent::StartScan { done }).await
    }

    /// Snapshot of the latest scan results.
    pub fn scan_results(&self) -> Vec<WifiScanResult> {
        self.shared.scan_results.lock().expect("scan list lock").clone()
    }

    /// Append a network to the configuration list. Duplicate SSIDs are
    /// allowed; ordering is preserved.
    pub fn add_configuration(
        &self,
        config: WifiConfiguration,
    ) -> Result<(), FfsError> {
        if !config.validate() {
            return Err(FfsError::InvalidArgument);
        }
        self.shared
            .configurations
            .lock()
            .expect("configuration list lock")
            .push(config);
        Ok(())
    }

    pub fn configurations(&self) -> Vec<WifiConfiguration> {
        self.shared
            .configurations
            .lock()
            .expect("configuration list lock")
            .clone()
    }

    /// Remove every entry with the given SSID, disconnecting first if it
    /// is the current network.
    pub async fn remove_configuration(&self, ssid: &str) -> Result<()> {
        let ssid = ssid.to_string();
        self.dispatch(|done| WifiEvent::RemoveConfiguration { ssid, done })
            .await
    }

    pub async fn connect_to(&self, config: WifiConfiguration) -> Result<()> {
        self.dispatch(|done| WifiEvent::ConnectTo {
            config: Box::new(config),
            done,
        })
        .await
    }

    pub async fn connect(&self) -> Result<()> {
        self.dispatch(|done| WifiEvent::Connect { done }).await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.dispatch(|done| WifiEvent::Disconnect { done }).await
    }

    pub fn connection_details(&self) -> WifiConnectionDetails {
        self.shared.connection.lock().expect("connection lock").clone()
    }

    /// Take the accumulated connection attempts; the report body for
    /// the connect-to-user-network state includes them.
    pub fn drain_connection_attempts(&self) -> Vec<WifiConnectionAttempt> {
        std::mem::take(
            &mut *self
                .shared
                .connection_attempts
                .lock()
                .expect("attempt list lock"),
        )
    }

    /// Stop the manager task.
    pub async fn deinit(&self) -> Result<()> {
        self.dispatch(|done| WifiEvent::Deinit { done }).await
    }
}

struct ManagerTask {
    platform: Arc<dyn WifiPlatform>,
    probe_host: String,
    shared: Arc<WifiShared>,
}

impl ManagerTask {
    async fn run(self, mut rx: mpsc::Receiver<WifiEvent>) {
        while let Some(event) = rx.recv().await {
            match event {
                WifiEvent::StartScan { done } => {
                    let _ = done.send(self.scan().await);
                },
                WifiEvent::ConnectTo { config, done } => {
                    let _ = done.send(self.connect_single(&config).await);
                },
                WifiEvent::Connect { done } => {
                    let _ = done.send(self.connect_list().await);
                },
                WifiEvent::RemoveConfiguration { ssid, done } => {
                    let _ = done.send(self.remove_configuration(&ssid).await);
                },
                WifiEvent::Disconnect { done } => {
                    let _ = done.send(self.disconnect_current().await);
                },
                WifiEvent::Deinit { done } => {
                    let _ = done.send(Ok(()));
                    break;
                },
            }
        }
        debug!("Wi-Fi manager task exited");
    }

    async fn scan(&self) -> Result<()> {
        for attempt in 1..=SCAN_TRIES {
            match self.platform.scan().await {
                Ok(results) if !results.is_empty() => {
                    debug!("scan found {} networks", results.len());
                    *self.shared.scan_results.lock().expect("scan list lock") =
                        results;
                    return Ok(());
                },
                Ok(_) => debug!("scan {attempt}/{SCAN_TRIES} found nothing"),
                Err(e) => warn!("scan {attempt}/{SCAN_TRIES} failed: {e}"),
            }
            sleep(RETRY_PAUSE).await;
        }
        bail!("no networks found after {SCAN_TRIES} scans")
    }

    fn set_connection(&self, ssid: Option<String>, state: WifiConnectionState) {
        *self.shared.connection.lock().expect("connection lock") =
            WifiConnectionDetails {
                ssid,
                state: Some(state),
            };
    }

    /// One association attempt, classified for the report body.
    async fn try_associate(
        &self,
        config: &WifiConfiguration,
        probe: bool,
    ) -> Result<(), WifiConnectionAttempt> {
        let outcome =
            timeout(ASSOCIATE_TIMEOUT, self.platform.associate(config)).await;

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(AssociationError::AuthenticationFailed)) => Some((
                WifiConnectionState::AuthenticationFailed,
                ErrorDetails::authentication_failed(),
            )),
            Ok(Err(AssociationError::ApNotFound)) => Some((
                WifiConnectionState::ApNotFound,
                ErrorDetails::ap_not_found(),
            )),
            Ok(Err(AssociationError::LimitedConnectivity)) => Some((
                WifiConnectionState::LimitedConnectivity,
                ErrorDetails::limited_connectivity(),
            )),
            Ok(Err(AssociationError::Internal)) => Some((
                WifiConnectionState::InternalError,
                ErrorDetails::internal_failure(),
            )),
            Err(_elapsed) => Some((
                WifiConnectionState::LimitedConnectivity,
                ErrorDetails::limited_connectivity(),
            )),
        };

        if let Some((state, details)) = failure {
            return Err(WifiConnectionAttempt::failed(config, state, details));
        }

        if probe && !self.probe_reachability().await {
            return Err(WifiConnectionAttempt::failed(
                config,
                WifiConnectionState::LimitedConnectivity,
                ErrorDetails::limited_connectivity(),
            ));
        }

        Ok(())
    }

    /// Associated is not enough for a user network: the probe host must
    /// resolve before we call it usable.
    async fn probe_reachability(&self) -> bool {
        let probe = async {
            for attempt in 1..=RESOLVE_TRIES {
                match self.platform.resolve(&self.probe_host).await {
                    Ok(()) => return true,
                    Err(e) => {
                        debug!(
                            "probe {attempt}/{RESOLVE_TRIES} for {} failed: {e}",
                            self.probe_host
                        );
                    },
                }
                sleep(Duration::from_secs(1)).await;
            }
            false
        };
        timeout(RESOLVE_TIMEOUT, probe).await.unwrap_or(false)
    }

    async fn connect_single(&self, config: &WifiConfiguration) -> Result<()> {
        match self.try_associate(config, false).await {
            Ok(()) => {
                info!("associated with {config}");
                self.set_connection(
                    Some(config.ssid.clone()),
                    WifiConnectionState::Associated,
                );
                Ok(())
            },
            Err(attempt) => {
                self.set_connection(None, attempt.connection_state);
                bail!("failed to associate with {config}")
            },
        }
    }

    async fn connect_list(&self) -> Result<()> {
        let configurations = self
            .shared
            .configurations
            .lock()
            .expect("configuration list lock")
            .clone();
        if configurations.is_empty() {
            bail!("no stored Wi-Fi configurations to try");
        }

        for config in &configurations {
            match self.try_associate(config, true).await {
                Ok(()) => {
                    info!("connected to user network {config}");
                    self.shared
                        .connection_attempts
                        .lock()
                        .expect("attempt list lock")
                        .push(WifiConnectionAttempt::associated(config));
                    self.set_connection(
                        Some(config.ssid.clone()),
                        WifiConnectionState::Associated,
                    );
                    return Ok(());
                },
                Err(attempt) => {
                    warn!(
                        "attempt on {} ended as {:?}",
                        config.ssid, attempt.connection_state
                    );
                    self.shared
                        .connection_attempts
                        .lock()
                        .expect("attempt list lock")
                        .push(attempt);
                },
            }
        }

        self.set_connection(None, WifiConnectionState::Disconnected);
        bail!("all {} configured networks failed", configurations.len())
    }

    async fn remove_configuration(&self, ssid: &str) -> Result<()> {
        let connected_to_it = self
            .shared
            .connection
            .lock()
            .expect("connection lock")
            .ssid
            .as_deref()
            == Some(ssid);
        if connected_to_it {
            self.disconnect_current().await?;
        }
        self.shared
            .configurations
            .lock()
            .expect("configuration list lock")
            .retain(|c| c.ssid != ssid);
        Ok(())
    }

    async fn disconnect_current(&self) -> Result<()> {
        let current = self
            .shared
            .connection
            .lock()
            .expect("connection lock")
            .ssid
            .clone();
        if let Some(ssid) = current {
            match timeout(DISCONNECT_TIMEOUT, self.platform.disconnect(&ssid))
                .await
            {
                Ok(Ok(())) => {},
                Ok(Err(e)) => warn!("disconnect from {ssid} failed: {e}"),
                Err(_elapsed) => warn!("disconnect from {ssid} timed out"),
            }
        }
        self.set_connection(None, WifiConnectionState::Disconnected);
        Ok(())
    }
}
