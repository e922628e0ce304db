// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

/// Error kinds shared by every subsystem boundary.
///
/// `NotImplemented` marks an absent optional capability (a configuration
/// key that is not stored, a custom setup network that was never
/// supplied) and is never a session-killing fault on its own. `Underrun`
/// and `Overrun` are stream-capacity violations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfsError {
    #[error("not implemented")]
    NotImplemented,
    #[error("stream underrun")]
    Underrun,
    #[error("stream overrun")]
    Overrun,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("operation failed")]
    Error,
}

/// Exit values of one provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningResult {
    /// The device is on the customer network.
    Provisioned,
    /// The session terminated without credentials (including a structured
    /// `canProceed = false` answer from the cloud).
    NotProvisioned,
    /// An unexpected local fault.
    InternalError,
    /// The provisioning arguments were rejected up front.
    InvalidArgument,
    /// Key material or context construction failed.
    InitError,
}
