// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result};
use clap::Parser;
use ffs_client_rs::{
    cfg::{cli::Cli, config::DeviceConfig, logger::init_logger},
    error::ProvisioningResult,
    provisionee::provision_device,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _logger_guard = init_logger(&cli.logger_config_path()?)?;

    let config = cli
        .device_config_path()
        .and_then(DeviceConfig::load_from_file)
        .context("failed to resolve or load the device config")?;

    let arguments = config.provisioning_arguments()?;
    let configuration = config.to_configuration_map();

    let result = provision_device(&arguments, configuration).await;
    info!("provisioning finished: {result:?}");

    std::process::exit(match result {
        ProvisioningResult::Provisioned => 0,
        ProvisioningResult::NotProvisioned => 1,
        ProvisioningResult::InvalidArgument => 2,
        ProvisioningResult::InitError => 3,
        ProvisioningResult::InternalError => 4,
    });
}
