// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail, ensure};
use clap::Parser;

/// Frustration-Free Setup Wi-Fi provisionee.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Device configuration file.
    #[arg(long, default_value = "config/device.yaml")]
    pub config: PathBuf,

    /// Logger configuration file.
    #[arg(long, default_value = "config/logger.yaml")]
    pub logger_config: PathBuf,
}

impl Cli {
    /// Resolved device configuration path.
    pub fn device_config_path(&self) -> Result<PathBuf> {
        resolve_config_path(&self.config)
    }

    /// Resolved logger configuration path.
    pub fn logger_config_path(&self) -> Result<PathBuf> {
        resolve_config_path(&self.logger_config)
    }
}

/// Resolve a configuration path against the working directory and
/// require an existing YAML file, so a mistyped `--config` fails here
/// rather than as a parse error deep in a provisioning run.
pub fn resolve_config_path<P: AsRef<Path>>(rel: P) -> Result<PathBuf> {
    let path = rel.as_ref();

    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("cannot get current working dir")?
            .join(path)
    };

    let canon = abs.canonicalize().with_context(|| {
        format!("configuration file {} does not exist", abs.display())
    })?;
    ensure!(canon.is_file(), "{} is not a file", canon.display());

    match canon.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => Ok(canon),
        _ => bail!(
            "{} is not a YAML configuration file (.yaml or .yml expected)",
            canon.display()
        ),
    }
}
