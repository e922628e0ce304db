// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod context;
pub mod dss_client;
pub mod http;
pub mod transport;
