// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer - bridges the command handlers to the blattwerk backend crates.

pub mod app_services;
pub mod data_dir;
