// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Utility modules
//!
//! Terminal presentation helpers for the siteflow CLI.

pub mod progress;

pub use progress::*;
