// Copyright 2026 Pagepress Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pagepress library — page stabilization and PDF export pipeline.
//!
//! Drives a Chromium browser through a target page, forces lazily-rendered
//! and collapsed content to materialize, suppresses intrusive overlays, and
//! renders the stabilized page to a paginated document.

pub mod batch;
pub mod cli;
pub mod export;
pub mod renderer;
pub mod session;
pub mod stabilize;
