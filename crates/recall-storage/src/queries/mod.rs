// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the interaction and entity tables.

pub mod entities;
pub mod interactions;
