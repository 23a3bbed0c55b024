// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The HTTP trigger layer: scheduled ticks, the inventory webhook receiver,
//! and the operator-facing REST surface, all converging on
//! [`crate::reconciler::sync`].

pub mod operator_api;
pub mod scheduler;
pub mod server;
pub mod state;
pub mod webhook_receiver;

pub use server::build_router;
pub use state::AppState;
