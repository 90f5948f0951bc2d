// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pure, I/O-free logic core of the LSH fleet orchestrator: Device
//! Registry, Click Transaction Manager, Watchdog, and the Topic Router that
//! composes them. No async runtime, no network, no file I/O — every `now`
//! and every external-actor lookup comes in through an injected
//! collaborator.

pub mod click;
pub mod clock;
pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod orchestrator;
pub mod payload;
pub mod result;
pub mod validate;
pub mod watchdog;

pub use clock::{Clock, FakeClock, SystemClock};
pub use context::{ContextReader, InMemoryContext};
pub use error::{ClickFailureScope, ServiceError};
pub use orchestrator::{Orchestrator, OrchestratorTimings, TopicLayout};
pub use result::{OutboundMessage, OutputPort, Payload, ServiceResult, ServiceResultBuilder};
pub use validate::Validators;
