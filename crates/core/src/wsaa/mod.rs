//! Authentication service (WSAA): login client and ticket renewal.

mod client;
mod renewal;

pub use client::{AuthServiceClient, LOGIN_OPERATION};
pub use renewal::{RenewalOrchestrator, RenewalOutcome, RenewalSettings};
