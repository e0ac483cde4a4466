//! Request simulation engine of the request examiner.
//!
//! Everything needed to turn the parameters of a single request
//! into simulated work (a [`behavior::Behavior`]) and a status code,
//! independent of the http server that drives it.

#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

pub mod behavior;
pub mod config;
pub mod delay;
pub mod shutdown;
pub mod simulation;
pub mod status;
pub mod utils;
