//! Derivation core for solar/battery telemetry.
//!
//! The vendor REST API reports instantaneous MPPT power and periodic battery
//! state-of-charge, but no energy counters and no change notifications.
//! This crate fills both gaps:
//!
//! - [`energy::EnergyLedger`] integrates repeated power samples into running
//!   per-channel energy totals,
//! - [`soc::SocMonitor`] turns noisy SOC samples into a small number of
//!   de-duplicated events.
//!
//! Both are pure in-memory computation driven by the caller's poll cycle:
//! no I/O, no clocks, no background tasks.

pub mod energy;
pub mod prelude;
pub mod quantity;
pub mod soc;
