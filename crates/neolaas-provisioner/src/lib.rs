//! Neolaas Provisioner
//!
//! Runs the lifecycle engine against a MAAS region controller, once or on a
//! fixed period.

pub mod cli;
pub mod config;
pub mod maas;
pub mod observability;
pub mod runner;
pub mod version;
