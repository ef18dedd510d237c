//! pkgdelta - package delta analysis for OpenWrt upgrades
//!
//! This library provides the core functionality for comparing an installed
//! system with a target release:
//! - Installed-package databases (apk and opkg) and the world file
//! - Dependency graph and top-level package resolution
//! - Target release documents from the upstream download server and JSON API
//! - Default-set, availability, rename and build-failure checks
//! - The package ledger and the text and JSON reports

pub mod analysis;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod graph;
pub mod local;
pub mod orchestrator;
pub mod output;
pub mod parser;
pub mod progress;
pub mod registry;
