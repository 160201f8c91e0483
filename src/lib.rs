//! POS Dashboard
//!
//! Client side of a restaurant point-of-sale system: admin, chef and staff
//! dashboards driven by a REST backend and a live event socket.
//!
//! This library provides:
//! - Hash-fragment router with retry for late-registered pages
//! - Reconnecting WebSocket client with typed event listeners
//! - REST client and session storage for the POS backend
//! - Table, kitchen and overview pages rendered with Dioxus SSR

// =============================================================================
// Lints - Enforce code quality and consistency
// =============================================================================

#![deny(unsafe_code)]
#![deny(unused_must_use)]

pub mod api;
pub mod auth;
pub mod bus;
pub mod config;
pub mod dashboard;
pub mod live;
pub mod pages;
pub mod router;
pub mod session;
pub mod shell;
pub mod ui;

pub use pos_events as events;
