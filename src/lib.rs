// src/lib.rs

//! Full-duplex software UART on one 16-bit timer and a GPIO port, plus the
//! single-byte command dispatcher that runs on top of it.
//!
//! Hardware reaches the crate through `embedded-hal` pins and delays and the
//! small traits in [`common::hal_traits`]. Interrupt vectors forward to the
//! `on_*` methods of [`Transceiver`]; the foreground runs [`Dispatcher`].

#![cfg_attr(not(test), no_std)] // no_std everywhere except host unit tests

pub mod bootstrap;
pub mod common;
pub mod dispatcher;
pub mod engine;

// Re-export key types for convenience
pub use common::{Command, Mailbox, UartError};
pub use dispatcher::Dispatcher;
pub use engine::Transceiver;
