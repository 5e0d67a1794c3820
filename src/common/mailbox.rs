// src/common/mailbox.rs

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Single-slot command register shared by interrupt handlers and the
/// foreground dispatcher, plus the wake signal that goes with it.
///
/// There is no queue. A post that lands before the previous command was read
/// replaces it, and the earlier command is lost without trace.
///
/// Only whole-width `load`/`store` are used, so the register never tears and
/// works on cores without compare-and-swap.
#[derive(Debug)]
pub struct Mailbox {
    command: AtomicU8,
    wake: AtomicBool,
}

impl Mailbox {
    /// Creates a mailbox holding `idle` with no wake pending. Usable in a `static`.
    pub const fn new(idle: u8) -> Self {
        Mailbox {
            command: AtomicU8::new(idle),
            wake: AtomicBool::new(false),
        }
    }

    /// Interrupt side: overwrite the command and wake the dispatcher.
    pub fn post(&self, command: u8) {
        self.command.store(command, Ordering::Release);
        self.wake.store(true, Ordering::Release);
    }

    /// Current command without consuming it.
    pub fn peek(&self) -> u8 {
        self.command.load(Ordering::Acquire)
    }

    /// Foreground side: put the register back to `idle`. Does not wake anyone.
    pub fn reset(&self, idle: u8) {
        self.command.store(idle, Ordering::Release);
    }

    /// True if a post happened since the last call. Clears the signal.
    pub fn take_wake(&self) -> bool {
        // load + store instead of swap: a post racing in between still left
        // its value in the register, which the caller reads next.
        if self.wake.load(Ordering::Acquire) {
            self.wake.store(false, Ordering::Release);
            true
        } else {
            false
        }
    }

    pub fn wake_pending(&self) -> bool {
        self.wake.load(Ordering::Acquire)
    }
}
