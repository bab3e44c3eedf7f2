//! Core constants for the car park controller.
//!
//! Values here are shared by several crates: plate validation limits, the
//! gate link wire defaults, and the controller's timing defaults. Timing
//! constants are in milliseconds so they can be used directly as
//! configuration defaults.
//!
//! # Usage
//!
//! ```
//! use autopark_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(DEFAULT_BAUD_RATE, 115_200);
//! let settle = Duration::from_millis(DEFAULT_SETTLE_DELAY_MS);
//! assert_eq!(settle.as_secs(), 5);
//! ```

// ============================================================================
// Plate Validation
// ============================================================================

/// Minimum plate length after normalization.
///
/// Shorter reads are treated as OCR noise.
pub const MIN_PLATE_LENGTH: usize = 3;

/// Maximum plate length after normalization.
pub const MAX_PLATE_LENGTH: usize = 10;

// ============================================================================
// Gate Link Wire Defaults
// ============================================================================

/// Default UART baud rate shared with the microcontroller firmware.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Line terminator for every token in both directions.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Maximum accepted inbound line length in bytes.
///
/// Longer lines cannot be a valid token and are discarded.
pub const MAX_LINE_LENGTH: usize = 256;

/// Default timeout for a single command write, in milliseconds.
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 1_000;

/// Time to wait after opening the serial port, in milliseconds.
///
/// Opening the port resets most development boards; the firmware needs
/// this long to boot before it reads commands.
pub const DEFAULT_OPEN_SETTLE_MS: u64 = 2_000;

// ============================================================================
// Controller Timing Defaults
// ============================================================================

/// Delay between an open command and the matching close command.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 5_000;

/// How long the buzzer sounds when the lot is full.
pub const DEFAULT_BUZZER_DURATION_MS: u64 = 3_000;

/// Interval between notification polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Total attempts for one gate command, including the first.
pub const DEFAULT_COMMAND_ATTEMPTS: u32 = 3;

/// Initial backoff between command attempts; doubles per retry.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 200;

/// Total recognition attempts per plate event, including the first.
pub const DEFAULT_RECOGNITION_ATTEMPTS: u32 = 2;

/// Delay before retrying a failed recognition.
pub const DEFAULT_RECOGNITION_RETRY_DELAY_MS: u64 = 500;

/// Pending plate events accepted per gate while a workflow is running.
pub const DEFAULT_EVENT_QUEUE_DEPTH: usize = 1;

// ============================================================================
// Tariff Defaults
// ============================================================================

/// Default billing unit: one hour.
pub const DEFAULT_BILLING_UNIT_SECS: u64 = 3_600;

/// Default rate per billing unit, in minor currency units.
pub const DEFAULT_RATE_MINOR: i64 = 1_000;

/// Default number of parking slots.
pub const DEFAULT_CAPACITY: u32 = 1;
