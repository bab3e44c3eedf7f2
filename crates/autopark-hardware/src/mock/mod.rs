//! Mock gate link for tests and bench runs without a board attached.

pub mod gate_link;

pub use gate_link::{MockGateLink, MockGateLinkHandle};
