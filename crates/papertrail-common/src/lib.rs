//! papertrail-common — Shared error type and the sandboxed HTTP client used
//! by every crate that talks to the network.

pub mod error;
pub mod sandbox;

pub use error::{PapertrailError, Result};
pub use sandbox::SandboxClient;
