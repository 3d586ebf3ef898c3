//! Static information that is determined at build time.

/// Default client ID handed to sessions when the user does not specify one.
///
/// Brokers log it alongside admin requests, which makes it the easiest way to tell admin traffic apart.
pub const DEFAULT_CLIENT_ID: &str = env!("CARGO_PKG_NAME");
