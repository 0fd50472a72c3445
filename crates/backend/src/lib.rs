//! Stats backend integration.
//!
//! Everything the bot cannot answer by itself lives behind one HTTP JSON
//! endpoint. This crate holds the two collaborators that talk to the
//! network:
//!
//! - `BackendClient` (`client`) - posts `{command, data}` envelopes and
//!   classifies the response
//! - `MediaFetcher` (`media`) - downloads an attachment and re-encodes it as
//!   base64 for embedding in an envelope
//!
//! Both are traits with no-op defaults so the rest of the bot stays testable
//! without a network.

pub mod client;
pub mod media;

pub use client::{BackendClient, BackendError, HttpBackendClient, NoopBackendClient};
pub use media::{EncodedImage, HttpMediaFetcher, MediaError, MediaFetcher, NoopMediaFetcher};
