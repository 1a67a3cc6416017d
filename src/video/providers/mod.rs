//! Video generation providers.

mod sora;

pub use sora::{
    SoraProvider, SoraProviderBuilder, API_KEY_ENV, DEFAULT_API_BASE, DEFAULT_ORIGIN,
    DEFAULT_REFERER, DEFAULT_USER_AGENT,
};
