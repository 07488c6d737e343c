mod config;
mod error;
mod extract;
mod fetch;
mod notify;

pub use config::{COMMUNITY_URL, DigestConfig, LoadFromEnv};
pub use error::{DeliveryError, FetchError};
pub use extract::{DigestResult, Post, extract, posted_today};
pub use fetch::{DirectFetcher, Fetcher, RenderedFetcher};
pub use notify::Notifier;
