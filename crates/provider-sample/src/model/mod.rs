//! Plain data shared by the sample providers.

pub mod feed_key;
pub mod quote;

pub use feed_key::FeedKey;
pub use quote::Quote;
