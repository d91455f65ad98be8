//! Repository traits for metadata operations.

pub mod short_urls;

pub use short_urls::ShortUrlRepo;
