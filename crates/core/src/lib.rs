//! Core domain types and shared logic for shrink.
//!
//! This crate defines what every other crate agrees on:
//! - Random token generation for filenames and short URLs
//! - Content sniffing and the extension allow-list
//! - Uploaded file and short URL resources
//! - Shared configuration types

pub mod config;
pub mod error;
pub mod resource;
pub mod sniff;
pub mod token;

pub use error::{Error, Result};
pub use resource::{ResourceKind, ShortUrl, UploadedFile};
pub use sniff::{ContentSniffer, Detected, ExtensionPolicy, SniffRejection};
pub use token::generate_token;

/// Header clients send (with value `1`) to keep part of their original filename.
pub const ORIGINAL_FILENAME_HEADER: &str = "x-use-original-filename";
