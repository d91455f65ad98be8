//! HTTP request handlers.

pub mod common;
pub mod files;
pub mod sharex;
pub mod urls;

pub use common::*;
pub use files::*;
pub use sharex::*;
pub use urls::*;
