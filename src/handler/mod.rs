//! Request handler module
//!
//! The terminal handler of the chain: static files under the configured
//! root, plus optional directory listings.

mod listing;
mod static_files;

pub use listing::{read_listing, render_listing, ListingItem};
pub use static_files::{strip_base, FileHandler};
