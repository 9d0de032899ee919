//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from the
//! file-serving and middleware logic.

pub mod body;
pub mod cache;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use body::ResponseBody;
pub use range::{parse_range_header, ByteRange, RangeOutcome};
pub use response::{
    build_304_response, build_404_response, build_405_response, build_416_response,
    build_500_response, build_html_response, build_redirect_response,
};
