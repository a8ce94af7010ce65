//! Captures are stored as plain files:
//!  - There is a single capture directory, created on demand.
//!  - Each capture is a PNG named `screenshot_<unix millis>.png`.
//!  - There is no index. Listing the directory is the only inventory.

pub mod capture_store;
pub mod encoding;
