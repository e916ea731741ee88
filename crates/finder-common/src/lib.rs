pub mod cache;
pub mod catalog;
pub mod error;
pub mod highlight;
pub mod mcp_api;
pub mod model;
pub mod paging;
pub mod topics;
