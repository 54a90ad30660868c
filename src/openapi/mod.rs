pub mod link_api;
pub mod router;
pub mod user_api;
