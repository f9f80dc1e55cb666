//! HTTP plumbing shared by the fetchers

pub mod client;
pub mod user_agent;
pub use client::HttpClient;
pub use user_agent::{random_user_agent, request_headers};
