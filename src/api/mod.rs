pub mod client;

pub use client::{fetch_subscription, HttpRouterClient, RouterApi};
