pub mod api;
pub mod audit;
pub mod cli;
pub mod otp;
pub mod ratelimit;
pub mod store;
pub mod token;
