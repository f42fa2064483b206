pub mod config;
pub mod cors;
pub mod email;
pub mod error;
pub mod handler;
pub mod message;
pub mod secrets;
pub mod submission;
pub mod webhook;

pub use config::HandlerConfig;
pub use handler::ContactFormHandler;
