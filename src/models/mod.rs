pub mod donation;
pub mod request;
