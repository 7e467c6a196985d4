#![forbid(unsafe_code)]

pub mod connect;
