//! Clients for external services the upload pipeline depends on

pub mod storage;
