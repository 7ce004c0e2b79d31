//! Shared fixtures for dispatch integration tests

pub mod mock_server;
