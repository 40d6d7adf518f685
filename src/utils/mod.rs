//! Utility functions shared by collectors.

/// Cryptographic hash calculation utilities
pub mod hash;
