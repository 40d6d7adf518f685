//! WMI session for the Windows strategy.
//!
//! A session owns one COM initialization and one connection to
//! `ROOT\CIMV2`; both are released when it drops. Off Windows, opening a
//! session reports `PlatformUnsupported`.

use log::debug;
use serde::de::DeserializeOwned;

use crate::error::{Result, TriageError};

#[cfg(windows)]
pub struct WmiSession {
    conn: wmi::WMIConnection,
}

#[cfg(windows)]
impl WmiSession {
    pub fn open() -> Result<Self> {
        let com = wmi::COMLibrary::new()
            .map_err(|e| TriageError::Query(format!("COM initialization failed: {}", e)))?;
        let conn = wmi::WMIConnection::new(com)
            .map_err(|e| TriageError::Query(format!("WMI connection failed: {}", e)))?;
        Ok(Self { conn })
    }

    pub fn query<T: DeserializeOwned>(&self, wql: &str) -> Result<Vec<T>> {
        debug!("WMI query: {}", wql);
        self.conn
            .raw_query(wql)
            .map_err(|e| TriageError::Query(format!("{}: {}", wql, e)))
    }
}

#[cfg(not(windows))]
pub struct WmiSession;

#[cfg(not(windows))]
impl WmiSession {
    pub fn open() -> Result<Self> {
        Err(TriageError::PlatformUnsupported("WMI requires Windows".to_string()))
    }

    pub fn query<T: DeserializeOwned>(&self, wql: &str) -> Result<Vec<T>> {
        debug!("WMI query skipped: {}", wql);
        Err(TriageError::PlatformUnsupported("WMI requires Windows".to_string()))
    }
}

/// Rows of one WQL query in a fresh session
pub fn query<T: DeserializeOwned>(wql: &str) -> Result<Vec<T>> {
    WmiSession::open()?.query(wql)
}
