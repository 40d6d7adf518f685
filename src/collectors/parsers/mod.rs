//! Pure parsers for the text formats collectors read.
//!
//! Nothing here touches the filesystem or runs commands; collectors hand in
//! the raw content together with the collection instant.

pub mod accounts;
pub mod auth_log;
pub mod cron;
pub mod network;
pub mod patch;
pub mod shell_history;
pub mod sockets;
pub mod startup;
pub mod unified_log;
pub mod wmi_rows;
