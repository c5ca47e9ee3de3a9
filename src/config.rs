//! Configuration for the admin CLI and the HTTP server.
//!
//! Every option can come from a command-line flag or an environment variable.

use clap::{Args, Parser};
use std::path::PathBuf;

/// Where the student database lives
#[derive(Debug, Clone, Args)]
pub struct StoreConfig {
    /// Path to the SQLite database file (created if missing)
    #[arg(long, env = "STUDENT_RECORDS_DB", default_value = "students.db")]
    pub database: PathBuf,
}

/// Logging options
#[derive(Debug, Clone, Args)]
pub struct LogConfig {
    /// Log level or flexi_logger spec (e.g. "info", "student_records=debug")
    #[arg(long, env = "STUDENT_RECORDS_LOG", default_value = "info")]
    pub log_level: String,

    /// Write rotating log files to this directory instead of stderr only
    #[arg(long, env = "STUDENT_RECORDS_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "student-server", version, about = "Student records HTTP API")]
pub struct ServerConfig {
    #[command(flatten)]
    pub store: StoreConfig,

    #[command(flatten)]
    pub log: LogConfig,

    /// Host to bind to
    #[arg(long, env = "STUDENT_RECORDS_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind to
    #[arg(long, env = "STUDENT_RECORDS_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Directory with the static web page
    #[arg(long, env = "STUDENT_RECORDS_WEB_DIR", default_value = "web")]
    pub web_dir: PathBuf,
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
