//! Connection options.

use std::time::Duration;

/// Parameters accepted by `connect()`.
///
/// Fields are public and meant to be set with struct-update syntax:
///
/// ```no_run
/// use pg_wire_engine::ConnectOpts;
///
/// let opts = ConnectOpts {
///     host: Some("localhost".into()),
///     user: "postgres".into(),
///     database: Some("mydb".into()),
///     password: Some("secret".into()),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ConnectOpts {
    /// Hostname, IP address, or Unix socket directory (starts with `/`).
    ///
    /// `None` triggers discovery: search `/var/run/postgresql` then `/tmp`
    /// for a matching socket file, falling back to TCP `localhost`.
    pub host: Option<String>,

    /// TCP port, also used to build the Unix socket file name.
    ///
    /// Default: `5432`
    pub port: u16,

    /// Explicit Unix socket directory, bypassing discovery.
    ///
    /// Default: `None`
    pub socket_dir: Option<String>,

    /// Username for authentication.
    ///
    /// Default: current OS user.
    pub user: String,

    /// Database name. Defaults to the server's per-role default if `None`.
    pub database: Option<String>,

    /// Password for authentication, used only if the server requests MD5.
    pub password: Option<String>,

    /// `application_name` startup parameter, sent only if non-empty.
    pub application_name: Option<String>,

    /// Used when `application_name` is `None`.
    ///
    /// Default: `"pg-wire-engine"`
    pub fallback_application_name: String,

    /// Timeout applied to the TCP/Unix connect step.
    ///
    /// Default: `None` (no timeout)
    pub connect_timeout: Option<Duration>,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            host: None,
            port: 5432,
            socket_dir: None,
            user: current_os_user(),
            database: None,
            password: None,
            application_name: None,
            fallback_application_name: "pg-wire-engine".to_string(),
            connect_timeout: None,
        }
    }
}

/// Resolve the default username the way libpq does: `$PGUSER`, else the OS login name.
fn current_os_user() -> String {
    std::env::var("PGUSER")
        .or_else(|_| std::env::var("USER"))
        .unwrap_or_default()
}
