//! An async PostgreSQL wire protocol engine.
//!
//! # Example
//!
//! ```no_run
//! use pg_wire_engine::{Connection, ConnectOpts};
//!
//! #[tokio::main]
//! async fn main() -> pg_wire_engine::Result<()> {
//!     let opts = ConnectOpts {
//!         host: Some("localhost".into()),
//!         user: "postgres".into(),
//!         database: Some("mydb".into()),
//!         password: Some("secret".into()),
//!         ..Default::default()
//!     };
//!
//!     let conn = Connection::connect(opts).await?;
//!     let response = conn.execute("SELECT 1 AS num", None).await?;
//!     println!("{response:?}");
//!
//!     conn.close().await;
//!     Ok(())
//! }
//! ```

mod buffer;
mod connection;
mod engine;
mod opts;

pub mod error;
pub mod protocol;
pub mod row;
pub mod value;

pub use connection::Connection;
pub use error::{Error, Result, ServerError};
pub use opts::ConnectOpts;
pub use protocol::types::TransactionStatus;
pub use row::{FieldDescriptor, ResultSet, Response, Row};
pub use value::{Param, Value};
