//! Resilient gNMI client core.
//!
//! This crate implements the client-side discipline for talking gNMI to
//! network devices over an abstract [`Transport`]: lazy connection
//! establishment, classification of failures into transient and permanent,
//! exponential backoff with jitter, automatic reconnection when the
//! transport breaks mid-operation, layered timeout budgets and a
//! reader/writer concurrency model where Get and Capabilities share the
//! connection while Set holds it exclusively.
//!
//! The wire protocol itself stays behind the [`Transport`] and [`Session`]
//! traits; a production implementation wraps a gRPC channel, while tests
//! script outcomes in memory.
//!
//! # Example
//!
//! ```ignore
//! use gnmi_client::{CallContext, CallOptions, Client, ClientConfig, SetOperation};
//!
//! let config = ClientConfig::new("192.168.1.1")
//!     .username("admin")
//!     .password("secret");
//! let client = Client::new(config, transport)?;
//!
//! let ctx = CallContext::background();
//! let res = client
//!     .get(&ctx, vec!["/system/config/hostname".into()], CallOptions::default())
//!     .await?;
//! println!("{}", res.json());
//!
//! client
//!     .set(
//!         &ctx,
//!         vec![SetOperation::update(
//!             "/system/config/hostname",
//!             r#"{"hostname": "router1"}"#,
//!         )],
//!         CallOptions::default(),
//!     )
//!     .await?;
//! client.close().await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod backoff;
pub mod body;
pub mod client;
pub mod config;
pub mod context;
pub mod encoding;
pub mod error;
pub mod redact;
pub mod request;
pub mod response;
pub mod transport;
pub mod validate;

mod connection;
mod operations;
mod timeout;

pub use backoff::BackoffPolicy;
pub use body::{Body, BodyError};
pub use client::Client;
pub use config::ClientConfig;
pub use context::{CallContext, CancelCause};
pub use encoding::Encoding;
pub use error::{
    ConfigError, ErrorDetail, ErrorKind, FailureClass, GnmiError, GnmiResult, StatusCode,
    TransportError,
};
pub use request::{CallOptions, SetOperation, SetOperationKind};
pub use response::{
    CapabilitiesResponse, GetResponse, ModelInfo, Notification, SetResponse, Update, UpdateResult,
};
pub use transport::{
    CapabilitiesPayload, CapabilitiesRequest, GetPayload, GetRequest, Session, SetPayload,
    SetRequest, TargetConfig, Transport,
};
