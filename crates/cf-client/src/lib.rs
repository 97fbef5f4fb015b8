#![warn(missing_docs)]

//! Cloud Foundry API client: CC v3 listings, UAA token handling and Diego BBS
//! ActualLRP queries behind the [`CfApi`] and [`BbsApi`] traits.

pub mod auth;
pub mod bbs;
pub mod error;
pub mod models;
pub mod retry;
pub mod session;
pub mod tls;

pub use auth::{Credentials, TokenSource};
pub use bbs::{BbsClient, BbsConfig};
pub use error::{ClientError, Result};
pub use retry::RetryConfig;
pub use session::{BbsApi, CfApi, CfSession, SessionConfig, DEFAULT_PAGE_SIZE};
