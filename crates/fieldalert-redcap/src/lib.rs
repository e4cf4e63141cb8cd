//! FieldAlert REDCap gateway
//!
//! Implements [`fieldalert_domain::RecordGateway`] on top of the REDCap API:
//! - Participant histories are rebuilt from a flat record export
//!   ([`decode`]), using the field mapping in [`FieldMap`]
//! - The alert field stores a human-readable label ([`label`]); only its
//!   prefix is read back
//! - Writes import a single row holding the record id, the alert event and the
//!   alert field, after re-reading the field to detect concurrent edits
//!
//! # Usage
//!
//! ```no_run
//! use chrono::Utc;
//! use fieldalert_domain::RecordGateway;
//! use fieldalert_redcap::{RedcapConfig, RedcapGateway};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config: RedcapConfig = toml::from_str(r#"
//!     url = "https://redcap.example.org/api/"
//!     [[projects]]
//!     name = "HF01"
//!     token_env = "REDCAP_TOKEN_HF01"
//! "#)?;
//! let today = Utc::now().date_naive();
//! let gateway = RedcapGateway::for_project(&config, &config.projects[0], today)?;
//! println!("{} participants", gateway.list_active_participants()?.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod client;
mod config;
pub mod decode;
mod error;
mod gateway;
pub mod label;

pub use client::{RedcapApi, RedcapClient};
pub use config::{FieldMap, LabelConfig, ProjectConfig, RedcapConfig};
pub use error::RedcapError;
pub use gateway::RedcapGateway;
pub use label::{LabelCodec, LabelContext};
