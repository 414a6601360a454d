//! Async Rust client library and CLI core for SharePoint Online.
//!
//! Each command is a small, stateless wrapper around one SharePoint
//! operation: validate options, build a request against the REST API or the
//! legacy `client.svc/ProcessQuery` endpoint, send it with a bearer token,
//! and turn the response into console output or an error.
//!
//! # Modules
//!
//! - [`auth`]: OAuth2 client credentials token provider, cached per resource.
//! - [`client`]: Authenticated HTTP wrapper for SharePoint site URLs.
//! - [`client_svc`]: ProcessQuery request envelopes and response decoding.
//! - [`command`]: Command trait and the generic executor pipeline.
//! - [`confirm`]: Confirmation gate for destructive commands.
//! - [`config`]: Config file and flag/environment layering.
//! - [`console`]: User-facing stdout/stderr output.
//! - [`error`]: Typed error hierarchy (`SpoError`).
//! - [`session`]: Connection context and URL validation.
//! - [`hubsite`]: `spo hubsite data get`.
//! - [`cdn`]: `spo cdn origin remove`.
//!
//! # Quick Start
//!
//! ```ignore
//! use spo_cli::auth::TokenProvider;
//! use spo_cli::client::SpoClient;
//! use spo_cli::command::{Context, execute};
//! use spo_cli::confirm::StdinConfirm;
//! use spo_cli::console::Console;
//! use spo_cli::hubsite::{HubSiteDataGet, HubSiteDataGetArgs};
//! use spo_cli::session::Session;
//!
//! let client = SpoClient::new(TokenProvider::with_token("eyJ0eXAi..."));
//! let session = Session::default();
//! let mut console = Console::stdio(false);
//! let mut confirmer = StdinConfirm;
//! let mut ctx = Context { client: &client, session: &session, console: &mut console, confirmer: &mut confirmer };
//! let args = HubSiteDataGetArgs { web_url: "https://contoso.sharepoint.com/sites/test".into(), force_refresh: false };
//! let outcome = execute(&HubSiteDataGet, &args, &mut ctx).await?;
//! ```

#![warn(missing_docs)]

pub mod auth;
pub mod cdn;
pub mod client;
pub mod client_svc;
pub mod command;
pub mod config;
pub mod confirm;
pub mod console;
pub mod error;
pub mod hubsite;
pub mod session;
