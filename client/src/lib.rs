//! # Race Ticket Client
//!
//! Data-access layer every view of the betting client is composed from.
//!
//! ## Primitives
//!
//! - [`Fetch`]: a read of one path. `data` is absent until the request
//!   resolves; `revalidate()` re-issues it.
//! - [`Fetch::authorized`]: the same, sending the [`Session`]'s identity. While
//!   logged out nothing is requested and `data` stays absent.
//! - [`Mutation`]: a write endpoint. Every `call` is one request resolving to
//!   its own [`MutationResult`].
//!
//! None of them retries, caches, or de-duplicates.
//!
//! ## Flows
//!
//! - [`TicketVending`]: quote and buy a trifecta ticket
//! - [`Charge`] with [`BankDirectory`]: add points to the balance
//! - [`races`]: closure check, odds ranking and "today" window
//!
//! ## Example
//!
//! ```ignore
//! use raceticket_client::{api, Fetch, HttpFetcher, Session};
//! use std::sync::Arc;
//!
//! let fetcher = Arc::new(HttpFetcher::new("http://localhost:3000"));
//! let session = Session::new();
//! session.login(fetcher.as_ref()).await?;
//!
//! let user = Fetch::<User, _>::authorized(fetcher.clone(), api::users_me(), session.clone()).await;
//! user.settled().await;
//! println!("balance: {:?}", user.data().await.map(|u| u.balance));
//! ```

#![forbid(unsafe_code)]

pub mod api;
pub mod charge;
pub mod error;
pub mod fetch;
pub mod http;
pub mod mutation;
pub mod races;
pub mod session;
pub mod vending;

pub use charge::{BankDirectory, Charge, ChargeForm, describe_selection};
pub use error::FetchError;
pub use fetch::{Fetch, FetchAction, FetchPhase, FetchReducer, FetchState};
pub use http::{Fetcher, HttpFetcher, Request};
pub use mutation::{Mutation, MutationOptions, MutationResult};
pub use races::{day_window, is_race_closed, rank_odds};
pub use session::Session;
pub use vending::{Quote, TicketVending, VendingError};
