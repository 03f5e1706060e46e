//! Ticket vending flow.
//!
//! Backs the purchase dialog on the odds page: show a quote for the chosen
//! combination, buy it, and refresh the balance on success.

use crate::api;
use crate::fetch::Fetch;
use crate::http::Fetcher;
use crate::mutation::{Mutation, MutationOptions};
use crate::session::Session;
use raceticket_core::purchase::{TICKET_PRICE, TicketRequest, balance_after_purchase};
use raceticket_core::{BettingTicket, RaceId, User};
use std::sync::Arc;
use thiserror::Error;

/// HTTP status the server uses for an insufficient balance.
const PRECONDITION_FAILED: u16 = 412;

/// Why a purchase could not be made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VendingError {
    /// No identity, or the user has not loaded yet
    #[error("login required")]
    LoginRequired,

    /// Balance below the ticket price
    #[error("insufficient balance")]
    InsufficientBalance,

    /// Any other failure, with the server's message
    #[error("{0}")]
    Failed(String),
}

/// Price and balances shown before buying.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quote {
    /// Ticket price
    pub price: i64,
    /// Current balance
    pub balance: i64,
    /// Balance after buying one ticket
    pub balance_after: i64,
}

impl Quote {
    /// Whether the balance covers the price.
    #[must_use]
    pub const fn is_affordable(&self) -> bool {
        self.balance_after >= 0
    }
}

/// Purchase flow for one race.
pub struct TicketVending<F: Fetcher> {
    race_id: RaceId,
    session: Session,
    purchase: Mutation<BettingTicket, F>,
}

impl<F: Fetcher> TicketVending<F> {
    /// Flow for `race_id` on behalf of `session`.
    #[must_use]
    pub fn new(fetcher: Arc<F>, session: Session, race_id: RaceId) -> Self {
        let purchase = Mutation::new(
            fetcher,
            api::betting_tickets(race_id),
            MutationOptions::post().authorized(session.clone()),
        );

        Self {
            race_id,
            session,
            purchase,
        }
    }

    /// Race this flow buys tickets for.
    #[must_use]
    pub const fn race_id(&self) -> RaceId {
        self.race_id
    }

    /// Quote for one ticket given the loaded user.
    ///
    /// # Errors
    ///
    /// Returns [`VendingError::LoginRequired`] when logged out or the user
    /// has not loaded.
    pub fn quote(&self, user: Option<&User>) -> Result<Quote, VendingError> {
        let user = user
            .filter(|_| self.session.is_logged_in())
            .ok_or(VendingError::LoginRequired)?;

        Ok(Quote {
            price: TICKET_PRICE,
            balance: user.balance,
            balance_after: balance_after_purchase(user.balance),
        })
    }

    /// Buys a trifecta ticket for `key` and refreshes `user` on success.
    ///
    /// # Errors
    ///
    /// - [`VendingError::LoginRequired`] when logged out or `user` has no data
    /// - [`VendingError::InsufficientBalance`] when the server answers 412
    /// - [`VendingError::Failed`] with the server's message otherwise
    pub async fn buy(&self, key: Vec<i32>, user: &Fetch<User, F>) -> Result<BettingTicket, VendingError> {
        if !self.session.is_logged_in() || user.data().await.is_none() {
            return Err(VendingError::LoginRequired);
        }

        let ticket = self
            .purchase
            .call(&TicketRequest::trifecta(key))
            .await
            .into_result()
            .map_err(|error| {
                if error.has_status(PRECONDITION_FAILED) {
                    VendingError::InsufficientBalance
                } else {
                    VendingError::Failed(error.message)
                }
            })?;

        tracing::info!(race_id = %self.race_id, ticket_id = %ticket.id, "Ticket purchased");

        if let Err(error) = user.revalidate().await {
            tracing::warn!(%error, "Could not refresh user after purchase");
        }
        Ok(ticket)
    }
}
