//! Balance charge flow and the bank directory behind its form.

use crate::api;
use crate::fetch::Fetch;
use crate::http::{Fetcher, Request, decode};
use crate::mutation::{Mutation, MutationOptions, MutationResult};
use crate::session::Session;
use raceticket_core::User;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Where the client loads the bank directory from.
pub const BANK_DIRECTORY_PATH: &str = "/assets/data/banks.json";

/// Contents of the charge dialog.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeForm {
    /// Selected bank code
    pub bank_code: String,
    /// Selected branch code
    pub branch_code: String,
    /// Account number
    pub account_no: String,
    /// Points to add
    pub amount: i64,
}

impl ChargeForm {
    /// Selects a bank. The branch belongs to the previous bank, so it is cleared.
    pub fn select_bank(&mut self, bank_code: impl Into<String>) {
        self.bank_code = bank_code.into();
        self.branch_code.clear();
    }

    /// Resets every field.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Charge flow.
pub struct Charge<F: Fetcher> {
    charge: Mutation<(), F>,
}

impl<F: Fetcher> Charge<F> {
    /// Flow on behalf of `session`.
    #[must_use]
    pub fn new(fetcher: Arc<F>, session: Session) -> Self {
        Self {
            charge: Mutation::new(
                fetcher,
                api::charge(),
                MutationOptions::post().authorized(session),
            ),
        }
    }

    /// Submits `form`, then refreshes `user` whatever the outcome.
    pub async fn submit(&self, form: &ChargeForm, user: &Fetch<User, F>) -> MutationResult<()> {
        let result = self.charge.call(form).await;
        if let Some(error) = &result.error {
            tracing::warn!(status = ?error.status, %error, "Charge failed");
        }

        if let Err(error) = user.revalidate().await {
            tracing::warn!(%error, "Could not refresh user after charge");
        }
        result
    }
}

/// A bank branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch code
    pub code: String,
    /// Branch name
    pub name: String,
}

/// A bank and its branches, keyed by branch code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    /// Bank code
    pub code: String,
    /// Bank name
    pub name: String,
    /// Branches by code
    #[serde(default)]
    pub branches: BTreeMap<String, Branch>,
}

/// Banks keyed by bank code.
///
/// Loaded on demand when the charge dialog opens.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BankDirectory {
    banks: BTreeMap<String, Bank>,
}

impl BankDirectory {
    /// An empty directory.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A directory of `banks`.
    #[must_use]
    pub fn from_banks(banks: impl IntoIterator<Item = Bank>) -> Self {
        Self {
            banks: banks.into_iter().map(|b| (b.code.clone(), b)).collect(),
        }
    }

    /// Loads the directory from `path`. Failures are logged and yield an
    /// empty directory.
    pub async fn load<F: Fetcher>(fetcher: &F, path: &str) -> Self {
        let loaded = match fetcher.fetch(Request::get(path)).await {
            Ok(body) => decode::<BTreeMap<String, Bank>>(body),
            Err(error) => Err(error),
        };

        match loaded {
            Ok(banks) => {
                tracing::debug!(banks = banks.len(), "Bank directory loaded");
                Self { banks }
            },
            Err(error) => {
                tracing::error!(%error, path, "Failed to load bank directory");
                Self::empty()
            },
        }
    }

    /// `(code, name)` of every bank, by code.
    pub fn banks(&self) -> impl Iterator<Item = (&str, &str)> {
        self.banks
            .values()
            .map(|bank| (bank.code.as_str(), bank.name.as_str()))
    }

    /// Whether nothing was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }
}

/// What the form's current codes refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection<'a> {
    /// Selected bank, if the code is known
    pub bank: Option<&'a Bank>,
    /// Selected branch of that bank, if the code is known
    pub branch: Option<&'a Branch>,
}

/// Resolves bank and branch codes against `directory`.
#[must_use]
pub fn describe_selection<'a>(
    directory: &'a BankDirectory,
    bank_code: &str,
    branch_code: &str,
) -> Selection<'a> {
    let bank = directory.banks.get(bank_code);
    let branch = bank.and_then(|bank| bank.branches.get(branch_code));
    Selection { bank, branch }
}
