//! Command structs for engine write operations.
//!
//! These types group the parameters of `save_transaction`/`save_wallet`,
//! keeping call sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{TransactionKind, uploader::ImageSource};

/// Create a transaction (`id` is `None`) or edit an existing one.
///
/// Fields mirror what a client form sends: the kind, the amount and the
/// wallet are mandatory, everything else is optional. On edit, optional
/// fields left as `None` keep their stored value.
#[derive(Clone, Debug)]
pub struct SaveTransactionCmd {
    pub id: Option<Uuid>,
    pub uid: String,
    pub kind: Option<TransactionKind>,
    pub amount_minor: i64,
    pub wallet_id: Option<Uuid>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub image: Option<ImageSource>,
}

impl SaveTransactionCmd {
    #[must_use]
    pub fn new(
        uid: impl Into<String>,
        kind: TransactionKind,
        amount_minor: i64,
        wallet_id: Uuid,
    ) -> Self {
        Self {
            id: None,
            uid: uid.into(),
            kind: Some(kind),
            amount_minor,
            wallet_id: Some(wallet_id),
            category: None,
            description: None,
            date: None,
            image: None,
        }
    }

    #[must_use]
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn image(mut self, image: ImageSource) -> Self {
        self.image = Some(image);
        self
    }
}

/// Create a wallet (`id` is `None`) or rename/re-icon an existing one.
#[derive(Clone, Debug)]
pub struct SaveWalletCmd {
    pub id: Option<Uuid>,
    pub uid: String,
    pub name: Option<String>,
    pub image: Option<ImageSource>,
}

impl SaveWalletCmd {
    #[must_use]
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            uid: uid.into(),
            name: Some(name.into()),
            image: None,
        }
    }

    /// Edit of an existing wallet; set `name`/`image` to change them.
    #[must_use]
    pub fn edit(uid: impl Into<String>, id: Uuid) -> Self {
        Self {
            id: Some(id),
            uid: uid.into(),
            name: None,
            image: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn image(mut self, image: ImageSource) -> Self {
        self.image = Some(image);
        self
    }
}
