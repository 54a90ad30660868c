use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::link::Link;

/// A resolved user record, as used in authorization decisions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub login: String,
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Identity {
    /// The subset of the identity embedded in access tokens
    pub fn token_subject(&self) -> TokenSubject {
        TokenSubject {
            login: self.login.clone(),
            id: self.id.clone(),
        }
    }
}

/// The identity subset carried by an access token.
///
/// After successful verification this is what request handlers see as the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSubject {
    pub login: String,
    pub id: String,
}

/// An identity with its derived link data.
///
/// Only ever constructed from both a successful count and a successful listing.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(flatten)]
    pub identity: Identity,
    pub links_count: i64,
    pub links: Vec<Link>,
}
