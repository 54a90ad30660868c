//! Profile aggregation: an identity plus its link count and one page of its links.
//!
//! Both derived values are fetched concurrently and merged only if both succeed.

use std::{fmt::Display, future::Future};

use futures_util::{future::BoxFuture, FutureExt};
use shortener_db::{Db, DbError, DbResult};
use thiserror::Error;
use tracing::warn;

use crate::{
    db::link_db,
    identity::{Identity, Profile},
    join::{join_settled, BranchError},
    link::{Link, Pagination},
};

/// Storage needed to build a profile.
///
/// Every call may run on its own task, so implementors are cheap handles to shared storage.
pub trait ProfileStore: Clone + Send + Sync + 'static {
    fn count_links(&self, user_id: String) -> impl Future<Output = DbResult<i64>> + Send;

    fn list_links(
        &self,
        user_id: String,
        page: Pagination,
    ) -> impl Future<Output = DbResult<Vec<Link>>> + Send;
}

impl<D: Db + Clone> ProfileStore for D {
    async fn count_links(&self, user_id: String) -> DbResult<i64> {
        link_db::count_links_for_identity(self, &user_id).await
    }

    async fn list_links(&self, user_id: String, page: Pagination) -> DbResult<Vec<Link>> {
        link_db::list_links_for_identity(self, &user_id, page).await
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileBranch {
    Count,
    List,
}

impl Display for ProfileBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count => write!(f, "link count"),
            Self::List => write!(f, "link list"),
        }
    }
}

/// One or both branches of an aggregation failed.
#[derive(Error, Debug)]
#[error("profile aggregation failed: {}", describe(.failures))]
pub struct AggregationError {
    pub failures: Vec<(ProfileBranch, BranchError<DbError>)>,
}

fn describe(failures: &[(ProfileBranch, BranchError<DbError>)]) -> String {
    failures
        .iter()
        .map(|(branch, err)| format!("{branch}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

enum ProfilePart {
    Count(i64),
    Links(Vec<Link>),
}

/// Build the profile view of `identity`.
///
/// Returns either a fully populated [Profile] or an [AggregationError] carrying
/// every branch failure. A successful branch is discarded when the other one fails.
pub async fn aggregate_profile(
    store: &impl ProfileStore,
    identity: Identity,
    page: Pagination,
) -> Result<Profile, AggregationError> {
    let count = {
        let store = store.clone();
        let user_id = identity.id.clone();
        async move { store.count_links(user_id).await.map(ProfilePart::Count) }.boxed()
    };
    let list = {
        let store = store.clone();
        let user_id = identity.id.clone();
        async move {
            store
                .list_links(user_id, page)
                .await
                .map(ProfilePart::Links)
        }
        .boxed()
    };

    let branches: Vec<BoxFuture<'static, DbResult<ProfilePart>>> = vec![count, list];
    let mut results = join_settled(branches).await.into_iter();

    let (Some(count), Some(list), None) = (results.next(), results.next(), results.next()) else {
        unreachable!("join_settled returns one result per branch");
    };

    match (count, list) {
        (Ok(ProfilePart::Count(links_count)), Ok(ProfilePart::Links(links))) => Ok(Profile {
            identity,
            links_count,
            links,
        }),
        (count, list) => {
            let failures: Vec<_> = [(ProfileBranch::Count, count), (ProfileBranch::List, list)]
                .into_iter()
                .filter_map(|(branch, result)| result.err().map(|err| (branch, err)))
                .collect();

            warn!(
                user_id = %identity.id,
                failures = %describe(&failures),
                "profile aggregation failed"
            );

            Err(AggregationError { failures })
        }
    }
}
