//! The exchange record reconciler.
//!
//! Produces one time-ordered sequence of exchange events from two
//! disjoint sources - formal sent/received rows and manual per-postcard
//! recipient annotations - plus a grouped-by-recipient projection of it.

use std::sync::Arc;

use chrono::{NaiveTime, Utc};
use indexmap::IndexMap;
use tokio::sync::watch;
use tracing::{debug, warn};

use store_core::{Cond, Join, Query, Row, StoreError, StoreGateway, UserId};

use crate::cache::{Cache, Status};
use crate::error::DataError;
use crate::model::{
    parse_sent_to, ExchangeDirection, ExchangeRecord, ExchangeStatus, FriendKey, GroupedRecord,
    PostcardSummary,
};
use crate::naming;
use crate::rows::{ExchangeRow, ManualRow};
use crate::session::SessionState;
use crate::tables;

/// Map a formal exchange row into the normalized record shape.
///
/// Direction follows which side the current user is on; the counterpart
/// identity comes from the opposite side's profile join.
fn map_formal_row(row: ExchangeRow, user: &UserId) -> Result<ExchangeRecord, StoreError> {
    let is_sender = row.sender_id == user.as_str();
    let counterpart = if is_sender { &row.receiver } else { &row.sender };
    let (friend_name, friend_avatar) = counterpart.display_identity();
    let status = ExchangeStatus::parse(&row.status).ok_or_else(|| StoreError::Decode {
        table: tables::EXCHANGE_RECORDS,
        message: format!("unknown status '{}'", row.status),
    })?;
    Ok(ExchangeRecord {
        id: row.id,
        friend_key: FriendKey::Id(counterpart.id.clone()),
        friend_name,
        friend_avatar,
        date: row.sent_date,
        postcard_title: row.postcard.title,
        postcard_image_url: row.postcard.image_url,
        direction: if is_sender {
            ExchangeDirection::Sent
        } else {
            ExchangeDirection::Received
        },
        status,
    })
}

/// Synthesize records from a manual annotation: one per recipient name,
/// always sent/delivered, dated by the collection date.
///
/// The composite id (`{relationship_id}-{index}`) keeps records unique
/// when one relationship fans out to several recipients.
fn synthesize_manual_records(row: ManualRow) -> Vec<ExchangeRecord> {
    let date = row.collected_date.and_time(NaiveTime::MIN).and_utc();
    parse_sent_to(row.sent_to.as_deref())
        .into_iter()
        .enumerate()
        .map(|(index, name)| ExchangeRecord {
            id: format!("{}-{}", row.id, index),
            friend_avatar: naming::placeholder_avatar(&name),
            friend_key: FriendKey::Name(name.clone()),
            friend_name: name,
            date,
            postcard_title: row.postcard.title.clone(),
            postcard_image_url: row.postcard.image_url.clone(),
            direction: ExchangeDirection::Sent,
            status: ExchangeStatus::Delivered,
        })
        .collect()
}

/// Group sent records by their resolved counterpart key, in encounter
/// order. Groups and their members are not re-sorted here; display
/// ordering is the caller's responsibility.
pub fn group_records(records: &[ExchangeRecord]) -> Vec<GroupedRecord> {
    let mut groups: IndexMap<FriendKey, GroupedRecord> = IndexMap::new();
    for record in records
        .iter()
        .filter(|record| record.direction == ExchangeDirection::Sent)
    {
        let group = groups
            .entry(record.friend_key.clone())
            .or_insert_with(|| GroupedRecord {
                friend_key: record.friend_key.clone(),
                friend_name: record.friend_name.clone(),
                friend_avatar: record.friend_avatar.clone(),
                is_favorite: false,
                postcards: Vec::new(),
            });
        group.postcards.push(PostcardSummary {
            id: record.id.clone(),
            title: record.postcard_title.clone(),
            image_url: record.postcard_image_url.clone(),
            date: record.date.date_naive(),
        });
    }
    groups.into_values().collect()
}

/// Store for the merged exchange record sequence.
pub struct ExchangeStore {
    gateway: Arc<dyn StoreGateway>,
    session: watch::Receiver<SessionState>,
    cache: Arc<Cache<ExchangeRecord>>,
    status: Status,
    /// Serializes fetches so an older read can never install over a
    /// newer one.
    fetch_lock: tokio::sync::Mutex<()>,
}

impl ExchangeStore {
    pub(crate) fn new(
        gateway: Arc<dyn StoreGateway>,
        session: watch::Receiver<SessionState>,
    ) -> Self {
        Self {
            gateway,
            session,
            cache: Arc::new(Cache::new()),
            status: Status::new(),
            fetch_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The merged record sequence, newest first.
    pub async fn records(&self) -> Vec<ExchangeRecord> {
        self.cache.snapshot().await
    }

    /// The grouped-by-recipient projection of the current records.
    ///
    /// Pure recomputation over the cached sequence; holds no state of
    /// its own.
    pub async fn grouped(&self) -> Vec<GroupedRecord> {
        group_records(&self.cache.snapshot().await)
    }

    /// Whether a fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }

    /// The last read error, if the cache is stale because of one.
    pub fn last_error(&self) -> Option<DataError> {
        self.status.last_error()
    }

    fn current_user(&self) -> Option<UserId> {
        self.session.borrow().user.clone()
    }

    fn require_user(&self) -> Result<UserId, DataError> {
        self.current_user().ok_or(DataError::NotAuthenticated)
    }

    /// Reconcile both sources into one sequence sorted by date
    /// descending.
    ///
    /// Either query failing aborts the whole reconciliation and keeps
    /// the previous cache; partial results are never exposed. Ties on
    /// the sort key keep formal-before-manual concatenation order (the
    /// sort is stable).
    pub async fn fetch(&self) -> Result<(), DataError> {
        let _serialized = self.fetch_lock.lock().await;
        let Some(user) = self.current_user() else {
            self.cache.clear().await;
            self.status.set_loading(false);
            return Ok(());
        };

        let epoch = self.cache.epoch();
        self.status.set_loading(true);
        let result = self.load_records(&user).await;
        self.status.set_loading(false);

        match result {
            Ok(records) => {
                if !self.cache.set_if_epoch(epoch, records).await {
                    debug!("discarding exchange snapshot fetched under a previous identity");
                }
                self.status.record(None);
                Ok(())
            }
            Err(err) => {
                self.status.record(Some(err.clone()));
                Err(err)
            }
        }
    }

    async fn load_records(&self, user: &UserId) -> Result<Vec<ExchangeRecord>, DataError> {
        let formal_query = Query::table(tables::EXCHANGE_RECORDS)
            .join(Join::required(tables::POSTCARDS, "postcard", "postcard_id"))
            .join(Join::required(tables::PROFILES, "sender", "sender_id"))
            .join(Join::required(tables::PROFILES, "receiver", "receiver_id"))
            .any_of(vec![
                Cond::eq("sender_id", user.as_str()),
                Cond::eq("receiver_id", user.as_str()),
            ])
            .order_desc("sent_date");
        let formal_rows = self
            .gateway
            .query_rows(formal_query)
            .await
            .map_err(DataError::Read)?;

        let manual_query = Query::table(tables::USER_POSTCARDS)
            .join(Join::required(tables::POSTCARDS, "postcard", "postcard_id"))
            .eq("user_id", user.as_str())
            .not_null("sent_to");
        let manual_rows = self
            .gateway
            .query_rows(manual_query)
            .await
            .map_err(DataError::Read)?;

        let mut records = Vec::new();
        for row in &formal_rows {
            let decoded: ExchangeRow = row
                .decode(tables::EXCHANGE_RECORDS)
                .map_err(DataError::Read)?;
            records.push(map_formal_row(decoded, user).map_err(DataError::Read)?);
        }
        for row in &manual_rows {
            let decoded: ManualRow = row
                .decode(tables::USER_POSTCARDS)
                .map_err(DataError::Read)?;
            records.extend(synthesize_manual_records(decoded));
        }

        // Stable: equal dates keep source-then-original order.
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }

    /// Record a formal send of a card to a counterpart, then refetch.
    pub async fn send_postcard(
        &self,
        receiver_id: &str,
        postcard_id: &str,
    ) -> Result<(), DataError> {
        let user = self.require_user()?;
        self.gateway
            .insert_row(
                tables::EXCHANGE_RECORDS,
                Row::new()
                    .set("sender_id", user.as_str())
                    .set("receiver_id", receiver_id)
                    .set("postcard_id", postcard_id)
                    .set("status", ExchangeStatus::Pending.as_str())
                    .set("sent_date", Utc::now().to_rfc3339()),
            )
            .await
            .map_err(DataError::Write)?;
        self.fetch().await
    }

    pub(crate) async fn apply_session(&self, state: &SessionState) {
        self.cache.bump_epoch();
        if state.user.is_none() {
            self.cache.clear().await;
            self.status.record(None);
        } else if let Err(err) = self.fetch().await {
            warn!("exchange refetch after identity change failed: {}", err);
        }
    }
}
