//! Admin CRUD API
//!
//! Every route here sits behind the admin guard. Content writes keep the
//! knowledge index in step with the row's status: published rows are
//! re-chunked, anything else has its chunks dropped. Index failures are
//! logged and reported as a missing `index`, they never fail the write.

pub mod articles;
pub mod experiences;
pub mod knowledge;
pub mod projects;
pub mod skills;
pub mod stories;

use folio_common::{
    db::models::{ContentStatus, SourceKind},
    knowledge::{IndexReport, SourceDocument},
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::AppState;

/// Body of every create/update response
#[derive(Debug, Serialize)]
pub struct WriteResponse<T: Serialize> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexReport>,
}

/// `?status=&page=&per_page=` for admin listings
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<ContentStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Re-index or un-index one content row after a write
pub(crate) async fn sync_index(
    state: &AppState,
    owner_id: Uuid,
    status: ContentStatus,
    document: SourceDocument,
) -> Option<IndexReport> {
    let kind = document.kind;
    let source_id = document.source_id;

    let outcome = if status.is_published() {
        state.indexer.index_document(owner_id, &document).await
    } else {
        match source_id {
            Some(id) => state
                .indexer
                .remove_source(owner_id, kind, id)
                .await
                .map(|_| IndexReport::default()),
            None => Ok(IndexReport::default()),
        }
    };

    match outcome {
        Ok(report) => {
            if report.failed > 0 {
                warn!(kind = %kind, source_id = ?source_id, failed = report.failed, "Some chunks were not indexed");
            }
            Some(report)
        }
        Err(e) => {
            warn!(error = %e, kind = %kind, source_id = ?source_id, "Knowledge index sync failed");
            None
        }
    }
}

/// Drop the chunks of a deleted row
pub(crate) async fn drop_index(state: &AppState, owner_id: Uuid, kind: SourceKind, id: Uuid) {
    if let Err(e) = state.indexer.remove_source(owner_id, kind, id).await {
        warn!(error = %e, kind = %kind, source_id = %id, "Failed to remove chunks of deleted source");
    }
}
