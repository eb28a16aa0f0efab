//! Requests accepted by the [`RealtimeActor`](super::RealtimeActor).

use chrono::{DateTime, Utc};

use super::RealtimeError;
use crate::framework::Response;
use crate::model::OrderCallRecord;

#[derive(Debug)]
pub enum RealtimeRequest {
    Connect {
        store_id: String,
        respond_to: Response<()>,
    },
    Disconnect {
        respond_to: Response<()>,
    },
    FetchRecent {
        since: DateTime<Utc>,
        limit: usize,
        respond_to: Response<Result<Vec<OrderCallRecord>, RealtimeError>>,
    },
}
