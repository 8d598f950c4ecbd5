//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category.

pub mod admin;
pub mod campaigns;
pub mod distributions;
pub mod revenue;
pub mod royalties;

use crate::rpc::RpcError;

/// Map a database error onto the RPC error space.
pub(crate) fn db_error(e: reelfund_db::DbError) -> RpcError {
    match e {
        reelfund_db::DbError::NotFound(detail) => RpcError::not_found(&detail),
        other => RpcError::internal_error(&format!("db error: {other}")),
    }
}

/// Map an engine error onto the RPC error space.
pub(crate) fn engine_error(e: reelfund_engine::EngineError) -> RpcError {
    match e {
        reelfund_engine::EngineError::Db(e) => db_error(e),
        reelfund_engine::EngineError::Royalty(e) => RpcError::invalid_split(&e.to_string()),
    }
}

/// Map an ingest error onto the RPC error space.
pub(crate) fn ingest_error(e: reelfund_ingest::IngestError) -> RpcError {
    match e {
        reelfund_ingest::IngestError::MalformedPayload { adapter, detail } => {
            RpcError::malformed_payload(&format!("{adapter}: {detail}"))
        }
        reelfund_ingest::IngestError::Db(e) => db_error(e),
    }
}

/// Current unix time in seconds.
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
