//! Object metadata resolver

use crate::error::StoreResult;
use crate::logger::{EventLog, RelayEvent};
use crate::store::{ObjectRef, ObjectStore};

/// Resolve the size of an object with a single metadata call
///
/// `NotFound` and `Unavailable` are passed through unchanged so the caller can
/// answer 404 or 502.
pub async fn resolve_size(
    store: &dyn ObjectStore,
    object: &ObjectRef,
    events: &dyn EventLog,
) -> StoreResult<u64> {
    match store.head_object(object).await {
        Ok(meta) => {
            events.emit(&RelayEvent::SizeResolved {
                object,
                size: meta.size,
            });
            Ok(meta.size)
        }
        Err(e) => {
            events.emit(&RelayEvent::Failed {
                session: None,
                object,
                error: &e,
            });
            Err(e)
        }
    }
}
