//! Object streaming handler
//!
//! Resolves the object size, plans the served window and answers with a 206
//! whose body is fed by a transfer session running in its own task.

use super::router::RequestContext;
use crate::config::AppState;
use crate::error::StoreError;
use crate::http::{self, mime, response, ResponseBody};
use crate::logger::{AccessRecord, RelayEvent};
use crate::relay::{self, resolve_size, ChunkSequencer, TransferSession};
use crate::store::ObjectRef;
use hyper::{Response, StatusCode};
use std::sync::Arc;
use tracing::debug;

/// Serve one bounded window of an object
pub async fn serve_object(ctx: RequestContext, state: &Arc<AppState>) -> Response<ResponseBody> {
    let object = ObjectRef::new(state.config.store.bucket.as_str(), ctx.key.as_str());
    let mut record = AccessRecord::new(
        ctx.peer_addr.to_string(),
        ctx.method.to_string(),
        ctx.path.clone(),
    );
    record.user_agent.clone_from(&ctx.user_agent);

    // 1. Resolve size
    let total_size = match resolve_size(state.store.as_ref(), &object, state.events.as_ref()).await
    {
        Ok(size) => size,
        Err(StoreError::NotFound(_)) => {
            return respond(state, &ctx, record, "not_found", http::build_404_response());
        }
        Err(StoreError::Unavailable(_)) => {
            return respond(state, &ctx, record, "unavailable", http::build_502_response());
        }
    };

    // 2. Plan the window
    let plan = match http::plan(
        ctx.range_header.as_deref(),
        total_size,
        state.config.stream.max_span,
    ) {
        Ok(plan) => plan,
        Err(e) => {
            debug!("{object}: {e}");
            return respond(
                state,
                &ctx,
                record,
                "range_not_satisfiable",
                http::build_416_response(total_size),
            );
        }
    };

    let session_id = state.next_session_id();
    state.events.emit(&RelayEvent::RangeServed {
        session: session_id,
        object: &object,
        span: plan.span,
        total: total_size,
    });

    let content_type = mime::content_type_for(&ctx.key)
        .unwrap_or(state.config.http.default_content_type.as_str());
    record.content_range = Some(plan.content_range.clone());

    // 3. HEAD: headers only, no fetches
    if ctx.is_head() {
        let resp =
            http::build_partial_response(response::empty(), &plan, content_type, &state.config.http);
        return respond(state, &ctx, record, "head", resp);
    }

    // 4. Stream the window from a session task
    let (mut sink, body) = relay::channel();
    let cancel = state.shutdown.child_token();
    let mut session = TransferSession::new(session_id, object.clone(), plan.span, cancel.clone());
    let sequence = ChunkSequencer::new(
        Arc::clone(&state.store),
        object,
        plan.span,
        state.config.stream.chunk_size,
    );

    if let Some(limit) = state.config.stream.session_timeout() {
        let deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(limit) => deadline.cancel(),
                () = deadline.cancelled() => {}
            }
        });
    }

    let task_state = Arc::clone(state);
    let received_at = ctx.received_at;
    record.status = StatusCode::PARTIAL_CONTENT.as_u16();
    tokio::spawn(async move {
        let result = relay::relay(
            &mut session,
            sequence.into_stream(),
            &mut sink,
            task_state.events.as_ref(),
        )
        .await;
        // Session over; releases the deadline timer
        cancel.cancel();

        record.bytes_sent = session.bytes_written();
        record.outcome = match &result {
            Ok(_) => "completed",
            Err(e) => e.kind(),
        };
        record.duration_us = elapsed_us(received_at);
        task_state.events.emit(&RelayEvent::Access(&record));
    });

    http::build_partial_response(body, &plan, content_type, &state.config.http)
}

/// Emit the access record for a response answered without a transfer
fn respond(
    state: &AppState,
    ctx: &RequestContext,
    mut record: AccessRecord,
    outcome: &'static str,
    response: Response<ResponseBody>,
) -> Response<ResponseBody> {
    record.status = response.status().as_u16();
    record.outcome = outcome;
    record.duration_us = elapsed_us(ctx.received_at);
    state.events.emit(&RelayEvent::Access(&record));
    response
}

fn elapsed_us(since: std::time::Instant) -> u64 {
    u64::try_from(since.elapsed().as_micros()).unwrap_or(u64::MAX)
}
