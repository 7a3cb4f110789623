//! Server-Sent Events for per-job enrichment progress
//!
//! Event names follow the wire contract: `connected` on attach, then
//! `enrichment.started` / `enrichment.progress` /
//! `enrichment.component.completed` / `enrichment.component.failed` /
//! `enrichment.completed` / `enrichment.error`. Every payload carries the
//! full counter snapshot.

use crate::AppState;
use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use bomcat_common::events::EnrichEvent;

/// GET /enrich/jobs/:job_id/events - SSE stream of one job's progress
pub async fn job_event_stream(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(job_id = %job_id, "New SSE client connected to job events");

    let subscription = state.hub.subscribe(job_id);
    // Prefer the hub's last-seen snapshot; fall back to asking the
    // orchestrator directly for jobs with no events yet
    let snapshot = match subscription.snapshot {
        Some(progress) => Some(progress),
        None => state.orchestrator.status(job_id).await.ok(),
    };
    let mut rx = subscription.receiver;

    let stream = async_stream::stream! {
        if let Some(progress) = snapshot {
            let connected = EnrichEvent::connected(progress);
            match serde_json::to_string(&connected) {
                Ok(json) => {
                    yield Ok(Event::default().event(connected.event_type()).data(json));
                }
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "SSE: Failed to serialize connected frame");
                }
            }
        }

        loop {
            tokio::select! {
                // Heartbeat keeps intermediaries from timing the stream out
                _ = tokio::time::sleep(Duration::from_secs(15)) => {
                    debug!(job_id = %job_id, "SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = rx.recv() => {
                    match received {
                        Ok(event) => {
                            let event_type = event.event_type();
                            let terminal = event.is_terminal();

                            match serde_json::to_string(&event) {
                                Ok(json) => {
                                    debug!(job_id = %job_id, event = event_type, "SSE: Forwarding event");
                                    yield Ok(Event::default().event(event_type).data(json));
                                }
                                Err(e) => {
                                    warn!(job_id = %job_id, event = event_type, error = %e, "SSE: Failed to serialize event");
                                }
                            }

                            if terminal {
                                info!(job_id = %job_id, "SSE: Job finished, closing stream");
                                break;
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            // Snapshots are self-contained; just continue
                            warn!(job_id = %job_id, skipped = skipped, "SSE: Client lagged, skipping ahead");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            info!(job_id = %job_id, "SSE: Progress channel closed");
                            break;
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
