// GET /stream as a continuously flushed event stream

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures_util::{StreamExt, future};
use serde::Deserialize;
use std::convert::Infallible;

use super::FacadeState;
use crate::error::{DataError, ProtocolError, RuntimeError};
use crate::logs::LogLineSource;
use crate::mux::merge;
use crate::runtime::ContainerRuntime;
use crate::stats::StatsSampler;

#[derive(Debug, Deserialize)]
pub(super) struct StreamParams {
    #[serde(default)]
    container: String,
}

pub(super) async fn stream_handler<R: ContainerRuntime>(
    State(state): State<FacadeState<R>>,
    Query(params): Query<StreamParams>,
) -> Response {
    let container = params.container;
    if container.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            ProtocolError::MissingContainer.body(),
        )
            .into_response();
    }

    let handle = match state.runtime.resolve(&container).await {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!(container = %container, error = %e, "Container lookup failed");
            let status = match e {
                RuntimeError::NotFound(_) => StatusCode::NOT_FOUND,
                RuntimeError::Unavailable(_) | RuntimeError::Stream(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            };
            return (status, e.to_string()).into_response();
        }
    };

    tracing::info!(container = %container, "Event stream started");
    let logs = LogLineSource::new(handle.clone()).stream(state.log_tail);
    let stats = StatsSampler::new(&handle).stream();
    let events = merge(logs, stats).map(move |record| {
        record
            .and_then(|r| r.render().map_err(DataError::from))
            .map(|payload| Event::default().data(payload))
            .inspect_err(|e| {
                tracing::warn!(container = %container, error = %e, "Event stream ended on data error");
            })
    });
    // A data error closes the body normally instead of aborting it.
    let events = events
        .take_while(|event| future::ready(event.is_ok()))
        .filter_map(|event| future::ready(event.ok()))
        .map(Ok::<Event, Infallible>);

    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}
