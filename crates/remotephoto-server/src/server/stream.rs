//! `/listen`: one server-sent-events stream per viewer
//!
//! Each connection registers with the broker and turns its queue into body
//! frames, one frame per event. Hyper writes every body frame out as soon
//! as it is produced, so events are never held back behind later ones.
//!
//! When the viewer goes away or a write fails, hyper drops the body. That
//! drops the `ClientHandle`, which deregisters it exactly once.

use crate::server::routes::AppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Version},
    response::Response,
};
use bytes::Bytes;
use futures::stream::{self, Stream};
use remotephoto_core::{keep_alive_frame, ClientHandle, Error};
use std::convert::Infallible;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// Upgrade the request into an event stream
pub async fn listen(
    State(state): State<AppState>,
    version: Version,
) -> Result<Response, AppError> {
    ensure_streamable(version)?;

    let client = state.broker.register().await;
    debug!("Streaming events to client {} over {:?}", client.id(), version);

    let body = Body::from_stream(event_frames(client, state.config.stream.keep_alive()));
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));

    Ok(response)
}

/// HTTP/1.0 has neither chunked bodies nor a way to flush mid-response;
/// refuse before registering instead of buffering silently.
fn ensure_streamable(version: Version) -> Result<(), Error> {
    if version < Version::HTTP_11 {
        return Err(Error::streaming_unsupported(format!(
            "{:?} cannot carry an incremental response",
            version
        )));
    }
    Ok(())
}

/// Frames for one client: its events in order, plus keep-alive comments
/// while idle. Ends once the broker drops the client.
pub fn event_frames(
    client: ClientHandle,
    keep_alive: Option<Duration>,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    let ticker = keep_alive.map(|period| {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    stream::unfold((client, ticker), |(mut client, mut ticker)| async move {
        let frame = next_frame(&mut client, ticker.as_mut()).await?;
        Some((Ok(frame), (client, ticker)))
    })
}

async fn next_frame(client: &mut ClientHandle, ticker: Option<&mut Interval>) -> Option<Bytes> {
    match ticker {
        Some(ticker) => tokio::select! {
            event = client.recv() => event.map(|e| e.to_frame()),
            _ = ticker.tick() => Some(keep_alive_frame()),
        },
        None => client.recv().await.map(|e| e.to_frame()),
    }
}
