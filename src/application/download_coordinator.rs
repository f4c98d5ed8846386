use std::collections::VecDeque;

use futures::{stream::BoxStream, StreamExt};
use tracing::debug;

use super::session::{DownloadObserver, DownloadSession};
use crate::{
    api::ApiClient,
    domain::{AppError, DownloadRequest, DownloadedFile},
};

#[derive(Debug, Clone)]
pub enum DownloadEvent {
    /// The server accepted the request and the body is streaming.
    Started,
    Metadata(String),
    Progress {
        percent: Option<f32>,
        received_bytes: u64,
    },
    Completed(DownloadedFile),
    Failed(AppError),
}

/// Buffers session callbacks until the event stream yields them.
#[derive(Debug, Default)]
struct EventQueue {
    events: VecDeque<DownloadEvent>,
}

impl EventQueue {
    fn pop(&mut self) -> Option<DownloadEvent> {
        self.events.pop_front()
    }
}

impl DownloadObserver for EventQueue {
    fn on_progress(&mut self, percent: Option<f32>, received_bytes: u64) {
        self.events.push_back(DownloadEvent::Progress {
            percent,
            received_bytes,
        });
    }

    fn on_metadata(&mut self, file_name: &str) {
        self.events
            .push_back(DownloadEvent::Metadata(file_name.to_string()));
    }

    fn on_done(&mut self, file: DownloadedFile) {
        self.events.push_back(DownloadEvent::Completed(file));
    }

    fn on_error(&mut self, error: &AppError) {
        self.events.push_back(DownloadEvent::Failed(error.clone()));
    }
}

#[derive(Clone)]
pub struct DownloadCoordinator {
    api_client: ApiClient,
}

impl DownloadCoordinator {
    pub fn new(api_client: ApiClient) -> Self {
        Self { api_client }
    }

    /// Runs one download attempt, yielding its events in order.
    ///
    /// The stream ends after `Completed` or `Failed`. Dropping it early
    /// releases the underlying HTTP body.
    pub fn download_stream(&self, request: DownloadRequest) -> BoxStream<'static, DownloadEvent> {
        run_attempt(DownloadRuntimeState::Start {
            client: self.api_client.clone(),
            request,
        })
    }
}

fn run_attempt(initial: DownloadRuntimeState) -> BoxStream<'static, DownloadEvent> {
    futures::stream::unfold(initial, |mut state| async move {
        loop {
            match state {
                DownloadRuntimeState::Start { client, request } => {
                    let mut session = DownloadSession::new();
                    session.start(request.mode);

                    match client.start_download(&request).await {
                        Ok(stream) => {
                            return Some((
                                DownloadEvent::Started,
                                DownloadRuntimeState::Downloading {
                                    stream,
                                    session,
                                    queue: EventQueue::default(),
                                },
                            ));
                        }
                        Err(e) => {
                            let mut queue = EventQueue::default();
                            session.on_error(e.into(), &mut queue);
                            state = DownloadRuntimeState::Draining { queue };
                        }
                    }
                }
                DownloadRuntimeState::Downloading {
                    mut stream,
                    mut session,
                    mut queue,
                } => {
                    if let Some(event) = queue.pop() {
                        return Some((
                            event,
                            DownloadRuntimeState::Downloading {
                                stream,
                                session,
                                queue,
                            },
                        ));
                    }

                    match stream.next().await {
                        Some(Ok(chunk)) => session.on_chunk(chunk, &mut queue),
                        Some(Err(e)) => {
                            session.on_error(AppError::StreamRead(e.to_string()), &mut queue)
                        }
                        None => session.on_complete(&mut queue),
                    }

                    state = if session.is_active() {
                        DownloadRuntimeState::Downloading {
                            stream,
                            session,
                            queue,
                        }
                    } else {
                        debug!(
                            status = ?session.status(),
                            file_name = session.file_name(),
                            received = session.received_bytes(),
                            total = ?session.total_bytes(),
                            error = ?session.error_message(),
                            "releasing response stream"
                        );
                        DownloadRuntimeState::Draining { queue }
                    };
                }
                DownloadRuntimeState::Draining { mut queue } => {
                    return queue
                        .pop()
                        .map(|event| (event, DownloadRuntimeState::Draining { queue }));
                }
            }
        }
    })
    .boxed()
}

enum DownloadRuntimeState {
    Start {
        client: ApiClient,
        request: DownloadRequest,
    },
    Downloading {
        stream: BoxStream<'static, crate::api::Result<bytes::Bytes>>,
        session: DownloadSession,
        queue: EventQueue,
    },
    /// Session is over; hand out whatever it reported, then end.
    Draining { queue: EventQueue },
}
