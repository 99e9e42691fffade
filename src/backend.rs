//! Background I/O for the UI thread.
//!
//! All network work runs on a small tokio runtime. Results and live events
//! come back over an `mpsc` channel that the UI drains once per frame, so
//! every piece of application state is still only touched on the UI thread.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use anyhow::{Context as _, Result};
use eframe::egui::Context;
use serde_json::Value;
use tokio::runtime::Runtime;

use crate::live::{ConnectionState, LiveMessage, LiveSyncClient, ReconnectPolicy};
use crate::pipeline::{ApiClient, ApiError, JobDetail, MapInfo, Pipeline, job_file_path};

/// Every request carries the sequence number its owner issued it under; the
/// matching reply echoes it back so late replies can be told apart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Pipeline { seq: u64 },
    Job { job_id: String, seq: u64 },
    Log { job_id: String, seq: u64, poll: bool },
    Files { job_id: String, seq: u64 },
    /// `file_path` is relative to the job directory.
    MapInfo { job_id: String, seq: u64, file_path: String },
    Analysis { job_id: String, seq: u64 },
}

#[derive(Debug)]
pub enum Reply {
    Pipeline {
        seq: u64,
        result: Result<Pipeline, ApiError>,
    },
    Job {
        job_id: String,
        seq: u64,
        result: Result<JobDetail, ApiError>,
    },
    Log {
        job_id: String,
        seq: u64,
        poll: bool,
        result: Result<String, ApiError>,
    },
    Files {
        job_id: String,
        seq: u64,
        result: Result<Vec<String>, ApiError>,
    },
    MapInfo {
        job_id: String,
        seq: u64,
        file_path: String,
        info: Option<MapInfo>,
    },
    Analysis {
        job_id: String,
        seq: u64,
        result: Result<Option<Value>, ApiError>,
    },
}

#[derive(Debug)]
pub enum BackendEvent {
    Reply(Reply),
    Live(LiveMessage),
    Connection(ConnectionState),
}

/// Sends an event to the UI and wakes it up.
#[derive(Clone)]
struct Notifier {
    tx: Sender<BackendEvent>,
    ctx: Context,
}

impl Notifier {
    fn send(&self, event: BackendEvent) {
        if self.tx.send(event).is_ok() {
            self.ctx.request_repaint();
        }
    }
}

pub struct Backend {
    runtime: Runtime,
    api: ApiClient,
    notifier: Notifier,
    events: Receiver<BackendEvent>,
    live: Option<LiveSyncClient>,
}

impl Backend {
    pub fn new(api: ApiClient, ctx: Context) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("relion-dash-io")
            .enable_all()
            .build()
            .context("failed to start the I/O runtime")?;
        let (tx, events) = mpsc::channel();

        Ok(Self {
            runtime,
            api,
            notifier: Notifier { tx, ctx },
            events,
            live: None,
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn request(&self, request: Request) {
        tracing::debug!(?request, "issuing request");
        let api = self.api.clone();
        let notifier = self.notifier.clone();

        self.runtime.spawn(async move {
            let reply = match request {
                Request::Pipeline { seq } => Reply::Pipeline {
                    seq,
                    result: api.fetch_pipeline().await,
                },
                Request::Job { job_id, seq } => {
                    let result = api.fetch_job(&job_id).await;
                    Reply::Job {
                        job_id,
                        seq,
                        result,
                    }
                }
                Request::Log { job_id, seq, poll } => {
                    let result = api.fetch_log(&job_id).await;
                    Reply::Log {
                        job_id,
                        seq,
                        poll,
                        result,
                    }
                }
                Request::Files { job_id, seq } => {
                    let result = api.fetch_files(&job_id).await;
                    Reply::Files {
                        job_id,
                        seq,
                        result,
                    }
                }
                Request::MapInfo {
                    job_id,
                    seq,
                    file_path,
                } => {
                    let info = api
                        .fetch_map_info(&job_file_path(&job_id, &file_path))
                        .await;
                    Reply::MapInfo {
                        job_id,
                        seq,
                        file_path,
                        info,
                    }
                }
                Request::Analysis { job_id, seq } => {
                    let result = api.fetch_analysis(&job_id).await;
                    Reply::Analysis {
                        job_id,
                        seq,
                        result,
                    }
                }
            };
            notifier.send(BackendEvent::Reply(reply));
        });
    }

    /// Starts the push-channel client, replacing (and closing) any previous one.
    pub fn start_live(&mut self, url: String, policy: ReconnectPolicy) {
        let message_notifier = self.notifier.clone();
        let status_notifier = self.notifier.clone();

        let client = LiveSyncClient::spawn(
            self.runtime.handle(),
            url,
            policy,
            move |message| message_notifier.send(BackendEvent::Live(message)),
            move |state| status_notifier.send(BackendEvent::Connection(state)),
        );

        if let Some(previous) = self.live.replace(client) {
            previous.close();
        }
    }

    pub fn stop_live(&mut self) {
        if let Some(client) = self.live.take() {
            tracing::debug!(finished = client.is_finished(), "stopping live channel");
            client.close();
        }
    }

    pub fn poll_event(&self) -> Option<BackendEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                tracing::warn!("backend event channel disconnected");
                None
            }
        }
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        self.stop_live();
    }
}
