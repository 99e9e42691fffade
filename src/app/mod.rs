use std::time::Instant;

use anyhow::Result;
use eframe::egui::{self, Context};

use crate::backend::{Backend, BackendEvent, Reply, Request};
use crate::config::Settings;
use crate::live::{ConnectionState, LiveMessage};
use crate::pipeline::ApiClient;

mod detail;
mod graph;
mod log_follow;
mod prefs;
mod render_utils;
mod selection;
mod store;
mod ui;
mod viewport;

use self::detail::DetailState;
use self::log_follow::LogFollower;
use self::prefs::Preferences;
use self::render_utils::{Palette, apply_theme};
use self::selection::SelectionController;
use self::store::{PipelineStore, SnapshotChange};
use self::viewport::ViewportController;

pub struct DashboardApp {
    backend: Backend,
    store: PipelineStore,
    selection: SelectionController,
    viewport: ViewportController,
    details: DetailState,
    log: LogFollower,
    prefs: Preferences,
    palette: Palette,
    connection: ConnectionState,
    sidebar_filter: String,
}

impl DashboardApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: Settings) -> Result<Self> {
        let prefs = Preferences::load(cc.storage);
        apply_theme(&cc.egui_ctx, prefs.theme);

        let api = ApiClient::new(settings.endpoints.api_base.clone());
        let backend = Backend::new(api, cc.egui_ctx.clone())?;

        let mut app = Self {
            backend,
            store: PipelineStore::new(settings.layout),
            selection: SelectionController::default(),
            viewport: ViewportController::new(settings.viewport),
            details: DetailState::default(),
            log: LogFollower::new(settings.log_poll),
            palette: Palette::for_theme(prefs.theme),
            prefs,
            connection: ConnectionState::Connecting,
            sidebar_filter: String::new(),
        };

        tracing::info!(
            api = %settings.endpoints.api_base,
            live = %settings.endpoints.live_url,
            "starting dashboard"
        );
        app.refetch_pipeline();
        app.backend
            .start_live(settings.endpoints.live_url, settings.reconnect);
        Ok(app)
    }

    fn refetch_pipeline(&mut self) {
        let seq = self.store.begin_fetch();
        self.backend.request(Request::Pipeline { seq });
    }

    fn drain_events(&mut self, now: Instant) {
        while let Some(event) = self.backend.poll_event() {
            match event {
                BackendEvent::Live(message) => self.handle_live(message),
                BackendEvent::Connection(state) => {
                    tracing::debug!(%state, "live connection state");
                    self.connection = state;
                }
                BackendEvent::Reply(reply) => self.handle_reply(reply, now),
            }
        }
    }

    fn handle_live(&mut self, message: LiveMessage) {
        if let Some(seq) = self.store.on_live_message(&message) {
            self.backend.request(Request::Pipeline { seq });
            return;
        }

        match message {
            LiveMessage::LogLine { job_id, line } => {
                self.log.on_log_line(&job_id, &line);
            }
            other => tracing::debug!(kind = other.kind(), "ignoring live message"),
        }
    }

    fn handle_reply(&mut self, reply: Reply, now: Instant) {
        match reply {
            Reply::Pipeline { seq, result } => {
                let change = self.store.apply_fetch(seq, result);
                if change == SnapshotChange::Unchanged {
                    return;
                }
                if change == SnapshotChange::NewProject {
                    self.viewport.reset_centering();
                }

                self.selection.refresh_edges(self.store.graph());
                if let Some(selected) = self.selection.selected() {
                    let node = self.store.node(selected);
                    self.details.sync_node(node);
                    self.log.sync_status(node.map(|node| node.status), now);
                }
            }
            Reply::Log {
                job_id,
                seq,
                poll,
                result,
            } => {
                self.log.apply_fetch(&job_id, seq, poll, result);
            }
            reply => {
                let is_file_list = matches!(reply, Reply::Files { .. });
                if self.details.apply(reply)
                    && is_file_list
                    && let Some(request) = self.details.default_map_request()
                {
                    self.backend.request(request);
                }
            }
        }
    }

    pub(in crate::app) fn select(&mut self, id: Option<String>) {
        if !self.selection.select(id, self.store.graph()) {
            return;
        }

        let selected = self.selection.selected();
        let node = selected.and_then(|id| self.store.node(id));
        let mut requests = self.details.reset_for(selected, node);
        requests.extend(
            self.log
                .select(selected, node.map(|node| node.status), Instant::now()),
        );

        for request in requests {
            self.backend.request(request);
        }
    }

    pub(in crate::app) fn request(&self, request: Option<Request>) {
        if let Some(request) = request {
            self.backend.request(request);
        }
    }

    fn tick_log_poll(&mut self, ctx: &Context, now: Instant) {
        if let Some(request) = self.log.tick(now) {
            self.backend.request(request);
        }
        if let Some(wait) = self.log.next_poll_in(now) {
            ctx.request_repaint_after(wait);
        }
    }

    fn toggle_theme(&mut self, ctx: &Context) {
        self.prefs.toggle_theme();
        self.palette = Palette::for_theme(self.prefs.theme);
        apply_theme(ctx, self.prefs.theme);
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &Context, frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.drain_events(now);
        self.tick_log_poll(ctx, now);

        let mut theme_toggled = false;
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| self.draw_top_bar(ui, &mut theme_toggled));
        if theme_toggled {
            self.toggle_theme(ctx);
        }

        egui::SidePanel::left("jobs")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| self.draw_sidebar(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_split(ui));

        if self.prefs.is_dirty()
            && let Some(storage) = frame.storage_mut()
        {
            self.prefs.save(storage);
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        self.prefs.save(storage);
    }
}
