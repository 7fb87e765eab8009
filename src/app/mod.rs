//! Periodicity explorer desktop app
//!
//! One dataset session at a time. Frames from the service socket are drained
//! at the start of every egui frame under a time budget; views are re-rendered
//! from the dataset every frame.

mod explorer;
mod header;
pub mod painter;
mod scatter;
mod settings;
mod suggestions;

use eframe::egui;
use std::sync::mpsc::Receiver;
use tracing::{error, info, warn};

use crate::config::Endpoints;
use crate::core::views::{OutputFunction, PreviewStyle, ScentedSettings, ScentedWidget, TimeSlider};
use crate::core::{
    parse_upload, DatasetSession, ExactSelection, PeriodSuggestor, SessionEvent, SuggestorConfig,
};
use crate::discovery::{list_datasets_in_background, DatasetChoice, DiscoveryError};
use crate::theme::{colors, paper_visuals};
use crate::time::now_seconds;
use crate::websocket_native::ServiceClient;
use crate::ws_state::ConnectionState;

/// Active tab in the main area
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveTab {
    #[default]
    Explorer,
    Scatter,
}

pub struct PeriodicityApp {
    endpoints: Endpoints,
    discovery: Option<Receiver<Result<Vec<DatasetChoice>, DiscoveryError>>>,
    pub(crate) choices: Vec<DatasetChoice>,
    pub(crate) selected_choice: Option<String>,
    pub(crate) upload_path: String,

    pub(crate) session: Option<DatasetSession<ServiceClient>>,
    pub(crate) suggestor: PeriodSuggestor,
    pub(crate) scented: ScentedWidget,
    /// Screen position of the heat map's top-left corner, last frame
    pub(crate) scented_origin: egui::Pos2,
    pub(crate) slider: TimeSlider,
    pub(crate) output: OutputFunction,
    pub(crate) preview_style: PreviewStyle,

    pub(crate) fps_counter: header::FpsCounter,
    pub(crate) active_tab: ActiveTab,
    pub(crate) show_settings: bool,
    /// Last error shown in the header
    pub(crate) last_error: Option<String>,
    /// Socket loss is reported once per session
    closed_reported: bool,
}

impl PeriodicityApp {
    pub fn new(cc: &eframe::CreationContext<'_>, initial_dataset: Option<String>) -> Self {
        cc.egui_ctx.set_visuals(paper_visuals());

        let endpoints = Endpoints::from_env();
        let discovery = Some(list_datasets_in_background(&endpoints.discovery));

        let mut app = Self {
            endpoints,
            discovery,
            choices: Vec::new(),
            selected_choice: None,
            upload_path: String::new(),
            session: None,
            suggestor: PeriodSuggestor::new(SuggestorConfig::default()),
            scented: ScentedWidget::new(ScentedSettings::default()),
            scented_origin: egui::Pos2::ZERO,
            slider: TimeSlider::default(),
            output: OutputFunction::default(),
            preview_style: PreviewStyle::default(),
            fps_counter: header::FpsCounter::new(),
            active_tab: ActiveTab::default(),
            show_settings: false,
            last_error: None,
            closed_reported: false,
        };
        if let Some(key) = initial_dataset {
            app.open_dataset(&key);
        }
        app
    }

    pub(crate) fn connection_state(&self) -> Option<ConnectionState> {
        self.session.as_ref().map(|s| s.transport().state())
    }

    fn close_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Some(ds) = session.dataset_mut() {
                self.suggestor.detach(ds);
            }
            info!(key = session.key(), "Dataset session closed");
        }
        self.suggestor.reset();
        self.closed_reported = false;
        self.last_error = None;
    }

    /// Open a session for a dataset offered by the service
    pub(crate) fn open_dataset(&mut self, key: &str) {
        self.close_session();
        let client = ServiceClient::connect(&self.endpoints.dataset_url(key));
        match DatasetSession::start(key, client) {
            Ok(session) => {
                self.selected_choice = Some(key.to_string());
                self.session = Some(session);
            }
            Err(e) => self.report(format!("Failed to start session: {e}")),
        }
    }

    /// Validate the file at `upload_path` and open an upload session for it
    pub(crate) fn upload_file(&mut self) {
        let path = self.upload_path.trim().to_string();
        let batch = match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|text| parse_upload(&text).map_err(|e| e.to_string()))
        {
            Ok(batch) => batch,
            Err(e) => {
                self.report(format!("{path}: {e}"));
                return;
            }
        };

        self.close_session();
        let client = ServiceClient::connect(&self.endpoints.upload_url());
        match DatasetSession::start_upload("upload", &batch, client) {
            Ok(session) => {
                self.selected_choice = None;
                self.session = Some(session);
            }
            Err(e) => self.report(format!("Upload failed: {e}")),
        }
    }

    pub(crate) fn report(&mut self, message: String) {
        error!(error = %message, "Reported to user");
        self.last_error = Some(message);
    }

    /// Select `period` exactly, fetching it when the dataset lacks it
    pub(crate) fn select_period_exact(&mut self, period: f64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.set_period_exact(period) {
            Ok(ExactSelection::Immediate) => {}
            Ok(ExactSelection::Pending(request_id)) => {
                info!(request_id, period, "Fetching exact period");
            }
            Err(e) => {
                if let Some(ds) = session.dataset() {
                    self.slider.revert_text(ds);
                }
                self.report(format!("Cannot select period: {e}"));
            }
        }
    }

    /// Select the period typed into the slider's text field
    pub(crate) fn submit_period_text(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match self.slider.submit(session) {
            Ok(Some(ExactSelection::Pending(request_id))) => {
                info!(request_id, text = %self.slider.text, "Fetching exact period");
            }
            Ok(_) => {}
            Err(e) => self.report(format!("Cannot select period: {e}")),
        }
    }

    fn poll_discovery(&mut self) {
        let Some(rx) = self.discovery.as_ref() else {
            return;
        };
        let Ok(result) = rx.try_recv() else {
            return;
        };
        self.discovery = None;
        match result {
            Ok(choices) => self.choices = choices,
            Err(e) => self.report(format!("Dataset discovery failed: {e}")),
        }
    }

    /// Apply incoming frames (native)
    fn process_frames(&mut self) {
        // Time-budget frame processing: yield after ~12ms to maintain 60fps.
        // Remaining frames stay in the channel for the next egui frame.
        use std::time::{Duration, Instant};
        const BUDGET: Duration = Duration::from_millis(12);
        let deadline = Instant::now() + BUDGET;

        let Some(session) = self.session.as_mut() else {
            return;
        };
        let mut events = Vec::new();
        let mut failures = Vec::new();
        loop {
            match session.transport().try_recv() {
                Ok(Some(frame)) => match session.handle_frame(frame) {
                    Ok(Some(event)) => events.push(event),
                    Ok(None) => {}
                    Err(e) => failures.push(e.to_string()),
                },
                Ok(None) => break,
                Err(e) => {
                    if !self.closed_reported {
                        self.closed_reported = true;
                        failures.push(e.to_string());
                    }
                    break;
                }
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        for event in events {
            self.on_session_event(event);
        }
        for failure in failures {
            warn!(error = %failure, "Dataset session error");
            self.last_error = Some(failure);
        }
    }

    fn on_session_event(&mut self, event: SessionEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match event {
            SessionEvent::Loaded => {
                if let Some(ds) = session.dataset_mut() {
                    self.suggestor.attach(ds);
                    self.slider.sync(ds);
                }
            }
            SessionEvent::Supplement(data) => {
                if let Some(ds) = session.dataset() {
                    self.suggestor.accept(&data, ds);
                }
            }
            SessionEvent::Replaced(attribute) => {
                info!(attribute = attribute.label(), "Display attribute applied");
                self.preview_style.attribute = attribute;
            }
            SessionEvent::Spliced { .. } | SessionEvent::ExactPeriodSelected { .. } => {}
        }
    }

    fn poll_suggestor(&mut self, now: f64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        self.suggestor.set_use_vector_strength(self.scented.settings.use_vector_strength);
        self.preview_style.use_vector_strength = self.scented.settings.use_vector_strength;
        if let Err(e) = self.suggestor.poll(now, session) {
            warn!(error = %e, "Suggestion refresh failed");
        }
    }
}

impl eframe::App for PeriodicityApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Popup delay, debounce and socket traffic all need regular frames
        ctx.request_repaint();

        self.poll_discovery();
        self.process_frames();
        let now = now_seconds();
        self.poll_suggestor(now);

        egui::TopBottomPanel::top("header")
            .frame(egui::Frame::new().fill(colors::BG_ELEVATED).inner_margin(4.0))
            .show(ctx, |ui| {
                self.render_header(ui);
            });

        if self.show_settings {
            self.render_settings(ctx);
        }

        if self.session.as_ref().is_some_and(|s| s.is_ready()) {
            self.render_suggestions(ctx);
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(colors::BG_PRIMARY).inner_margin(8.0))
            .show(ctx, |ui| {
                if !self.session.as_ref().is_some_and(|s| s.is_ready()) {
                    self.render_placeholder(ui);
                    return;
                }
                match self.active_tab {
                    ActiveTab::Explorer => self.render_explorer(ui, now),
                    ActiveTab::Scatter => self.render_scatter(ui),
                }
            });

        if self.active_tab == ActiveTab::Explorer {
            self.render_popup(ctx, now);
        }
    }
}

impl PeriodicityApp {
    fn render_placeholder(&self, ui: &mut egui::Ui) {
        ui.centered_and_justified(|ui| {
            let text = match self.connection_state() {
                None => "Pick a dataset or upload a file".to_string(),
                Some(ConnectionState::Connected) => "Waiting for the dataset...".to_string(),
                Some(state) => state.to_string(),
            };
            ui.label(egui::RichText::new(text).color(colors::TEXT_MUTED));
        });
    }
}
