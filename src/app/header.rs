//! Header bar with dataset controls, tabs, and status

use eframe::egui;
use crate::core::DisplayAttribute;
use crate::theme::colors;
use crate::time::now_seconds;
use crate::ws_state::ConnectionState;
use super::{ActiveTab, PeriodicityApp};

impl PeriodicityApp {
    pub(crate) fn render_header(&mut self, ui: &mut egui::Ui) {
        self.fps_counter.tick();

        ui.horizontal(|ui| {
            let settings_text = if self.show_settings { "Settings <<<" } else { "Settings >>>" };
            if ui.button(settings_text).clicked() {
                self.show_settings = !self.show_settings;
            }

            ui.add_space(10.0);
            self.render_dataset_picker(ui);
            self.render_attribute_picker(ui);

            ui.add_space(10.0);

            const TABS: &[(ActiveTab, &str)] = &[
                (ActiveTab::Explorer, "Periods"),
                (ActiveTab::Scatter, "Scatter"),
            ];
            for &(tab, label) in TABS {
                let color = if self.active_tab == tab {
                    colors::TEXT_PRIMARY
                } else {
                    colors::TEXT_MUTED
                };
                if ui
                    .selectable_label(self.active_tab == tab, egui::RichText::new(label).color(color))
                    .clicked()
                {
                    self.active_tab = tab;
                }
            }

            // RIGHT: status (right-to-left order)
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(
                    egui::RichText::new(format!("{:.0} fps", self.fps_counter.fps()))
                        .color(colors::TEXT_SECONDARY),
                );

                if let Some(session) = &self.session {
                    if session.in_flight() > 0 {
                        ui.label(egui::RichText::new("/").color(colors::TEXT_MUTED));
                        ui.label(
                            egui::RichText::new(format!("{} pending", session.in_flight()))
                                .color(colors::TEXT_MUTED),
                        );
                    }
                    if let Some(ds) = session.dataset() {
                        ui.label(egui::RichText::new("/").color(colors::TEXT_MUTED));
                        ui.label(
                            egui::RichText::new(format!("{} periods", ds.period_count()))
                                .color(colors::TEXT_MUTED),
                        );
                        ui.label(egui::RichText::new("/").color(colors::TEXT_MUTED));
                        ui.label(
                            egui::RichText::new(format!("{} points", ds.datapoints().len()))
                                .color(colors::TEXT_MUTED),
                        );
                    }
                }

                ui.add_space(10.0);
                if let Some(state) = self.connection_state() {
                    let status_color = match state {
                        ConnectionState::Connected => colors::OK,
                        ConnectionState::Connecting => colors::PENDING,
                        ConnectionState::Disconnected | ConnectionState::Error(_) => colors::FAILED,
                    };
                    let text = match &state {
                        ConnectionState::Error(_) => "Error".to_string(),
                        other => other.to_string(),
                    };
                    let label = ui.colored_label(status_color, text);
                    if let ConnectionState::Error(e) = &state {
                        label.on_hover_text(e);
                    }
                }

                if let Some(error) = self.last_error.clone() {
                    ui.add_space(10.0);
                    if ui.small_button("x").clicked() {
                        self.last_error = None;
                    }
                    ui.colored_label(colors::FAILED, error);
                }
            });
        });
    }

    fn render_dataset_picker(&mut self, ui: &mut egui::Ui) {
        let current = self
            .selected_choice
            .as_deref()
            .and_then(|key| self.choices.iter().find(|c| c.key == key))
            .map(|c| c.title.clone())
            .or_else(|| self.session.as_ref().map(|s| s.key().to_string()))
            .unwrap_or_else(|| "Dataset...".to_string());

        let mut picked = None;
        egui::ComboBox::from_id_salt("dataset")
            .selected_text(current)
            .width(200.0)
            .show_ui(ui, |ui| {
                if self.choices.is_empty() {
                    ui.label(egui::RichText::new("No datasets offered").color(colors::TEXT_MUTED));
                }
                for choice in &self.choices {
                    let selected = self.selected_choice.as_deref() == Some(choice.key.as_str());
                    let response = ui.selectable_label(selected, &choice.title);
                    let response = if choice.description.is_empty() {
                        response
                    } else {
                        response.on_hover_text(&choice.description)
                    };
                    if response.clicked() {
                        picked = Some(choice.key.clone());
                    }
                }
            });
        if let Some(key) = picked {
            self.open_dataset(&key);
        }

        ui.add(egui::TextEdit::singleline(&mut self.upload_path).hint_text("points.json").desired_width(140.0));
        if ui.button("Upload").clicked() {
            self.upload_file();
        }
    }

    fn render_attribute_picker(&mut self, ui: &mut egui::Ui) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(current) = session.display_attribute() else {
            return;
        };
        let mut chosen = current;
        egui::ComboBox::from_id_salt("attribute")
            .selected_text(current.label())
            .show_ui(ui, |ui| {
                for &attribute in DisplayAttribute::ALL {
                    ui.selectable_value(&mut chosen, attribute, attribute.label());
                }
            });
        if chosen != current {
            if let Err(e) = session.set_display_attribute(chosen) {
                self.report(format!("Cannot change attribute: {e}"));
            }
        }
    }
}

/// FPS counter using platform-agnostic time
pub struct FpsCounter {
    frames: Vec<f64>,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            frames: Vec::with_capacity(60),
        }
    }

    pub fn tick(&mut self) {
        self.push(now_seconds() * 1000.0);
    }

    fn push(&mut self, millis: f64) {
        self.frames.push(millis);
        if self.frames.len() > 60 {
            self.frames.remove(0);
        }
    }

    pub fn fps(&self) -> f64 {
        let (Some(first), Some(last)) = (self.frames.first(), self.frames.last()) else {
            return 0.0;
        };
        let elapsed = last - first;
        if self.frames.len() < 2 || elapsed == 0.0 {
            return 0.0;
        }
        (self.frames.len() as f64 - 1.0) / (elapsed / 1000.0)
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}
