//! Period explorer tab: text field, time slider, scented heat map and its
//! hover popup

use eframe::egui;
use egui::{pos2, vec2, Pos2};
use tracing::warn;

use super::painter::{local, paint};
use super::PeriodicityApp;
use crate::core::units::format_duration;
use crate::core::views::popup::{PopupGeometry, MARGIN, PADDING};
use crate::core::views::scented::{MIN_HEIGHT, MIN_WIDTH};
use crate::core::views::{Anchor, DrawCommand, Point, TextStyle};
use crate::core::DatasetError;
use crate::theme::colors;

const SLIDER_HEIGHT: f32 = 36.0;

/// Pointer position where the current press started, widget-local
fn press_origin(ui: &egui::Ui, origin: Pos2) -> Option<Point> {
    ui.input(|i| i.pointer.press_origin()).map(|p| local(origin, p))
}

fn latest_pos(ui: &egui::Ui, origin: Pos2) -> Option<Point> {
    ui.input(|i| i.pointer.latest_pos()).map(|p| local(origin, p))
}

/// Scroll in DOM convention: positive moves down
fn wheel_delta(ui: &egui::Ui) -> f32 {
    -ui.input(|i| i.raw_scroll_delta.y)
}

fn log_failure<T>(result: Result<T, DatasetError>, what: &str) {
    if let Err(e) = result {
        warn!(error = %e, action = what, "Interaction rejected");
    }
}

impl PeriodicityApp {
    pub(crate) fn render_explorer(&mut self, ui: &mut egui::Ui, now: f64) {
        self.render_period_input(ui);
        ui.add_space(4.0);
        self.render_time_slider(ui);
        ui.add_space(8.0);
        self.render_scented(ui, now);
    }

    fn render_period_input(&mut self, ui: &mut egui::Ui) {
        let Some(ds) = self.session.as_ref().and_then(|s| s.dataset()) else {
            return;
        };
        self.slider.sync(ds);

        let mut submit = false;
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Period").color(colors::TEXT_SECONDARY));
            let response = ui.add(egui::TextEdit::singleline(&mut self.slider.text).desired_width(220.0));
            if response.lost_focus() {
                if ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    submit = true;
                } else {
                    self.slider.revert_text(ds);
                }
            }
            let metric = if self.scented.settings.use_vector_strength {
                format!("vector strength {:.4}", ds.vectorstrengths()[ds.index()])
            } else {
                format!("entropy {:.4}", ds.entropies()[ds.index()])
            };
            ui.label(
                egui::RichText::new(format!("#{} of {}  {metric}", ds.index() + 1, ds.period_count()))
                    .color(colors::TEXT_MUTED),
            );
        });
        if submit {
            self.submit_period_text();
        }
    }

    fn render_time_slider(&mut self, ui: &mut egui::Ui) {
        let Some(ds) = self.session.as_mut().and_then(|s| s.dataset_mut()) else {
            return;
        };
        let width = ui.available_width().max(MIN_WIDTH);
        let (response, painter) = ui.allocate_painter(vec2(width, SLIDER_HEIGHT), egui::Sense::click_and_drag());
        let origin = response.rect.min;
        self.slider.set_size([width, SLIDER_HEIGHT]);
        self.slider.sync(ds);

        if response.drag_started() {
            if let Some(p) = press_origin(ui, origin) {
                self.slider.on_press(ds, p);
            }
        }
        if response.dragged() && self.slider.is_dragging() {
            if let Some(p) = latest_pos(ui, origin) {
                log_failure(self.slider.on_drag(ds, p.x), "slider drag");
            }
        }
        if response.drag_stopped() {
            if let Some(p) = latest_pos(ui, origin) {
                log_failure(self.slider.on_release(ds, p.x), "slider release");
            }
        }
        if response.clicked() {
            if let Some(p) = response.interact_pointer_pos() {
                log_failure(self.slider.on_click(ds, local(origin, p)), "slider click");
            }
        }

        match response.hover_pos() {
            Some(p) => {
                self.slider.on_hover(ds, local(origin, p));
                let delta = wheel_delta(ui);
                log_failure(self.slider.on_wheel(ds, delta), "slider wheel");
            }
            None => self.slider.on_leave(),
        }

        paint(&painter, origin, &self.slider.render(ds));
        if let Some(tooltip) = self.slider.tooltip() {
            response.on_hover_text_at_pointer(tooltip);
        }
    }

    fn render_scented(&mut self, ui: &mut egui::Ui, now: f64) {
        let Some(ds) = self.session.as_mut().and_then(|s| s.dataset_mut()) else {
            return;
        };
        let available = ui.available_size();
        let size = [available.x.max(MIN_WIDTH), available.y.max(MIN_HEIGHT)];
        let (response, painter) = ui.allocate_painter(vec2(size[0], size[1]), egui::Sense::click_and_drag());
        let origin = response.rect.min;
        self.scented.set_size(size);
        self.scented_origin = origin;

        if response.drag_started() {
            if let Some(p) = press_origin(ui, origin) {
                self.scented.on_legend_press(ds, &self.output, p);
            }
        }
        if response.dragged() {
            if let Some(p) = latest_pos(ui, origin) {
                self.scented.on_legend_drag(ds, &self.output, p);
            }
        }
        if response.drag_stopped() {
            if let Some(p) = latest_pos(ui, origin) {
                self.scented.on_legend_release(ds, &mut self.output, p);
            }
        }
        if response.clicked() {
            if let Some(p) = response.interact_pointer_pos() {
                log_failure(self.scented.on_click(ds, local(origin, p), now), "heat map click");
            }
        }

        match response.hover_pos() {
            Some(p) if !self.scented.is_dragging_legend() => {
                let p = local(origin, p);
                self.scented.on_hover(ds, p, now);
                let delta = wheel_delta(ui);
                log_failure(self.scented.on_wheel(ds, p, delta, now), "heat map wheel");
            }
            Some(_) => {}
            None => self.scented.on_leave(),
        }

        let cmds = self.scented.render(ds, &self.output, size);
        paint(&painter, origin, &cmds);
    }

    /// Bin popup over everything else, placed left of the pointer
    pub(crate) fn render_popup(&mut self, ctx: &egui::Context, now: f64) {
        let Some(ds) = self.session.as_ref().and_then(|s| s.dataset()) else {
            return;
        };
        if !self.scented.popup.is_visible(now) {
            return;
        }
        let Some(geo) = PopupGeometry::new(ds, self.scented.popup.period()) else {
            return;
        };

        let size = [geo.width, geo.height];
        let mut popup = self.scented.popup.clone();
        let pointer = popup.pointer();
        popup.set_pointer(Point::new(pointer.x + self.scented_origin.x, pointer.y + self.scented_origin.y));
        let viewport = ctx.screen_rect();
        let place = popup.placement(size, [viewport.width(), viewport.height()]);

        let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::Tooltip, egui::Id::new("bin_popup")));
        let canvas = pos2(place.x + MARGIN + PADDING, place.y + MARGIN + PADDING);
        let mut cmds = vec![popup.frame(size, place)];
        cmds.push(DrawCommand::Text {
            pos: Point::new(place.x + MARGIN + PADDING, place.y + MARGIN + PADDING / 2.0),
            text: format!("{} per row", format_duration(popup.period(), 4, true)),
            style: TextStyle { anchor: Anchor::Start, ..Default::default() },
        });
        paint(&painter, Pos2::ZERO, &cmds);
        paint(&painter, canvas, &popup.render(ds));
    }
}
