//! Scatter tab: sample positions coloured by their phase under the selected
//! period

use eframe::egui;
use egui_plot::{Plot, PlotPoints, Points};

use super::PeriodicityApp;
use crate::core::views::{Color, OutputFunction};
use crate::core::{format_duration, PhasedDatapoint};
use crate::theme::{colors, to_color32};

/// Colour steps the phase is quantised to; one plot series per step
const PHASE_STEPS: usize = 36;

/// Group samples by quantised output colour, preserving input order
pub(crate) fn phase_groups(
    points: impl Iterator<Item = PhasedDatapoint>,
    output: &OutputFunction,
) -> Vec<(Color, Vec<[f64; 2]>)> {
    let mut groups: Vec<Vec<[f64; 2]>> = vec![Vec::new(); PHASE_STEPS];
    for p in points {
        let step = ((output.value(p.phase) * PHASE_STEPS as f64) as usize).min(PHASE_STEPS - 1);
        groups[step].push([p.x as f64, p.y as f64]);
    }
    groups
        .into_iter()
        .enumerate()
        .filter(|(_, g)| !g.is_empty())
        .map(|(step, g)| {
            let t = (step as f64 + 0.5) / PHASE_STEPS as f64;
            (output.scheme.interpolate(t), g)
        })
        .collect()
}

impl PeriodicityApp {
    pub(crate) fn render_scatter(&mut self, ui: &mut egui::Ui) {
        let Some(ds) = self.session.as_ref().and_then(|s| s.dataset()) else {
            return;
        };

        ui.label(
            egui::RichText::new(format!(
                "{} samples, phase under {}",
                ds.datapoints().len(),
                format_duration(ds.period(), 4, true)
            ))
            .color(colors::TEXT_SECONDARY)
            .size(14.0),
        );

        let groups = phase_groups(ds.data_with_phase(), &self.output);

        Plot::new("phase_scatter")
            .show_axes([true, true])
            .show_grid(false)
            .data_aspect(1.0)
            .show_background(false)
            .label_formatter(|_name, value| format!("x={:.3} y={:.3}", value.x, value.y))
            .show(ui, |plot_ui| {
                for (color, points) in groups {
                    plot_ui.points(
                        Points::new(PlotPoints::from(points))
                            .color(to_color32(color))
                            .radius(2.0)
                            .filled(true),
                    );
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::views::ColorScheme;

    fn point(x: f32, phase: f64) -> PhasedDatapoint {
        PhasedDatapoint { x, y: 0.0, value: 1.0, time: 0.0, phase }
    }

    #[test]
    fn test_phase_groups() {
        let output = OutputFunction::new(ColorScheme::Viridis);
        let pts = vec![point(1.0, 0.0), point(2.0, 0.001), point(3.0, 0.5), point(4.0, 0.999)];
        let groups = phase_groups(pts.into_iter(), &output);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].1, vec![[1.0, 0.0], [2.0, 0.0]]);
        assert_eq!(groups[1].1, vec![[3.0, 0.0]]);
        assert_eq!(groups[2].1, vec![[4.0, 0.0]]);
    }

    #[test]
    fn test_phase_groups_follow_offset() {
        let output = OutputFunction { phase: 0.5, scheme: ColorScheme::Viridis };
        let groups = phase_groups(vec![point(1.0, 0.0)].into_iter(), &output);
        let plain = OutputFunction::new(ColorScheme::Viridis);
        let shifted = phase_groups(vec![point(1.0, 0.5)].into_iter(), &plain);
        assert_eq!(groups[0].0, shifted[0].0);
    }
}
