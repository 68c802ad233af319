use eframe::egui::{self, RichText, Ui};
use token_cloud::cloud::{ChargeMode, CollisionMode};

use super::ViewModel;

const MAX_LISTED_MATCHES: usize = 24;

impl ViewModel {
    pub(super) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Layout Controls");
        ui.separator();
        ui.add_space(4.0);

        let mut changed = false;

        ui.label("Search tokens")
            .on_hover_text("Fuzzy-highlight matching tokens without touching the layout.");
        ui.text_edit_singleline(&mut self.search);

        ui.separator();

        changed |= ui
            .add(
                egui::Slider::new(&mut self.config.radius_fraction, 0.15..=0.45)
                    .text("Document ring radius")
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text("Radius of the document ring as a fraction of the canvas width.")
            .changed();

        ui.horizontal_wrapped(|ui| {
            changed |= ui
                .selectable_value(&mut self.config.charge_mode, ChargeMode::Frequency, "Frequency charge")
                .on_hover_text("More frequent tokens repel more strongly.")
                .changed();
            changed |= ui
                .selectable_value(
                    &mut self.config.charge_mode,
                    ChargeMode::Constant {
                        charge: self.constant_charge,
                    },
                    "Constant charge",
                )
                .on_hover_text("Every node repels with the same charge.")
                .changed();
        });
        if matches!(self.config.charge_mode, ChargeMode::Constant { .. }) {
            let charge_slider = ui.add(
                egui::Slider::new(&mut self.constant_charge, -8000.0..=-200.0)
                    .text("Charge")
                    .clamping(egui::SliderClamping::Always),
            );
            if charge_slider.changed() {
                self.config.charge_mode = ChargeMode::Constant {
                    charge: self.constant_charge,
                };
                changed = true;
            }
        }

        ui.collapsing("Physics tuning", |ui| {
            changed |= ui
                .add(
                    egui::Slider::new(&mut self.config.friction, 0.5..=0.98)
                        .text("Friction")
                        .clamping(egui::SliderClamping::Always),
                )
                .on_hover_text("Share of velocity kept after each step.")
                .changed();
            changed |= ui
                .add(
                    egui::Slider::new(&mut self.config.gravity, 0.0..=0.5)
                        .text("Gravity")
                        .clamping(egui::SliderClamping::Always),
                )
                .on_hover_text("Pull of every token towards the canvas centre.")
                .changed();
            changed |= ui
                .add(
                    egui::Slider::new(&mut self.config.link_distance, 5.0..=120.0)
                        .text("Link distance")
                        .clamping(egui::SliderClamping::Always),
                )
                .on_hover_text("Rest length of the springs between documents and tokens.")
                .changed();
            changed |= ui
                .add(
                    egui::Slider::new(&mut self.config.spring_coefficient, 0.05..=1.0)
                        .text("Spring stiffness")
                        .clamping(egui::SliderClamping::Always),
                )
                .changed();
            changed |= ui
                .checkbox(&mut self.config.contain_within_margins, "Keep tokens inside margins")
                .changed();
        });

        ui.collapsing("Label collisions", |ui| {
            changed |= ui
                .checkbox(&mut self.collision_enabled, "Push overlapping labels apart")
                .changed();
            ui.add_enabled_ui(self.collision_enabled, |ui| {
                changed |= ui
                    .add(
                        egui::Slider::new(&mut self.collision_strength, 0.05..=1.0)
                            .text("Strength")
                            .clamping(egui::SliderClamping::Always),
                    )
                    .on_hover_text("Share of each overlap cleared per tick.")
                    .changed();
            });
        });

        ui.separator();
        ui.checkbox(&mut self.live_physics, "Live physics simulation");
        ui.checkbox(&mut self.show_edges, "Show edges");
        ui.checkbox(&mut self.show_bounding_boxes, "Show label boxes");
        if ui.button("Restart layout").clicked() {
            changed = true;
        }

        if changed {
            self.config.collision = if self.collision_enabled {
                CollisionMode::BoundingBox {
                    strength: self.collision_strength,
                }
            } else {
                CollisionMode::Disabled
            };
            self.layout_dirty = true;
        }

        ui.separator();
        self.draw_status(ui);
        self.draw_search_results(ui);
    }

    fn draw_status(&self, ui: &mut Ui) {
        let report = self.last_report;
        ui.label(RichText::new(format!("status: {}", self.cloud.status().label())).strong());
        ui.label(format!("step: {}", report.step));
        ui.label(format!("alpha: {:.4}", report.alpha));
        ui.label(format!("kinetic energy: {:.2}", report.kinetic_energy));
        ui.label(format!("collisions resolved: {}", report.collisions_resolved));
    }

    fn draw_search_results(&mut self, ui: &mut Ui) {
        let Some(matches) = self.cached_matches() else {
            return;
        };
        let Some(graph) = self.cloud.state().map(|state| state.graph()) else {
            return;
        };

        ui.separator();
        ui.label(format!("{} matching tokens", matches.len()));
        let mut labels = matches
            .iter()
            .filter_map(|key| graph.node(*key).map(|node| node.label()))
            .collect::<Vec<_>>();
        labels.sort_unstable();
        for label in labels.into_iter().take(MAX_LISTED_MATCHES) {
            ui.label(label);
        }
    }
}
