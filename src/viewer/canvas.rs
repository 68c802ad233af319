use std::collections::HashSet;

use eframe::egui::{Align2, Color32, FontId, Painter, Sense, Stroke, Ui, Vec2, vec2};
use token_cloud::{BoundingBox, Frame, Node, NodeKey};

use super::ViewModel;
use super::render_utils::{blend_color, dim_color, draw_background, draw_outline, token_color};

const DOCUMENT_RADIUS: f32 = 5.0;

pub(super) struct CanvasOptions<'a> {
    /// Screen offset of the layout surface's origin.
    pub(super) origin: Vec2,
    pub(super) font_size_range: [f32; 2],
    pub(super) show_edges: bool,
    pub(super) show_bounding_boxes: bool,
    pub(super) matches: Option<&'a HashSet<NodeKey>>,
}

/// Render hook for the live canvas: paints the frame and hands the measured
/// label rectangles back to the layout.
pub(super) fn paint_frame(painter: &Painter, frame: &mut Frame<'_>, options: &CanvasOptions<'_>) {
    let origin = options.origin;

    if options.show_edges {
        let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(128, 128, 128, 36));
        for edge in frame.edges() {
            painter.line_segment([edge.from + origin, edge.to + origin], stroke);
        }
    }

    let [min_font, max_font] = options.font_size_range;
    let font_span = (max_font - min_font).abs().max(f32::EPSILON);
    let pseudo_active = options.matches.is_some_and(|matches| !matches.is_empty());

    let mut measured = Vec::new();
    for (key, node) in frame.nodes() {
        match node {
            Node::Document(document) => {
                let position = document.center + origin;
                painter.circle_filled(position, DOCUMENT_RADIUS, Color32::GRAY);
                painter.text(
                    position + vec2(0.0, DOCUMENT_RADIUS + 4.0),
                    Align2::CENTER_TOP,
                    &document.name,
                    FontId::proportional(11.0),
                    Color32::from_gray(120),
                );
            }
            Node::Token(token) => {
                let font_size = frame.font_size(key).unwrap_or(min_font);
                let base_color = token_color((font_size - min_font.min(max_font)) / font_span);
                let is_match = options.matches.is_some_and(|matches| matches.contains(&key));
                let color = if is_match {
                    blend_color(base_color, Color32::from_rgb(103, 196, 255), 0.68)
                } else if pseudo_active {
                    dim_color(base_color, 0.3)
                } else {
                    base_color
                };

                let rect = painter.text(
                    token.position + origin,
                    Align2::CENTER_BOTTOM,
                    &token.token,
                    FontId::proportional(font_size),
                    color,
                );
                if options.show_bounding_boxes {
                    draw_outline(
                        painter,
                        rect,
                        Stroke::new(1.0, Color32::from_rgba_unmultiplied(255, 160, 190, 150)),
                    );
                }
                measured.push((key, BoundingBox::from_rect(rect.translate(-origin))));
            }
        }
    }

    for (key, bounding_box) in measured {
        frame.supply_bounding_box(key, bounding_box);
    }
}

impl ViewModel {
    pub(super) fn draw_canvas(&mut self, ui: &mut Ui) {
        let (rect, _response) = ui.allocate_exact_size(ui.available_size(), Sense::hover());
        let painter = ui.painter_at(rect);

        self.ensure_layout(rect.size());

        let origin = rect.min.to_vec2();
        let surface = self
            .cloud
            .surface()
            .map(|surface| surface.rect().translate(origin));
        draw_background(&painter, rect, surface);

        let matches = self.cached_matches();
        let options = CanvasOptions {
            origin,
            font_size_range: self.config.font_size_range,
            show_edges: self.show_edges,
            show_bounding_boxes: self.show_bounding_boxes,
            matches: matches.as_deref(),
        };

        let mut painted = false;
        if self.live_physics && self.cloud.status().is_running() {
            self.last_report = self.cloud.tick(|frame| {
                paint_frame(&painter, frame, &options);
                painted = true;
            });
            ui.ctx().request_repaint();
        }
        if !painted {
            self.cloud.render(|frame| paint_frame(&painter, frame, &options));
        }

        if let Some(error) = &self.error {
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                error,
                FontId::proportional(13.0),
                Color32::from_rgb(255, 164, 101),
            );
        }
    }
}
