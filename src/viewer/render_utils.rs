use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke};

const GRID_STEP: f32 = 56.0;

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, surface: Option<Rect>) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let grid = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));
    let mut x = rect.left() + GRID_STEP;
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], grid);
        x += GRID_STEP;
    }

    let mut y = rect.top() + GRID_STEP;
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], grid);
        y += GRID_STEP;
    }

    if let Some(surface) = surface {
        draw_outline(
            painter,
            surface,
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(106, 198, 255, 55)),
        );
    }
}

pub(super) fn draw_outline(painter: &Painter, rect: Rect, stroke: Stroke) {
    let top_left = rect.left_top();
    let top_right = rect.right_top();
    let bottom_right = rect.right_bottom();
    let bottom_left = rect.left_bottom();

    painter.line_segment([top_left, top_right], stroke);
    painter.line_segment([top_right, bottom_right], stroke);
    painter.line_segment([bottom_right, bottom_left], stroke);
    painter.line_segment([bottom_left, top_left], stroke);
}

/// Colour for a token label; `t` is its font size normalised to `[0, 1]`.
pub(super) fn token_color(t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let r = (150.0 + (95.0 * t)) as u8;
    let g = (160.0 + (46.0 * t)) as u8;
    let b = (172.0 - (79.0 * t)) as u8;
    Color32::from_rgb(r, g, b)
}
