use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, vec2};

use crate::net::Role;

pub(super) fn role_color(role: Role) -> Color32 {
    match role {
        Role::Router => Color32::from_rgb(246, 206, 104),
        Role::Local => Color32::from_rgb(103, 196, 255),
        Role::Other => Color32::from_rgb(120, 205, 160),
    }
}

pub(super) fn node_radius(role: Role) -> f32 {
    match role {
        Role::Router => 16.0,
        _ => 11.0,
    }
}

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

pub(super) fn draw_background(painter: &Painter, rect: Rect) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = 56.0;
    let grid_stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = rect.left() + (rect.center().x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment(
            [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
            grid_stroke,
        );
        x += step;
    }

    let mut y = rect.top() + (rect.center().y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment(
            [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
            grid_stroke,
        );
        y += step;
    }
}

pub(super) fn draw_legend(painter: &Painter, rect: Rect) {
    let entries = [Role::Router, Role::Local, Role::Other];
    let row_height = 18.0;
    let origin = rect.left_bottom()
        + vec2(12.0, -(entries.len() as f32 * row_height) - 8.0);

    for (row, role) in entries.into_iter().enumerate() {
        let y = origin.y + (row as f32 * row_height);
        painter.circle_filled(Pos2::new(origin.x + 6.0, y + 6.0), 6.0, role_color(role));
        painter.text(
            Pos2::new(origin.x + 18.0, y + 6.0),
            Align2::LEFT_CENTER,
            role.label(),
            FontId::proportional(12.0),
            Color32::from_gray(200),
        );
    }
}
