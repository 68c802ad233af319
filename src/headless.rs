use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use eframe::egui::{Pos2, vec2};
use token_cloud::{BoundingBox, Frame, LayoutConfig, LayoutState, WordCloud};

const GLYPH_WIDTH_FACTOR: f32 = 0.6;
const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Lays out the documents without a window and prints the final geometry.
pub(crate) fn run(input: Option<&Path>, config: LayoutConfig, width: f32, height: f32) -> Result<()> {
    let documents = crate::load_documents(input)?;

    let mut cloud = WordCloud::new();
    cloud
        .initial_render(width, height)
        .context("invalid canvas size")?;
    cloud
        .update(&documents, &config)
        .context("failed to lay out documents")?;

    cloud.render(measure_labels);
    let report = cloud.run(measure_labels);
    tracing::info!(
        step = report.step,
        status = report.status.label(),
        "headless layout finished"
    );

    let snapshot = cloud
        .state()
        .map(LayoutState::snapshot)
        .context("layout state missing after update")?;

    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &snapshot).context("failed to write layout JSON")?;
    writeln!(out)?;
    Ok(())
}

/// Stands in for text measurement with a fixed glyph aspect ratio.
fn estimated_box(position: Pos2, label: &str, font_size: f32) -> BoundingBox {
    let glyphs = label.chars().count() as f32;
    BoundingBox::anchored(
        position,
        vec2(
            glyphs * font_size * GLYPH_WIDTH_FACTOR,
            font_size * LINE_HEIGHT_FACTOR,
        ),
    )
}

fn measure_labels(frame: &mut Frame<'_>) {
    let measured = frame
        .nodes()
        .filter_map(|(key, node)| {
            let token = node.as_token()?;
            let font_size = frame.font_size(key)?;
            Some((key, estimated_box(token.position, &token.token, font_size)))
        })
        .collect::<Vec<_>>();

    for (key, bounding_box) in measured {
        frame.supply_bounding_box(key, bounding_box);
    }
}
