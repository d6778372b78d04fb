//! Clustered heatmap of significant genes
//!
//! Rows are z-scored per gene and ordered by average-linkage clustering,
//! with the dendrogram drawn on the left. Columns are grouped Normal then
//! Tumor and keep their original order within each group.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use super::{group_color, plot_err};
use crate::cluster::{average_linkage, Dendrogram};
use crate::data::{GeneMatrix, GroupDesign, SampleGroup};
use crate::error::{DegError, Result};
use crate::io::DegResults;
use crate::stats::z_scores;

/// Color scale saturates at this many standard deviations
const Z_LIMIT: f64 = 2.5;

const DENDRO_WIDTH: i32 = 140;
const LABEL_WIDTH: i32 = 110;
const COLORBAR_WIDTH: i32 = 18;
const MARGIN: i32 = 20;
const TITLE_HEIGHT: i32 = 50;
const GROUP_BAR_HEIGHT: i32 = 14;
const LEGEND_HEIGHT: i32 = 40;

/// Everything needed to draw the heatmap, in display order
#[derive(Debug, Clone)]
pub struct HeatmapData {
    /// Gene symbols, top to bottom
    pub genes: Vec<String>,
    /// Sample IDs, left to right
    pub samples: Vec<String>,
    pub groups: Vec<SampleGroup>,
    /// Row z-scores, rows in `genes` order and columns in `samples` order
    pub z: Vec<Vec<f64>>,
    /// Clustering of the rows before reordering
    pub dendrogram: Dendrogram,
    /// `order[k]` is the pre-clustering row shown at position `k`
    pub order: Vec<usize>,
}

/// Select, scale and cluster the significant genes.
///
/// Returns `None` when there is nothing significant to show. With
/// `max_genes` set, only that many genes with the smallest adjusted
/// p-values are kept.
pub fn heatmap_data(
    genes: &GeneMatrix,
    design: &GroupDesign,
    results: &DegResults,
    max_genes: Option<usize>,
) -> Result<Option<HeatmapData>> {
    if results.n_genes() != genes.n_genes() {
        return Err(DegError::DimensionMismatch {
            expected: format!("{} result records", genes.n_genes()),
            got: format!("{}", results.n_genes()),
        });
    }

    // records[i] describes matrix row i
    let mut selected = results.significant_positions();
    if let Some(cap) = max_genes {
        selected.truncate(cap);
    }
    if selected.is_empty() {
        return Ok(None);
    }

    // Positions within the design, Normal first
    let mut positions = design.indices_of(SampleGroup::Normal);
    positions.extend(design.indices_of(SampleGroup::Tumor));
    let columns: Vec<usize> = positions.iter().map(|&p| design.columns[p]).collect();
    let groups: Vec<SampleGroup> = positions.iter().map(|&p| design.groups[p]).collect();
    let samples: Vec<String> = columns
        .iter()
        .map(|&c| genes.sample_ids()[c].clone())
        .collect();

    let mut symbols = Vec::with_capacity(selected.len());
    let mut rows = Vec::with_capacity(selected.len());
    for &idx in &selected {
        let values = genes.gene_values(idx);
        let row: Vec<f64> = columns.iter().map(|&c| values[c]).collect();
        symbols.push(results.records[idx].gene_symbol.clone());
        rows.push(z_scores(&row));
    }

    let dendrogram = average_linkage(&rows);
    let order = dendrogram.leaf_order();

    Ok(Some(HeatmapData {
        genes: order.iter().map(|&i| symbols[i].clone()).collect(),
        samples,
        groups,
        z: order.iter().map(|&i| rows[i].clone()).collect(),
        dendrogram,
        order,
    }))
}

/// Blue (low) to white to red (high)
fn z_color(z: f64) -> RGBColor {
    let t = (z / Z_LIMIT).clamp(-1.0, 1.0);
    if t < 0.0 {
        let s = 1.0 + t;
        RGBColor((255.0 * s) as u8, (255.0 * s) as u8, 255)
    } else {
        let s = 1.0 - t;
        RGBColor(255, (255.0 * s) as u8, (255.0 * s) as u8)
    }
}

/// Render the heatmap as SVG
pub fn plot_heatmap<P: AsRef<Path>>(data: &HeatmapData, path: P) -> Result<()> {
    let n_rows = data.genes.len() as i32;
    let n_cols = data.samples.len() as i32;
    if n_rows == 0 || n_cols == 0 {
        return Err(DegError::EmptyData {
            reason: "heatmap has no rows or columns".to_string(),
        });
    }

    let cell_w = (900 / n_cols).clamp(2, 30);
    let cell_h = (900 / n_rows).clamp(2, 16);
    let show_labels = cell_h >= 8;

    let heat_left = MARGIN + DENDRO_WIDTH;
    let heat_top = TITLE_HEIGHT + GROUP_BAR_HEIGHT + 6;
    let heat_right = heat_left + n_cols * cell_w;
    let heat_bottom = heat_top + n_rows * cell_h;
    let colorbar_x = heat_right + LABEL_WIDTH;
    let bar_h = (heat_bottom - heat_top).max(100);

    let width = (colorbar_x + COLORBAR_WIDTH + 60 + MARGIN) as u32;
    let height = (heat_bottom.max(heat_top + bar_h) + LEGEND_HEIGHT + MARGIN) as u32;

    let root = SVGBackend::new(path.as_ref(), (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    root.draw(&Text::new(
        format!("Significant genes (n = {})", n_rows),
        (heat_left, MARGIN),
        ("sans-serif", 20).into_font().color(&BLACK),
    ))
    .map_err(plot_err)?;

    // Group annotation bar
    for (j, group) in data.groups.iter().enumerate() {
        let x = heat_left + j as i32 * cell_w;
        root.draw(&Rectangle::new(
            [(x, TITLE_HEIGHT), (x + cell_w, TITLE_HEIGHT + GROUP_BAR_HEIGHT)],
            group_color(*group).filled(),
        ))
        .map_err(plot_err)?;
    }

    for (i, row) in data.z.iter().enumerate() {
        let y = heat_top + i as i32 * cell_h;
        for (j, &z) in row.iter().enumerate() {
            let x = heat_left + j as i32 * cell_w;
            root.draw(&Rectangle::new(
                [(x, y), (x + cell_w, y + cell_h)],
                z_color(z).filled(),
            ))
            .map_err(plot_err)?;
        }
        if show_labels {
            root.draw(&Text::new(
                data.genes[i].clone(),
                (heat_right + 4, y + cell_h / 2 - 5),
                ("sans-serif", 10).into_font().color(&BLACK),
            ))
            .map_err(plot_err)?;
        }
    }

    draw_dendrogram(&root, data, heat_left - 4, heat_top, cell_h)?;

    // Color scale
    let steps = 50;
    for k in 0..steps {
        let y0 = heat_top + k * bar_h / steps;
        let y1 = heat_top + (k + 1) * bar_h / steps;
        let z = Z_LIMIT - 2.0 * Z_LIMIT * (k as f64 + 0.5) / steps as f64;
        root.draw(&Rectangle::new(
            [(colorbar_x, y0), (colorbar_x + COLORBAR_WIDTH, y1)],
            z_color(z).filled(),
        ))
        .map_err(plot_err)?;
    }
    for (label, y) in [
        (format!("{:+.1}", Z_LIMIT), heat_top),
        ("0".to_string(), heat_top + bar_h / 2 - 5),
        (format!("{:+.1}", -Z_LIMIT), heat_top + bar_h - 10),
    ] {
        root.draw(&Text::new(
            label,
            (colorbar_x + COLORBAR_WIDTH + 4, y),
            ("sans-serif", 10).into_font().color(&BLACK),
        ))
        .map_err(plot_err)?;
    }
    root.draw(&Text::new(
        "z-score",
        (colorbar_x, heat_top - 16),
        ("sans-serif", 11).into_font().color(&BLACK),
    ))
    .map_err(plot_err)?;

    // Group legend
    let legend_y = heat_bottom + 14;
    let mut legend_x = heat_left;
    for group in [SampleGroup::Normal, SampleGroup::Tumor] {
        let n = data.groups.iter().filter(|g| **g == group).count();
        root.draw(&Rectangle::new(
            [(legend_x, legend_y), (legend_x + 12, legend_y + 12)],
            group_color(group).filled(),
        ))
        .map_err(plot_err)?;
        root.draw(&Text::new(
            format!("{} ({})", group, n),
            (legend_x + 16, legend_y),
            ("sans-serif", 12).into_font().color(&BLACK),
        ))
        .map_err(plot_err)?;
        legend_x += 110;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Elbow dendrogram with leaves at `right` and the root towards the left margin
fn draw_dendrogram(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    data: &HeatmapData,
    right: i32,
    top: i32,
    cell_h: i32,
) -> Result<()> {
    let tree = &data.dendrogram;
    let n = tree.n_leaves;
    let max_height = tree
        .merges
        .iter()
        .map(|m| m.height)
        .fold(0.0_f64, f64::max);
    let scale = if max_height > 0.0 {
        (DENDRO_WIDTH - 10) as f64 / max_height
    } else {
        0.0
    };

    // (x, y) of every node; leaves first, then merges in creation order
    let mut pos = vec![(right, 0); n + tree.merges.len()];
    for (k, &leaf) in data.order.iter().enumerate() {
        pos[leaf] = (right, top + k as i32 * cell_h + cell_h / 2);
    }

    let style = BLACK.stroke_width(1);
    for (k, merge) in tree.merges.iter().enumerate() {
        let (xl, yl) = pos[merge.left];
        let (xr, yr) = pos[merge.right];
        let x = right - (merge.height * scale).round() as i32;
        root.draw(&PathElement::new(
            vec![(xl, yl), (x, yl), (x, yr), (xr, yr)],
            style,
        ))
        .map_err(plot_err)?;
        pos[n + k] = (x, (yl + yr) / 2);
    }
    Ok(())
}
