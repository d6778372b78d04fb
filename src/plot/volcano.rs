//! Volcano plot: log2 fold change against -log10 adjusted p-value

use std::path::Path;

use plotters::prelude::*;

use super::{plot_err, regulation_color};
use crate::error::{DegError, Result};
use crate::io::{DegResults, Regulation};
use crate::stats::neg_log10;

const GUIDE_DASHES: usize = 40;

/// Split a line into `n` dashes separated by gaps of equal length
fn dash_segments(from: (f64, f64), to: (f64, f64), n: usize) -> Vec<Vec<(f64, f64)>> {
    let step = 1.0 / (2 * n) as f64;
    let at = |t: f64| (from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t);
    (0..n)
        .map(|i| {
            let t = 2.0 * i as f64 * step;
            vec![at(t), at(t + step)]
        })
        .collect()
}

/// (x, y, call) for every gene with a finite fold change
pub fn volcano_points(results: &DegResults) -> Vec<(f64, f64, Regulation)> {
    results
        .records
        .iter()
        .filter(|r| r.log2_fold_change.is_finite())
        .map(|r| {
            let padj = if r.padj.is_nan() { 1.0 } else { r.padj };
            (r.log2_fold_change, neg_log10(padj), r.regulation)
        })
        .collect()
}

/// Render the volcano plot as SVG
pub fn plot_volcano<P: AsRef<Path>>(results: &DegResults, path: P) -> Result<()> {
    let points = volcano_points(results);
    if points.is_empty() {
        return Err(DegError::EmptyData {
            reason: "no gene with a finite fold change to plot".to_string(),
        });
    }

    let padj_line = neg_log10(results.padj_threshold);
    let x_max = points
        .iter()
        .fold(results.lfc_threshold + 1.0, |m, p| m.max(p.0.abs()))
        * 1.05;
    let y_max = points.iter().fold(padj_line, |m, p| m.max(p.1)) * 1.05 + 0.5;

    let root = SVGBackend::new(path.as_ref(), (900, 700)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Tumor vs Normal (GSE103512)", ("sans-serif", 26).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-x_max..x_max, 0.0..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .label_style(("sans-serif", 16).into_font())
        .x_desc("log2 fold change")
        .y_desc("-log10 adjusted p-value")
        .draw()
        .map_err(plot_err)?;

    // Dashed threshold guides
    let guide = RGBColor(120, 120, 120).stroke_width(1);
    let guides = [
        ((-results.lfc_threshold, 0.0), (-results.lfc_threshold, y_max)),
        ((results.lfc_threshold, 0.0), (results.lfc_threshold, y_max)),
        ((-x_max, padj_line), (x_max, padj_line)),
    ];
    for (from, to) in guides {
        chart
            .draw_series(
                dash_segments(from, to, GUIDE_DASHES)
                    .into_iter()
                    .map(|segment| PathElement::new(segment, guide)),
            )
            .map_err(plot_err)?;
    }

    // Not significant first so the calls are drawn on top
    for regulation in [Regulation::NotSignificant, Regulation::Down, Regulation::Up] {
        let color = regulation_color(regulation);
        let subset: Vec<(f64, f64)> = points
            .iter()
            .filter(|p| p.2 == regulation)
            .map(|p| (p.0, p.1))
            .collect();
        let n = subset.len();

        chart
            .draw_series(
                subset
                    .into_iter()
                    .map(move |(x, y)| Circle::new((x, y), 3, color.filled())),
            )
            .map_err(plot_err)?
            .label(format!("{} ({})", regulation, n))
            .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(("sans-serif", 14).into_font())
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::DegRecord;
    use tempfile::tempdir;

    fn results() -> DegResults {
        let rec = |s: &str, lfc: f64, padj: f64| DegRecord {
            gene_symbol: s.to_string(),
            probe_id: s.to_string(),
            mean_tumor: 1.0,
            mean_normal: 1.0,
            log2_fold_change: lfc,
            t_statistic: 1.0,
            df: 4.0,
            pvalue: padj,
            padj,
            regulation: Regulation::classify(lfc, padj, 1.5, 0.05),
            undefined_stat: false,
        };
        DegResults {
            records: vec![
                rec("A", 2.5, 0.001),
                rec("B", -3.0, 0.0),
                rec("C", 0.1, 0.8),
                rec("D", f64::NAN, 1.0),
            ],
            n_tumor: 3,
            n_normal: 3,
            lfc_threshold: 1.5,
            padj_threshold: 0.05,
        }
    }

    #[test]
    fn test_volcano_points() {
        let points = volcano_points(&results());
        assert_eq!(points.len(), 3);
        assert!((points[0].1 - 3.0).abs() < 1e-9);
        assert!(points[1].1.is_finite());
        assert_eq!(points[1].2, Regulation::Down);
    }

    #[test]
    fn test_dash_segments() {
        let dashes = dash_segments((0.0, 0.0), (0.0, 4.0), 2);
        assert_eq!(dashes, vec![vec![(0.0, 0.0), (0.0, 1.0)], vec![(0.0, 2.0), (0.0, 3.0)]]);
    }

    #[test]
    fn test_plot_volcano_writes_svg() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("volcano.svg");
        plot_volcano(&results(), &path).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("log2 fold change"));
    }
}
