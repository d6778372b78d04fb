//! SVG figures: volcano plot and clustered heatmap

mod heatmap;
mod volcano;

pub use heatmap::{heatmap_data, plot_heatmap, HeatmapData};
pub use volcano::{plot_volcano, volcano_points};

use plotters::style::RGBColor;

use crate::data::SampleGroup;
use crate::error::DegError;
use crate::io::Regulation;

pub(crate) fn plot_err<E: std::fmt::Display>(e: E) -> DegError {
    DegError::Plot(e.to_string())
}

pub(crate) fn regulation_color(regulation: Regulation) -> RGBColor {
    match regulation {
        Regulation::Up => RGBColor(214, 39, 40),
        Regulation::Down => RGBColor(31, 119, 180),
        Regulation::NotSignificant => RGBColor(170, 170, 170),
    }
}

pub(crate) fn group_color(group: SampleGroup) -> RGBColor {
    match group {
        SampleGroup::Normal => RGBColor(44, 160, 44),
        SampleGroup::Tumor => RGBColor(148, 103, 189),
    }
}
