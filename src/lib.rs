//! Clustered heat maps with row and column dendrograms, cluster color bars
//! and a color legend, rendered to PNG/SVG or shown in an image viewer.

pub mod cluster;
pub mod colormap;
pub mod dendrogram;
pub mod error;
pub mod figure;
pub mod font;
pub mod heatmap;
pub mod layout;
pub mod linkage;
pub mod ticks;
pub mod viewer;

pub use cluster::{cluster_axis, reorder, Method, Metric};
pub use colormap::{Colormap, Normalize};
pub use error::{Axis, HeatmapError, LabelWarning, Result};
pub use figure::{Figure, PanelKind};
pub use heatmap::{CoordReadout, DendroHeatMap, ExportStatus, IntoMatrix};
pub use layout::Layout;
pub use linkage::{IntoLinkage, Linkage, Merge};
pub use viewer::{SystemViewer, Viewer};
