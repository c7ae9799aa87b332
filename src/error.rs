use std::fmt;

#[derive(Debug)]
pub enum HeatmapError {
    InvalidData(String),        // matrix input is not a rectangular numeric array
    InvalidLinkage(String),     // dendrogram input is not a valid merge-record sequence
    UnsupportedFormat(String),  // export extension no encoder handles
    Image(image::ImageError),
    Io(std::io::Error),
    Viewer(String),
}

impl fmt::Display for HeatmapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeatmapError::InvalidData(msg) => {
                write!(f, "Data for the heatmap must be a rectangular numeric matrix: {}", msg)
            }
            HeatmapError::InvalidLinkage(msg) => {
                write!(f, "Dendrograms must be an n-1 x 4 linkage matrix: {}", msg)
            }
            HeatmapError::UnsupportedFormat(ext) => {
                write!(f, "Unsupported export format '{}'", ext)
            }
            HeatmapError::Image(e) => write!(f, "Image encoding failed: {}", e),
            HeatmapError::Io(e) => write!(f, "I/O error: {}", e),
            HeatmapError::Viewer(msg) => write!(f, "Viewer failed: {}", msg),
        }
    }
}

impl std::error::Error for HeatmapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HeatmapError::Image(e) => Some(e),
            HeatmapError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<image::ImageError> for HeatmapError {
    fn from(e: image::ImageError) -> Self {
        HeatmapError::Image(e)
    }
}

impl From<std::io::Error> for HeatmapError {
    fn from(e: std::io::Error) -> Self {
        HeatmapError::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, HeatmapError>;

/// Which matrix dimension a label vector is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Rows,
    Columns,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Rows => write!(f, "rows"),
            Axis::Columns => write!(f, "columns"),
        }
    }
}

/// Soft failure of a label assignment. The controller stays usable; callers
/// may inspect or drop it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelWarning {
    /// Labels were stored without a length check because no data is set yet.
    DataNotSet { axis: Axis },
    /// Labels were discarded because their count does not match the matrix.
    LengthMismatch { axis: Axis, expected: usize, found: usize },
}

impl fmt::Display for LabelWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelWarning::DataNotSet { axis } => write!(
                f,
                "data for heat map not yet specified, be sure that the number of labels \
                 is equal to the number of {} in the heat map data",
                axis
            ),
            LabelWarning::LengthMismatch { axis, expected, found } => write!(
                f,
                "invalid labels: got {} labels for {} {}, labels were discarded",
                found, expected, axis
            ),
        }
    }
}
