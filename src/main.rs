use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use dendroheatmap::{cluster_axis, reorder, Axis, Colormap, DendroHeatMap, ExportStatus, Layout, Method, Metric};
use log::{debug, info, warn};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dendroheatmap")]
#[command(about = "Plot a matrix as a clustered heat map with dendrograms.", long_about = None)]
struct Args {
    // MANDATORY OPTIONS
    /// Load the matrix from this tab-separated FILE (header holds column labels, first column row labels).
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    input: PathBuf,

    /// Write the plot to this FILE (PNG, SVG, ... based on extension).
    #[arg(short = 'o', long = "out", value_name = "FILE", required_unless_present = "show")]
    out: Option<PathBuf>,

    /// Show the plot in the system image viewer.
    #[arg(long = "show")]
    show: bool,

    // Clustering Options
    /// Cluster the rows and draw the left dendrogram.
    #[arg(short = 'r', long = "cluster-rows")]
    cluster_rows: bool,

    /// Cluster the columns and draw the top dendrogram.
    #[arg(short = 'c', long = "cluster-cols")]
    cluster_cols: bool,

    /// Linkage method used for clustering.
    #[arg(short = 'm', long = "method", value_enum, default_value_t = Method::Average)]
    method: Method,

    /// Distance metric used for clustering.
    #[arg(short = 'd', long = "metric", value_enum, default_value_t = Metric::Euclidean)]
    metric: Metric,

    // Visualization Options
    /// Title drawn at the top of the figure.
    #[arg(short = 't', long = "title", value_name = "STRING", default_value = "")]
    title: String,

    /// Colormap: red_black_green, red_black_blue, red_black_sky_blue or yellow_black_blue.
    #[arg(short = 'C', long = "colormap", value_name = "NAME", default_value = "red_black_green")]
    colormap: String,

    /// Set the width in inches of the figure.
    #[arg(short = 'x', long = "width", value_name = "F", default_value_t = 14.0)]
    width: f64,

    /// Set the height in inches of the figure.
    #[arg(short = 'y', long = "height", value_name = "F", default_value_t = 10.0)]
    height: f64,

    /// Resolution of the written image.
    #[arg(long = "dpi", value_name = "N", default_value_t = 600.0)]
    dpi: f64,

    // Logging
    /// Verbosity level (0 = error, 1 = info, 2 = debug).
    #[arg(short = 'v', long = "verbose", value_name = "N", default_value_t = 1)]
    verbose: u8,
}

/// A labelled matrix read from a TSV file.
#[derive(Debug)]
struct Table {
    row_labels: Vec<String>,
    col_labels: Vec<String>,
    values: Array2<f64>,
}

fn parse_cell(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("na") || cell.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    cell.parse().ok()
}

fn read_table(path: &Path) -> Result<Table> {
    info!("Loading matrix from {:?}...", path);
    let file = File::open(path).with_context(|| format!("cannot open {:?}", path))?;
    let mut lines = BufReader::new(file).lines();

    let header = lines
        .next()
        .ok_or_else(|| anyhow!("{:?} is empty", path))?
        .with_context(|| format!("cannot read {:?}", path))?;
    let col_labels: Vec<String> = header.split('\t').skip(1).map(|s| s.trim().to_string()).collect();
    if col_labels.is_empty() {
        bail!("{:?}: header has no column labels", path);
    }

    let mut row_labels = Vec::new();
    let mut flat = Vec::new();
    for (lineno, line) in lines.enumerate() {
        let line = line.with_context(|| format!("cannot read {:?}", path))?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let label = fields.next().unwrap_or_default().trim().to_string();
        let mut n = 0;
        for cell in fields {
            let value = parse_cell(cell)
                .ok_or_else(|| anyhow!("{:?} line {}: '{}' is not a number", path, lineno + 2, cell))?;
            flat.push(value);
            n += 1;
        }
        if n != col_labels.len() {
            bail!(
                "{:?} line {}: expected {} values, found {}",
                path,
                lineno + 2,
                col_labels.len(),
                n
            );
        }
        row_labels.push(label);
    }

    let values = Array2::from_shape_vec((row_labels.len(), col_labels.len()), flat)?;
    debug!("Read {} rows x {} columns", values.nrows(), values.ncols());
    Ok(Table { row_labels, col_labels, values })
}

fn permute(labels: &[String], order: &[usize]) -> Vec<String> {
    order.iter().map(|&i| labels[i].clone()).collect()
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger based on verbosity
    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    let table = read_table(&args.input)?;
    let colormap = Colormap::by_name(&args.colormap)
        .ok_or_else(|| anyhow!("unknown colormap '{}'", args.colormap))?;

    let row_linkage = if args.cluster_rows {
        info!("Clustering {} rows...", table.values.nrows());
        Some(cluster_axis(table.values.view(), Axis::Rows, args.metric, args.method)?)
    } else {
        None
    };
    let col_linkage = if args.cluster_cols {
        info!("Clustering {} columns...", table.values.ncols());
        Some(cluster_axis(table.values.view(), Axis::Columns, args.metric, args.method)?)
    } else {
        None
    };

    let row_order = row_linkage.as_ref().map(|z| z.leaves());
    let col_order = col_linkage.as_ref().map(|z| z.leaves());
    let values = reorder(table.values.view(), row_order.as_deref(), col_order.as_deref());
    let row_labels = match &row_order {
        Some(order) => permute(&table.row_labels, order),
        None => table.row_labels,
    };
    let col_labels = match &col_order {
        Some(order) => permute(&table.col_labels, order),
        None => table.col_labels,
    };

    let layout = Layout {
        window_width: args.width,
        window_height: args.height,
        export_dpi: args.dpi,
        ..Layout::default()
    };
    let mut heatmap = DendroHeatMap::new(layout);
    heatmap.set_verbose(args.verbose > 0);
    heatmap.set_heat_map_data(values)?;
    heatmap.set_colormap(colormap);
    if let Some(z) = row_linkage {
        heatmap.set_left_dendrogram(z)?;
    }
    if let Some(z) = col_linkage {
        heatmap.set_top_dendrogram(z)?;
    }
    heatmap.set_row_labels(Some(row_labels));
    heatmap.set_col_labels(Some(col_labels));
    heatmap.set_title(&args.title);

    if let Some(out) = &args.out {
        match heatmap.export(out)? {
            ExportStatus::Written(path) => info!("Wrote {:?}", path),
            ExportStatus::Skipped { suggested } => {
                warn!("Nothing written: {:?} has no extension, try {:?}", out, suggested)
            }
        }
    }
    if args.show {
        heatmap.show()?;
    }

    info!("Done!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tsv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_table() {
        let file = write_tsv("gene\ts1\ts2\ts3\nA\t1\t2\t3\nB\t4\tNA\t6\n");
        let table = read_table(file.path()).unwrap();
        assert_eq!(table.row_labels, vec!["A", "B"]);
        assert_eq!(table.col_labels, vec!["s1", "s2", "s3"]);
        assert_eq!(table.values.dim(), (2, 3));
        assert_eq!(table.values[[1, 2]], 6.0);
        assert!(table.values[[1, 1]].is_nan());
    }

    #[test]
    fn test_read_table_rejects_short_rows() {
        let file = write_tsv("gene\ts1\ts2\nA\t1\n");
        let err = read_table(file.path()).unwrap_err();
        assert!(err.to_string().contains("expected 2 values"));
    }

    #[test]
    fn test_read_table_rejects_text_cells() {
        let file = write_tsv("gene\ts1\nA\thigh\n");
        assert!(read_table(file.path()).is_err());
    }

    #[test]
    fn test_cli_requires_out_or_show() {
        assert!(Args::try_parse_from(["dendroheatmap", "-i", "m.tsv"]).is_err());
        let args = Args::try_parse_from(["dendroheatmap", "-i", "m.tsv", "--show", "-r", "-m", "complete"]).unwrap();
        assert!(args.show && args.cluster_rows);
        assert_eq!(args.method, Method::Complete);
    }
}
