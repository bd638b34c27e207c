//! Run reports
//!
//! A report is a read-only summary of a finished dedup pass: the source image,
//! the grid, how many tiles were unique, and one row per cell showing which
//! unique tile it uses and in what orientation. It is rendered as HTML for
//! people and optionally as JSON for tooling.

use crate::core::error::{Result, TileError};
use crate::tiles::{Fingerprint, ImageSet};
use base64::{engine::general_purpose::STANDARD, Engine};
use image::imageops::{self, FilterType};
use image::ImageFormat;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

/// Longest edge of the source image preview, in pixels
pub const SOURCE_PREVIEW_SIZE: u32 = 640;

/// One cell row of the report
#[derive(Debug, Clone, Serialize)]
pub struct CellEntry {
    pub x: u32,
    pub y: u32,
    pub fingerprint: Fingerprint,
    pub orientation: u8,
    pub orientation_label: &'static str,
}

/// One unique tile of the report
#[derive(Debug, Clone, Serialize)]
pub struct TileEntry {
    pub fingerprint: Fingerprint,
    /// Path of the exported tile, relative to the report
    pub file: String,
    pub occurrences: usize,
    pub first_x: u32,
    pub first_y: u32,
}

/// Everything a report needs, detached from the engine
#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub source_path: PathBuf,
    /// Link to the source image as seen from the report's directory
    #[serde(skip)]
    pub source_href: String,
    pub source_width: u32,
    pub source_height: u32,
    pub tile_size: u32,
    pub columns: u32,
    pub rows: u32,
    pub cell_count: usize,
    pub unique_count: usize,
    pub generated_at: String,
    pub cells: Vec<CellEntry>,
    pub tiles: Vec<TileEntry>,
}

impl ReportData {
    /// Collect report data from a finished set.
    ///
    /// `images_dir` is the directory of exported tiles relative to the report.
    pub fn from_image_set(set: &ImageSet, source_path: &Path, images_dir: &str) -> Self {
        let layout = set.layout();
        let (source_width, source_height) = set.source_dimensions();

        let cells = set
            .cells()
            .map(|cell| CellEntry {
                x: cell.x,
                y: cell.y,
                fingerprint: cell.fingerprint,
                orientation: cell.orientation.code(),
                orientation_label: cell.orientation.label(),
            })
            .collect();

        let tiles = set
            .prototypes()
            .iter()
            .map(|p| {
                let (first_x, first_y) = layout.coords_of(p.first_cell);
                TileEntry {
                    fingerprint: p.fingerprint,
                    file: tile_href(images_dir, p.fingerprint),
                    occurrences: p.occurrences,
                    first_x,
                    first_y,
                }
            })
            .collect();

        Self {
            source_path: source_path.to_path_buf(),
            source_href: path_href(source_path),
            source_width,
            source_height,
            tile_size: layout.tile_size,
            columns: layout.columns,
            rows: layout.rows,
            cell_count: set.cell_count(),
            unique_count: set.unique_count(),
            generated_at: chrono::Utc::now()
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string(),
            cells,
            tiles,
        }
    }

    /// Link the source preview relative to `report_dir`, the directory the
    /// report will be written to.
    ///
    /// Keeps the path as given when either path cannot be resolved.
    pub fn with_report_dir(mut self, report_dir: &Path) -> Self {
        if let Some(href) = relative_href(&self.source_path, report_dir) {
            self.source_href = href;
        }
        self
    }
}

fn path_href(path: &Path) -> String {
    let mut href = String::new();
    for component in path.components() {
        match component {
            Component::RootDir => href.push('/'),
            other => {
                if !href.is_empty() && !href.ends_with('/') {
                    href.push('/');
                }
                href.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    href
}

/// Path of `target` relative to `base_dir`, with `/` separators
fn relative_href(target: &Path, base_dir: &Path) -> Option<String> {
    let target = fs::canonicalize(target).ok()?;
    let base = resolve_dir(base_dir)?;

    let common = target
        .components()
        .zip(base.components())
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 {
        return Some(path_href(&target));
    }

    let parts: Vec<String> = base
        .components()
        .skip(common)
        .map(|_| "..".to_string())
        .chain(
            target
                .components()
                .skip(common)
                .map(|c| c.as_os_str().to_string_lossy().into_owned()),
        )
        .collect();

    Some(parts.join("/"))
}

/// Absolute form of a directory that may not exist yet
fn resolve_dir(dir: &Path) -> Option<PathBuf> {
    let mut current = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(dir)
    };
    let mut missing = Vec::new();

    loop {
        if let Ok(resolved) = fs::canonicalize(&current) {
            return Some(missing.iter().rev().fold(resolved, |path, name| path.join(name)));
        }
        missing.push(current.file_name()?.to_os_string());
        current = current.parent()?.to_path_buf();
    }
}

fn tile_href(images_dir: &str, fingerprint: Fingerprint) -> String {
    if images_dir.is_empty() {
        fingerprint.file_name()
    } else {
        format!("{}/{}", images_dir.trim_end_matches('/'), fingerprint.file_name())
    }
}

/// Escape text for use inside HTML content and single-quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Link and `<img>` tag for the source image, scaled so its longest edge is
/// [`SOURCE_PREVIEW_SIZE`] pixels
pub fn source_image_tag(image_path: &str, width: u32, height: u32) -> String {
    let longest = width.max(height).max(1);
    let factor = SOURCE_PREVIEW_SIZE as f64 / longest as f64;
    let path = escape_html(image_path);

    format!(
        "<a href='{}'><img src='{}' alt='Source Image' height='{}' width='{}'/></a>",
        path,
        path,
        (height as f64 * factor) as u32,
        (width as f64 * factor) as u32
    )
}

/// PNG data URLs of every unique tile, scaled to `size` pixels
pub fn thumbnail_data_urls(set: &ImageSet, size: u32) -> Result<HashMap<Fingerprint, String>> {
    let mut urls = HashMap::with_capacity(set.unique_count());

    for prototype in set.prototypes() {
        let thumb = imageops::resize(&prototype.image, size, size, FilterType::Triangle);
        let mut png = Cursor::new(Vec::new());
        thumb
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| TileError::IoError(format!("Failed to encode thumbnail: {}", e)))?;

        urls.insert(
            prototype.fingerprint,
            format!("data:image/png;base64,{}", STANDARD.encode(png.into_inner())),
        );
    }

    Ok(urls)
}

/// Render the HTML report.
///
/// With `thumbnails`, cell images are embedded as data URLs instead of
/// referencing exported tile files.
pub fn render_html(
    data: &ReportData,
    thumbnails: Option<&HashMap<Fingerprint, String>>,
    thumbnail_size: u32,
) -> String {
    let mut html = String::new();
    let files: HashMap<Fingerprint, &str> = data
        .tiles
        .iter()
        .map(|t| (t.fingerprint, t.file.as_str()))
        .collect();

    let _ = writeln!(html, "<!DOCTYPE html>");
    let _ = writeln!(html, "<html>");
    let _ = writeln!(html, "\t<head>");
    let _ = writeln!(html, "\t\t<meta charset='utf-8'>");
    let _ = writeln!(html, "\t\t<title>Texture Tile Report</title>");
    let _ = writeln!(html, "\t\t<style>");
    let _ = writeln!(html, "\t\t\tbody {{ font-family: Arial, sans-serif; margin: 20px; }}");
    let _ = writeln!(html, "\t\t\ttable {{ border-collapse: collapse; }}");
    let _ = writeln!(
        html,
        "\t\t\tth, td {{ border: 1px solid #ddd; padding: 4px 8px; text-align: left; }}"
    );
    let _ = writeln!(html, "\t\t\ttr:nth-child(even) {{ background-color: #f2f2f2; }}");
    let _ = writeln!(html, "\t\t</style>");
    let _ = writeln!(html, "\t</head>");
    let _ = writeln!(html, "\t<body>");

    let _ = writeln!(html, "\t\t<h1>Source Image</h1>");
    let _ = writeln!(
        html,
        "\t\t{}",
        source_image_tag(&data.source_href, data.source_width, data.source_height)
    );
    let _ = writeln!(html, "\t\t<p>Generated: {}</p>", data.generated_at);

    let _ = writeln!(html, "\t\t<table>");
    let summary = [
        (
            "Src Img Size",
            format!("{} x {}", data.source_width, data.source_height),
        ),
        ("Tile Size", format!("{} px", data.tile_size)),
        ("Grid", format!("{} x {}", data.columns, data.rows)),
        ("Texture Cells", data.cell_count.to_string()),
        ("Unique Textures", data.unique_count.to_string()),
    ];
    for (label, value) in summary {
        let _ = writeln!(
            html,
            "\t\t\t<tr><th>{}</th><td>{}</td></tr>",
            label,
            escape_html(&value)
        );
    }
    let _ = writeln!(html, "\t\t</table>");

    let _ = writeln!(html, "\t\t<h1>Output Images</h1>");
    let _ = writeln!(html, "\t\t<table>");
    let _ = writeln!(
        html,
        "\t\t\t<tr><th>X</th><th>Y</th><th>Image</th><th>Hash</th><th>Orientation</th></tr>"
    );

    for cell in &data.cells {
        let href = files
            .get(&cell.fingerprint)
            .map(|f| escape_html(f))
            .unwrap_or_default();
        let src = thumbnails
            .and_then(|t| t.get(&cell.fingerprint))
            .cloned()
            .unwrap_or_else(|| href.clone());

        let _ = writeln!(
            html,
            "\t\t\t<tr><td>{}</td><td>{}</td><td><a href='{}'><img src='{}' height='{}' width='{}'/></a></td><td>{}</td><td>{}</td></tr>",
            cell.x,
            cell.y,
            href,
            src,
            thumbnail_size,
            thumbnail_size,
            cell.fingerprint,
            cell.orientation_label
        );
    }

    let _ = writeln!(html, "\t\t</table>");
    let _ = writeln!(html, "\t</body>");
    let _ = writeln!(html, "</html>");

    html
}

/// Render and write the HTML report
pub fn write_html_report(
    path: &Path,
    data: &ReportData,
    thumbnails: Option<&HashMap<Fingerprint, String>>,
    thumbnail_size: u32,
) -> Result<()> {
    let html = render_html(data, thumbnails, thumbnail_size);
    write_report_file(path, html.as_bytes())
}

/// Write the report data as pretty-printed JSON
pub fn write_json_report(path: &Path, data: &ReportData) -> Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(|e| TileError::ReportFailed {
        path: path.to_path_buf(),
        message: format!("Failed to serialize report: {}", e),
    })?;
    write_report_file(path, json.as_bytes())
}

fn write_report_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| TileError::ReportFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        }
    }

    fs::write(path, contents).map_err(|e| TileError::ReportFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::DedupOptions;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn sample_set() -> ImageSet {
        // Two red cells then one green
        let image = RgbaImage::from_fn(48, 16, |x, _| {
            if x < 32 {
                Rgba([200, 0, 0, 255])
            } else {
                Rgba([0, 200, 0, 255])
            }
        });
        ImageSet::build(&image, &DedupOptions::default().with_tile_size(16))
    }

    #[test]
    fn test_report_data_from_set() {
        let set = sample_set();
        let data = ReportData::from_image_set(&set, Path::new("terrain.png"), "images");

        assert_eq!(data.cell_count, 3);
        assert_eq!(data.unique_count, 2);
        assert_eq!(data.columns, 3);
        assert_eq!(data.rows, 1);
        assert_eq!(data.cells[2].x, 2);
        assert_eq!(data.cells[1].orientation_label, "Standard");
        assert_eq!(data.tiles[0].occurrences, 2);
        assert_eq!(
            data.tiles[0].file,
            format!("images/{}.png", data.tiles[0].fingerprint.to_hex())
        );
        assert_eq!((data.tiles[1].first_x, data.tiles[1].first_y), (2, 0));
    }

    #[test]
    fn test_cell_coordinates_follow_stride() {
        // 3 x 2 grid of distinct cells
        let image = RgbaImage::from_fn(48, 32, |x, y| {
            Rgba([(x / 16) as u8 * 40, (y / 16) as u8 * 40, 9, 255])
        });
        let set = ImageSet::build(&image, &DedupOptions::default().with_tile_size(16));
        let data = ReportData::from_image_set(&set, Path::new("grid.png"), "images");

        assert_eq!((data.columns, data.rows), (3, 2));
        assert_eq!(data.cells.len(), 6);
        for (index, cell) in data.cells.iter().enumerate() {
            assert_eq!((cell.x as usize, cell.y as usize), (index % 3, index / 3));
        }
        assert_eq!((data.cells[4].x, data.cells[4].y), (1, 1));
        assert_eq!((data.tiles[5].first_x, data.tiles[5].first_y), (2, 1));

        let html = render_html(&data, None, 16);
        let row = format!("<tr><td>1</td><td>1</td><td><a href='{}'", data.tiles[4].file);
        assert!(html.contains(&row));
    }

    #[test]
    fn test_source_href_relative_to_report_dir() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("textures").join("terrain.png");
        fs::create_dir(dir.path().join("textures")).unwrap();
        RgbaImage::new(16, 16).save(&input).unwrap();
        let set = sample_set();

        let data = ReportData::from_image_set(&set, &input, "images");
        assert_eq!(data.source_href, path_href(&input));

        let data = data.with_report_dir(&dir.path().join("out"));
        assert_eq!(data.source_href, "../textures/terrain.png");

        let data = data.with_report_dir(&dir.path().join("out").join("terrain"));
        assert_eq!(data.source_href, "../../textures/terrain.png");

        let data = data.with_report_dir(&dir.path().join("textures"));
        assert_eq!(data.source_href, "terrain.png");

        let html = render_html(&data, None, 32);
        assert!(html.contains("<img src='terrain.png'"));
    }

    #[test]
    fn test_source_href_keeps_unresolvable_path() {
        let set = sample_set();
        let data = ReportData::from_image_set(&set, Path::new("missing/terrain.png"), "images")
            .with_report_dir(Path::new("out"));
        assert_eq!(data.source_href, "missing/terrain.png");
    }

    #[test]
    fn test_source_image_tag_scaling() {
        let tag = source_image_tag("big.png", 1280, 640);
        assert!(tag.contains("width='640'"));
        assert!(tag.contains("height='320'"));

        let tag = source_image_tag("tall.png", 100, 200);
        assert!(tag.contains("height='640'"));
        assert!(tag.contains("width='320'"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&'c'"), "a&lt;b&gt;&amp;&#39;c&#39;");
    }

    #[test]
    fn test_render_html_rows() {
        let set = sample_set();
        let data = ReportData::from_image_set(&set, Path::new("terrain.png"), "images");
        let html = render_html(&data, None, 32);

        assert!(html.contains("<th>Texture Cells</th><td>3</td>"));
        assert!(html.contains("<th>Unique Textures</th><td>2</td>"));
        assert_eq!(html.matches("<tr><td>").count(), 3);
        let first = data.tiles[0].fingerprint.to_hex();
        assert!(html.contains(&format!("href='images/{}.png'", first)));
    }

    #[test]
    fn test_render_html_with_thumbnails() {
        let set = sample_set();
        let data = ReportData::from_image_set(&set, Path::new("terrain.png"), "images");
        let thumbs = thumbnail_data_urls(&set, 8).unwrap();

        assert_eq!(thumbs.len(), 2);
        let html = render_html(&data, Some(&thumbs), 8);
        assert!(html.contains("src='data:image/png;base64,"));
    }

    #[test]
    fn test_write_reports() {
        let dir = TempDir::new().unwrap();
        let set = sample_set();
        let data = ReportData::from_image_set(&set, Path::new("terrain.png"), "images");

        let html_path = dir.path().join("out").join("report.html");
        write_html_report(&html_path, &data, None, 32).unwrap();
        assert!(html_path.exists());

        let json_path = dir.path().join("report.json");
        write_json_report(&json_path, &data).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value["unique_count"], 2);
        assert_eq!(value["cells"].as_array().unwrap().len(), 3);
        assert_eq!(value["cells"][0]["orientation"], 0);
    }

    #[test]
    fn test_write_report_failure_is_report_error() {
        let dir = TempDir::new().unwrap();
        // A directory where the report file should be
        let path = dir.path().join("report.html");
        fs::create_dir(&path).unwrap();

        let set = sample_set();
        let data = ReportData::from_image_set(&set, Path::new("terrain.png"), "images");
        let err = write_html_report(&path, &data, None, 32).unwrap_err();
        assert!(matches!(err, TileError::ReportFailed { .. }));
    }
}
