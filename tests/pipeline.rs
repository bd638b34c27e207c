//! End-to-end runs against PNG files in a temporary directory

use image::{imageops, Rgba, RgbaImage};
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use tempfile::TempDir;
use texture_dedup::core::config::Config;
use texture_dedup::core::error::TileError;
use texture_dedup::core::processor::{process_image, ProcessOptions};
use texture_dedup::io::PngFileSource;
use texture_dedup::sample::{generate, SampleConfig};
use texture_dedup::tiles::{DedupOptions, Fingerprint, ImageSet};

fn patterned(seed: u8) -> RgbaImage {
    RgbaImage::from_fn(128, 128, |x, y| {
        Rgba([
            (x as u8).wrapping_add(seed),
            (y as u8).wrapping_mul(3),
            ((x * y) as u8) ^ seed,
            255,
        ])
    })
}

fn options(out: &Path) -> ProcessOptions {
    ProcessOptions::from_config(&Config::default())
        .with_output_dir(out)
        .with_progress(false)
}

#[test]
fn four_quadrant_sheet() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("quadrants.png");
    let out = dir.path().join("out");

    let top_left = patterned(1);
    let mut sheet = RgbaImage::new(256, 256);
    imageops::replace(&mut sheet, &top_left, 0, 0);
    imageops::replace(&mut sheet, &imageops::rotate90(&top_left), 128, 0);
    imageops::replace(&mut sheet, &patterned(77), 0, 128);
    imageops::replace(&mut sheet, &patterned(150), 128, 128);
    sheet.save(&input).unwrap();

    let summary = process_image(&PngFileSource, &input, &options(&out), &AtomicBool::new(false))
        .unwrap();

    assert_eq!(summary.cells, 4);
    assert_eq!(summary.unique_tiles, 3);
    assert_eq!(summary.orientation_counts[0], 3);
    assert_eq!(summary.orientation_counts[1], 1);
    assert!(summary.is_complete());

    // Exported tiles are named by their fingerprint and hold the first-seen pixels
    let mut names: Vec<String> = fs::read_dir(out.join("images"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names.len(), 3);

    let set = ImageSet::build(&sheet, &DedupOptions::default());
    let first = set.images()[0];
    assert!(names.contains(&first.file_name()));
    let exported = image::open(out.join("images").join(first.file_name()))
        .unwrap()
        .to_rgba8();
    assert_eq!(exported, top_left);

    let html = fs::read_to_string(out.join("report.html")).unwrap();
    assert!(html.contains("<th>Texture Cells</th><td>4</td>"));
    assert!(html.contains("<th>Unique Textures</th><td>3</td>"));
    assert!(html.contains("Rotated 90°"));
    for name in &names {
        let hex = name.trim_end_matches(".png");
        assert!(Fingerprint::from_hex(hex).is_some());
        assert!(html.contains(hex));
    }
}

#[test]
fn partial_grid_ignores_remainder() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("wide.png");
    RgbaImage::from_fn(300, 200, |x, y| Rgba([x as u8, y as u8, 5, 255]))
        .save(&input)
        .unwrap();

    let summary = process_image(
        &PngFileSource,
        &input,
        &options(&dir.path().join("out")),
        &AtomicBool::new(false),
    )
    .unwrap();

    assert_eq!(summary.source_dimensions, (300, 200));
    assert_eq!(summary.cells, 2);
}

#[test]
fn report_links_source_from_its_own_directory() {
    let dir = TempDir::new().unwrap();
    let textures = dir.path().join("textures");
    fs::create_dir(&textures).unwrap();
    let input = textures.join("sheet.png");
    let out = dir.path().join("out");
    patterned(9).save(&input).unwrap();

    let summary =
        process_image(&PngFileSource, &input, &options(&out), &AtomicBool::new(false)).unwrap();

    assert_eq!(summary.report_path, Some(out.join("report.html")));
    let html = fs::read_to_string(out.join("report.html")).unwrap();
    assert!(html.contains("<a href='../textures/sheet.png'><img src='../textures/sheet.png'"));
}

#[test]
fn undersized_image_produces_empty_report() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tiny.png");
    let out = dir.path().join("out");
    RgbaImage::new(100, 100).save(&input).unwrap();

    let summary =
        process_image(&PngFileSource, &input, &options(&out), &AtomicBool::new(false)).unwrap();

    assert_eq!(summary.cells, 0);
    assert_eq!(summary.unique_tiles, 0);
    assert!(out.join("report.html").exists());
}

#[test]
fn missing_source_is_terminal() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");

    let result = process_image(
        &PngFileSource,
        &dir.path().join("absent.png"),
        &options(&out),
        &AtomicBool::new(false),
    );

    match result {
        Err(e @ TileError::SourceNotFound(_)) => {
            assert!(e.to_string().contains("does not exist"));
        }
        other => panic!("expected SourceNotFound, got {:?}", other.map(|s| s.cells)),
    }
    assert!(!out.exists());
}

#[test]
fn malformed_source_is_terminal() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("corrupt.png");
    let out = dir.path().join("out");
    fs::write(&input, b"\x89PNG\r\n\x1a\ntruncated").unwrap();

    let result = process_image(&PngFileSource, &input, &options(&out), &AtomicBool::new(false));

    assert!(matches!(result, Err(TileError::SourceMalformed { .. })));
    assert!(!out.exists());
}

#[test]
fn generated_sample_round_trip_through_png() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("sample.png");
    let out = dir.path().join("out");

    let sample = generate(&SampleConfig {
        columns: 5,
        rows: 3,
        tile_size: 16,
        unique_tiles: 6,
        margin: 5,
        seed: 1234,
    })
    .unwrap();
    sample.save(&input).unwrap();

    let mut config = Config::default();
    config.tiles.size = 16;
    config.dedup.parallel = true;
    config.output.json_report = true;
    let opts = ProcessOptions::from_config(&config)
        .with_output_dir(&out)
        .with_progress(false);

    let summary = process_image(&PngFileSource, &input, &opts, &AtomicBool::new(false)).unwrap();

    assert_eq!(summary.cells, 15);
    assert_eq!(summary.unique_tiles, sample.expected_unique());
    assert_eq!(summary.tiles_written, sample.expected_unique());

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("report.json")).unwrap()).unwrap();
    assert_eq!(json["unique_count"], 6);
    assert_eq!(json["columns"], 5);
    assert_eq!(json["rows"], 3);
}
