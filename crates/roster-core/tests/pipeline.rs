use std::collections::HashSet;

use image::{DynamicImage, GenericImageView, RgbImage};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use roster_core::error::OcrError;
use roster_core::extract::{group_lines, SpatialExtractor};
use roster_core::models::config::CropRect;
use roster_core::ocr::{Detection, DetectionAdapter, TextDetector};
use roster_core::{
    DetectionNormalizer, PlayerRecord, RosterError, RosterPipeline, StrategyKind,
};

/// Returns the same detections for every image it is shown.
struct ScriptedDetector {
    detections: Vec<Detection>,
}

impl TextDetector for ScriptedDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, OcrError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::InvalidImage("empty".to_string()));
        }
        Ok(self.detections.clone())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn word(left: f32, top: f32, text: &str, confidence: f32) -> Detection {
    Detection::from_rect(left, top, left + 70.0, top + 20.0, text, confidence)
}

/// A roster page as the OCR engine would report it, noise included.
fn roster_page() -> Vec<Detection> {
    vec![
        word(10.0, 0.0, "Allies", 0.95),
        word(10.0, 40.0, "+", 0.40),
        word(40.0, 40.0, "Nightshade", 0.91),
        word(10.0, 70.0, "Level", 0.88),
        word(90.0, 70.0, "120", 0.90),
        word(170.0, 70.0, "Grand", 0.87),
        word(250.0, 70.0, "Summoner", 0.86),
        word(330.0, 70.0, "Auriga", 0.85),
        word(10.0, 95.0, "31/3/2025", 0.80),
        word(10.0, 140.0, "Quiet", 0.93),
        word(90.0, 140.0, "Fox", 0.93),
        word(10.0, 170.0, "Level", 0.91),
        word(90.0, 170.0, "15", 0.92),
        word(170.0, 170.0, "Ranger", 0.92),
        word(10.0, 230.0, "smudge", 0.12),
    ]
}

fn pipeline_with(detections: Vec<Detection>) -> RosterPipeline {
    let adapter = DetectionAdapter::builder(Box::new(ScriptedDetector { detections }))
        .with_crop(CropRect::full())
        .build()
        .unwrap();
    RosterPipeline::builder().with_adapter(adapter).build()
}

fn write_screenshot(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("roster.png");
    RgbImage::new(640, 480).save(&path).unwrap();
    path
}

#[test]
fn extracts_from_file_with_both_strategies() {
    let dir = TempDir::new().unwrap();
    let path = write_screenshot(&dir);
    let pipeline = pipeline_with(roster_page());

    let spatial = pipeline.extract_path(&path, StrategyKind::Spatial).unwrap();
    assert_eq!(
        spatial.records,
        vec![
            PlayerRecord::new("Nightshade", 120, "Grand Summoner Auriga"),
            PlayerRecord::new("Quiet Fox", 15, "Ranger"),
        ]
    );
    assert_eq!(spatial.engine.as_deref(), Some("scripted"));
    assert_eq!(spatial.detections.len(), roster_page().len());

    // The sequential stream keeps the chrome and date words in the username.
    let sequential = pipeline.extract_path(&path, StrategyKind::Sequential).unwrap();
    assert_eq!(
        sequential.records,
        vec![
            PlayerRecord::new("Allies + Nightshade", 120, "Grand Summoner Auriga"),
            PlayerRecord::new("31/3/2025 Quiet Fox", 15, "Ranger"),
        ]
    );
}

#[test]
fn line_regions_extract_like_words() {
    let lines = vec![
        Detection::from_rect(10.0, 40.0, 120.0, 60.0, "Nightshade", 0.91),
        Detection::from_rect(10.0, 70.0, 400.0, 90.0, "Level 120 Grand Summoner Auriga", 0.88),
        Detection::from_rect(10.0, 140.0, 160.0, 160.0, "Quiet Fox", 0.93),
        Detection::from_rect(10.0, 170.0, 240.0, 190.0, "Level 15 Ranger", 0.92),
    ];
    let expected = vec![
        PlayerRecord::new("Nightshade", 120, "Grand Summoner Auriga"),
        PlayerRecord::new("Quiet Fox", 15, "Ranger"),
    ];

    let pipeline = RosterPipeline::builder().build();
    for strategy in [StrategyKind::Sequential, StrategyKind::Spatial] {
        let result = pipeline.extract_detections(&lines, strategy);
        assert_eq!(result.records, expected, "{strategy}");
    }
}

#[test]
fn repeated_runs_are_identical() {
    let dir = TempDir::new().unwrap();
    let path = write_screenshot(&dir);
    let pipeline = pipeline_with(roster_page());

    for strategy in [StrategyKind::Sequential, StrategyKind::Spatial] {
        let first = pipeline.extract_path(&path, strategy).unwrap();
        let second = pipeline.extract_path(&path, strategy).unwrap();
        assert_eq!(first.records, second.records);
        assert_eq!(first.tokens, second.tokens);
        assert_eq!(first.stats, second.stats);
    }
}

#[test]
fn emitted_records_are_well_formed() {
    let mut detections = roster_page();
    // A dangling level line with no name, and an out-of-range level.
    detections.push(word(10.0, 300.0, "Level", 0.9));
    detections.push(word(90.0, 300.0, "9", 0.9));
    detections.push(word(170.0, 300.0, "Mage", 0.9));
    detections.push(word(10.0, 360.0, "Level", 0.9));
    detections.push(word(90.0, 360.0, "999", 0.9));
    detections.push(word(170.0, 360.0, "Bard", 0.9));

    let pipeline = RosterPipeline::builder().build();
    for strategy in [StrategyKind::Sequential, StrategyKind::Spatial] {
        let result = pipeline.extract_detections(&detections, strategy);
        for record in &result.records {
            assert!(record.is_complete(), "{strategy}: {record:?}");
            if strategy == StrategyKind::Spatial {
                assert!((1..=300).contains(&record.level), "{record:?}");
            }
        }
    }
}

#[test]
fn spatial_never_shares_a_username_line() {
    let mut detections = vec![word(10.0, 0.0, "Lonely", 0.9)];
    for (i, level) in ["3", "4", "5"].iter().enumerate() {
        let top = 30.0 + 30.0 * i as f32;
        detections.push(word(10.0, top, "Level", 0.9));
        detections.push(word(90.0, top, level, 0.9));
        detections.push(word(170.0, top, "Monk", 0.9));
    }

    let tokens = DetectionNormalizer::new().normalize(&detections);
    let lines = group_lines(&tokens, 20);
    let (pairings, stats) = SpatialExtractor::default().pair(&lines);

    let used: HashSet<usize> = pairings.iter().map(|p| p.username_line).collect();
    assert_eq!(used.len(), pairings.len());
    assert_eq!(pairings.len(), 1);
    assert_eq!(stats.ambiguous, 2);
}

#[test]
fn nothing_readable_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write_screenshot(&dir);
    let pipeline = pipeline_with(vec![word(0.0, 0.0, "faint", 0.05)]);

    let result = pipeline.extract_path(&path, StrategyKind::Sequential).unwrap();
    assert!(result.is_empty());
    assert!(result.tokens.is_empty());
}

#[test]
fn unreadable_inputs_are_invalid_input() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline_with(roster_page());

    let missing = dir.path().join("missing.png");
    let result = pipeline.extract_path(&missing, StrategyKind::Sequential);
    assert!(matches!(result, Err(RosterError::InvalidInput(_))));

    let garbage = dir.path().join("garbage.png");
    std::fs::write(&garbage, b"definitely not a png").unwrap();
    let result = pipeline.extract_path(&garbage, StrategyKind::Sequential);
    assert!(matches!(result, Err(RosterError::InvalidInput(_))));

    let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
    let result = pipeline.extract_image(&empty, StrategyKind::Sequential);
    assert!(matches!(result, Err(RosterError::InvalidInput(_))));
}
