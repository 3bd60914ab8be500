//! Data models for the roster pipeline.

pub mod config;
pub mod player;

pub use config::{
    CropRect, EngineKind, ExtractionConfig, LevelRange, ModelConfig, OcrConfig, RosterConfig,
    StrategyKind,
};
pub use player::PlayerRecord;
