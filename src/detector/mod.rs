//! 检测模块：技术检测核心逻辑
pub mod global;
pub mod analyzer;
pub mod stage;
pub mod engine;
pub mod detector;

// 导出核心接口
pub use self::global::{detect_url, init_detector, init_detector_with_config};
pub use self::analyzer::{DetectionInput, GroupAnalyzer};
pub use self::stage::{StageReport, StageStatus};
pub use self::engine::{DetectionEngine, DetectionOutcome};
pub use self::detector::TechDetector;
