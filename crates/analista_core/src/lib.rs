pub mod domain;
pub mod ports;
pub mod references;
pub mod teleprompter;
pub mod trends;

pub use domain::{
    AnalysisResult, AnalysisType, GenerationStats, Impact, NewAnalysis, SourceCitation, Topic,
    Trend, TrendResponse, UserSettings,
};
pub use ports::{
    GenerationRequest, GroundedModelService, GroundedText, GroundingChunk, KeyValueStore,
    PortError, PortResult, TextStream, UsageStatsService,
};
