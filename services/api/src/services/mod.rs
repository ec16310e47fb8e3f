pub mod analysis;
pub mod library;
pub mod prompts;
pub mod settings;
pub mod trend_cache;
pub mod trends;

pub use analysis::{AnalysisRequest, AnalysisService};
pub use library::LibraryService;
pub use settings::SettingsContext;
pub use trend_cache::TrendCache;
pub use trends::{RetryPolicy, TrendService};
