//! 수집 파이프라인과 저장소.

pub mod pipeline;
pub mod store;

pub use pipeline::{
    build_pipeline, CollectionPipeline, LivePipeline, PipelineSettings, PipelineState,
    DEFAULT_INITIAL_LIMIT, DEFAULT_STEADY_LIMIT, DEFAULT_TREND_TIMEFRAME,
};
pub use store::{CandleStore, PgCandleStore, StoreResult};
