//! 수집 파이프라인의 도메인 모델.

mod alignment;
mod candle;
mod trend;

pub use alignment::*;
pub use candle::*;
pub use trend::*;
