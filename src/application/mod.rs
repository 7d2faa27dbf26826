pub mod orchestrator;

pub use orchestrator::{
    Discovery, PairBacktest, PairsPipeline, PipelineError, PipelineReport, ScanSummary,
};
