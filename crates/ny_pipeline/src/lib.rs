pub mod config;
pub mod guard;
pub mod image;
pub mod orchestrator;
pub mod transcode;

pub use config::Config;
pub use guard::CallGuard;
pub use self::image::{destination_key, ImagePipeline};
pub use orchestrator::{
    EditorPick, Pipeline, PipelineFailure, PipelineOptions, PipelineOutcome, PipelineOutput, PipelineSettings,
    Rejection, RejectionReason, Stage,
};
pub use transcode::{ImageTranscoder, DEFAULT_QUALITY};

pub mod prelude {
    pub use super::{
        destination_key, CallGuard, Config, EditorPick, ImagePipeline, ImageTranscoder, Pipeline, PipelineFailure,
        PipelineOptions, PipelineOutcome, PipelineOutput, PipelineSettings, Rejection, RejectionReason, Stage,
    };
    pub use ny_core::{Article, Error, ErrorKind, ImageFormat, Result, Translation};
    pub use tokio_util::sync::CancellationToken;
}
