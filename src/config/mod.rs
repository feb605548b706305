pub mod params;
pub mod schema;

pub use params::{ParamDef, Params};
pub use schema::{
    ArtifactsConfig, BrowserConfig, Config, FlowConfig, LoggingConfig, TimeoutConfig, UrlConfig,
    Viewport,
};
