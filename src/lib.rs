//! # compass-pm
//!
//! Preventive-maintenance automation for the Compass fleet app. For every
//! vehicle (MVA) in a list, complete its open PM work item or create one from
//! an existing or new PM complaint, and record one [`FlowResult`] per vehicle.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use compass_pm::{mva, Config, Runner, Session};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> compass_pm::Result<()> {
//! let config = Config::load("config/config.json")?;
//! let mvas = mva::load("data/mva.csv")?;
//!
//! let session = Session::launch(&config.browser).await?;
//!
//! // Signs in, then works through the list.
//! let execution = Runner::new(&session, &config).run(&mvas).await;
//! println!("Success: {}", execution.success);
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dom;
pub mod flows;
pub mod logging;
pub mod mva;
pub mod runner;
pub mod selectors;
pub mod session;
pub mod validate;

#[cfg(test)]
mod testing;

pub use config::{
    ArtifactsConfig, BrowserConfig, Config, FlowConfig, LoggingConfig, ParamDef, Params,
    TimeoutConfig,
};
pub use dom::{Dom, ElementHandle, Locator};
pub use flows::{FlowResult, FlowStatus, Reason};
pub use runner::{Runner, WorkflowExecution, WorkflowStep};
pub use session::Session;

/// Result type for compass-pm operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during config loading, browser control or a flow.
///
/// `Timeout`, `StaleElement`, `ElementNotFound` and `Browser` come from the
/// locator layer; the rest are application errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("stale element: {0}")]
    StaleElement(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("blocked by {0}")]
    Blocked(String),

    #[error("login failed: {0}")]
    Login(String),

    #[error("validation failed: {0}")]
    Validation(String),
}

impl Error {
    /// Whether this error means the DOM changed under a held element handle.
    pub fn is_stale(&self) -> bool {
        matches!(self, Error::StaleElement(_))
    }

    /// Whether this error is a bounded wait running out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}
