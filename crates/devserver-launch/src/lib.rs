pub mod errors;

pub mod adapter;
pub mod cloudsdk;
pub mod launcher;
pub mod plan;
pub mod sdk;

pub use adapter::RunAdapter;
pub use cloudsdk::CloudSdkDevServer;
pub use errors::{LaunchError, RunError};
pub use launcher::DevServerLauncher;
pub use plan::DevServerPlan;
pub use sdk::CloudSdk;
