pub mod error;
pub mod binding;
pub mod file;
pub mod record;

pub use binding::{OptionKey, OptionValue};
pub use error::ConfigError;
pub use record::{
    LaunchConfiguration, LaunchConfigurationBuilder, MaxModuleInstances, RunConfiguration,
    ThreadsafeOverride,
};
