use async_trait::async_trait;
use devserver_config::LaunchConfiguration;

use crate::errors::LaunchError;

#[async_trait]
pub trait DevServerLauncher: Send + Sync {
    /// Start the dev server with this configuration and return once the
    /// launcher hands control back. Implementations own every default and
    /// every semantic check of the values.
    async fn run(&self, config: &LaunchConfiguration) -> Result<(), LaunchError>;
}

#[async_trait]
impl<T: DevServerLauncher + ?Sized> DevServerLauncher for &T {
    async fn run(&self, config: &LaunchConfiguration) -> Result<(), LaunchError> {
        (**self).run(config).await
    }
}

#[async_trait]
impl<T: DevServerLauncher + ?Sized> DevServerLauncher for Box<T> {
    async fn run(&self, config: &LaunchConfiguration) -> Result<(), LaunchError> {
        (**self).run(config).await
    }
}
