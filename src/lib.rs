pub mod config;

use compkit_core::PluginManager;

/// Registry holding every component built into this binary.
pub fn plugins() -> PluginManager {
    let mut plugins = PluginManager::new();
    compkit_filesystem::register(&mut plugins);
    #[cfg(feature = "azure")]
    compkit_azure_dlsgen2::register(&mut plugins);
    #[cfg(feature = "salesforce")]
    compkit_salesforce::register(&mut plugins);
    plugins
}
