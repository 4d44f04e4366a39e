//! Plugin for `bevy_tiledimport_core`.

use bevy::prelude::*;

use crate::config::TiledImportConfig;
use crate::manager::{ResourceEvent, ResourceManager};
use crate::resource::{ResourceId, ResourceKind};

/// Fired when a resource becomes tracked by the manager.
#[derive(Event, Debug, Clone)]
pub struct ResourceAdded {
    pub id: ResourceId,
}

/// Fired when a resource is deleted or collected.
#[derive(Event, Debug, Clone)]
pub struct ResourceRemoved {
    pub id: ResourceId,
    pub name: String,
    pub kind: ResourceKind,
}

/// Fired after a resource was reimported because its source changed.
#[derive(Event, Debug, Clone)]
pub struct ResourceReimported {
    pub id: ResourceId,
}

/// Fired when an automatic reimport failed and auto-reimport was switched off
/// for the resource.
#[derive(Event, Debug, Clone)]
pub struct AutoReimportDisabled {
    pub id: ResourceId,
    pub reason: String,
}

/// Tracks imported Tiled files and reimports them when they change.
///
/// # Example
///
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_tiledimport_core::prelude::*;
///
/// fn import_level(mut manager: ResMut<ResourceManager>) {
///     if let Err(err) = manager.import_resource("maps/level1.tmj".as_ref(), "assets/maps/level1".as_ref()) {
///         error!("{err}");
///     }
/// }
///
/// App::new()
///     .add_plugins(MinimalPlugins)
///     .add_plugins(TiledImportPlugin::new(TiledImportConfig {
///         tick_interval: 1.0,
///         ..default()
///     }))
///     .add_systems(Startup, import_level)
///     .add_observer(|reimported: On<ResourceReimported>| {
///         info!("Reimported {}", reimported.id);
///     });
/// ```
#[derive(Default)]
pub struct TiledImportPlugin {
    config: TiledImportConfig,
}

impl TiledImportPlugin {
    /// Create a new plugin with custom configuration.
    pub fn new(config: TiledImportConfig) -> Self {
        Self { config }
    }
}

impl Plugin for TiledImportPlugin {
    fn build(&self, app: &mut App) {
        let mut manager = ResourceManager::with_filesystem(self.config.clone());
        if let Err(err) = manager.load_state() {
            error!("Failed to restore import state: {err}");
        }

        app.insert_resource(manager)
            .add_systems(Update, tick_resource_manager);
    }
}

/// Advance the auto-reimport sweep and forward manager events.
fn tick_resource_manager(mut commands: Commands, time: Res<Time>, mut manager: ResMut<ResourceManager>) {
    manager.on_tick(time.delta());

    for event in manager.drain_events() {
        match event {
            ResourceEvent::Added(id) => commands.trigger(ResourceAdded { id }),
            ResourceEvent::Removed { id, name, kind } => commands.trigger(ResourceRemoved { id, name, kind }),
            ResourceEvent::Reimported(id) => commands.trigger(ResourceReimported { id }),
            ResourceEvent::AutoReimportDisabled { id, reason } => {
                commands.trigger(AutoReimportDisabled { id, reason });
            }
        }
    }
}
