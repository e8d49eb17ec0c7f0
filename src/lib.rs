pub mod commands;
pub mod comparison;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod metrics;
pub mod model;
pub mod navigation;
pub mod output;
pub mod panel;
pub mod record;
pub mod schema;
pub mod store;
pub mod table;
pub mod time;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{Result, RunlensError};
pub use model::{Dataset, Execution, Project, Run, Workflow};
pub use navigation::{NavAction, NavigationState, Navigator, View};
pub use panel::{Panel, PanelConfig};
pub use record::{FieldValue, Record};
pub use store::{FileStore, KeyValueStore, MemoryStore};
