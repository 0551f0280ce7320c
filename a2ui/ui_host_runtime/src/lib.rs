pub mod action;
pub mod binding;
pub mod catalog;
pub mod component;
pub mod data_model;
pub mod error;
pub mod host;
pub mod message;
pub mod outline;
pub mod path;
pub mod processor;
pub mod protocol;
pub mod resolver;
pub mod surface;

pub use crate::action::{Action, UserAction};
pub use crate::catalog::{ComponentKind, RendererRegistry};
pub use crate::data_model::DataModel;
pub use crate::error::{DataPathError, MessageError, ResolveError};
pub use crate::host::{HostConfig, HostSession, run};
pub use crate::processor::{MessageProcessor, ProcessReport};
pub use crate::protocol::{HostEnvelope, UiEnvelope};
pub use crate::resolver::{ResolvedNode, ResolvedTree, ResolvedValue};
pub use crate::surface::{DEFAULT_SURFACE_ID, Surface};
pub use serde_json;
