pub mod components;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod form;
pub mod host;
pub mod interpreter;
pub mod load;
pub mod logging;
pub mod navigation;
pub mod protocol;
pub mod registry;
pub mod render;
pub mod session;
pub mod trust;
pub mod validator;
pub mod visibility;

pub use crate::components::{register_builtin_components, register_passthrough};
pub use crate::config::ShellConfig;
pub use crate::descriptor::{Action, DescriptorNode, MiniAppDefinition, Page, Params};
pub use crate::error::{ConfigError, HostError, LoadError};
pub use crate::events::{ExitReason, HostEvent, HostSink, Severity, Toast};
pub use crate::form::FormState;
pub use crate::host::{ShellHost, run};
pub use crate::interpreter::{Interpreter, RenderScope};
pub use crate::load::FetchResult;
pub use crate::navigation::{PageStack, Refusal, Transition, TransitionResult};
pub use crate::protocol::{HOST_TO_SHELL_CAP, HostEnvelope, SHELL_TO_HOST_CAP, ShellEnvelope};
pub use crate::registry::{ComponentRegistry, Renderer};
pub use crate::render::{Dispatch, RenderNode};
pub use crate::session::{MiniAppSession, RenderedScreen};
pub use crate::trust::{SharedTrustLevel, TrustLevel, TrustLevelSource};
pub use serde_json;
