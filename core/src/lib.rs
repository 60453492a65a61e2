// storeflow/src/lib.rs

//! Storeflow: async step pipelines for storefront workflows.
//!
//! A flow is an ordered list of named steps run against a shared, lockable
//! context. Each step carries:
//!  - `before`/`on`/`after` handlers, executed in that order.
//!  - A [`StepPolicy`]: `Required` steps abort the run on error, `BestEffort`
//!    steps have their errors logged and recorded while the run continues.
//!  - An optional skip condition evaluated against the context.
//!
//! Every run yields a [`FlowReport`] describing what happened to each step, so
//! callers can surface tolerated side-effect failures without failing the
//! request. The [`Flows`] registry dispatches a context to the pipeline
//! registered for its data type.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context::Handler;
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{FlowOutcome, StepControl};
pub use crate::core::report::{FlowReport, StepRecord, StepStatus};
pub use crate::core::step::{SkipCondition, StepDef, StepPolicy};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::Flows;
