pub mod context;
pub mod context_data;
pub mod control;
pub mod report;
pub mod step;

pub use context::Handler;
pub use context_data::ContextData;
pub use control::{FlowOutcome, StepControl};
pub use report::{FlowReport, StepRecord, StepStatus};
pub use step::{StepDef, StepPolicy};
