mod dispatch;
mod filtering;
mod generation;
mod workflow;

pub use dispatch::Dispatcher;
pub use generation::{GenerationMode, Generator};
pub use workflow::Pipeline;
