mod host;
mod port;
#[path = "switch_.rs"]
mod switch;

pub use host::{Host, HostError, FUNCTION_QUEUES, QDMA_MAX_QUEUES};
pub use port::Port;
pub use switch::{InterfaceId, InterfaceType, ProcessorType, Switch};
