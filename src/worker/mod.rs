// Worker module - partitioning, process spawning, wire protocol and fan-in

pub mod mux;
pub mod partition;
pub mod process;
pub mod protocol;

pub use mux::{Multiplexer, Shutdown, WorkerExit, WorkerOutcome, WorkerSender, collect};
pub use partition::{GroupBy, RuntimeLog, partition};
pub use process::{WorkerOptions, WorkerPlan, spawn};
pub use protocol::{WorkerEvent, WorkerMessage, parse_line};
