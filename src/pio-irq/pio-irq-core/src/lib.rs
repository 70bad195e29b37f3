#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod constants;
pub mod dispatch;
pub mod ids;
pub mod platform;
pub mod registry;
pub mod utils;
pub mod wiring;

pub use dispatch::dispatch;
pub use ids::{InterruptSource, IrqLine, IrqNumber, PioId, SmId};
pub use platform::PioPlatform;
pub use registry::{HandlerSlots, IrqHandler, IrqTable};
