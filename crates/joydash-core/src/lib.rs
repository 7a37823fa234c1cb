pub mod frame;
pub mod link;
#[cfg(feature = "simulation")]
pub mod link_sim;
pub mod relay_loop;
pub mod tags;
pub mod timebase;
pub mod vehicle;

pub use frame::{FrameError, InputFrame, OutputFrame};
pub use link::{FrameLink, LinkError, LinkStats};
#[cfg(feature = "simulation")]
pub use link_sim::{JoystickSample, SimulatedController};
pub use relay_loop::{FrameOutcome, RelayConfig, RelayLoop, RelayStats};
pub use timebase::{Clock, ManualClock, TimeBase};
pub use vehicle::{Reading, VehicleModel, VehicleState};
