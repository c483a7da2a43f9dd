pub mod driver;
pub mod format;
pub mod markdown;
pub mod output;
pub mod renderer;
pub mod state;
pub mod status;

pub use driver::{DriverError, SessionDriver, SessionRequest};
pub use output::{Capture, Console, Tone};
pub use renderer::{DisplayMode, EventRenderer};
pub use state::{DoneLatch, RenderState};
pub use status::{SpinnerStatus, StatusLine};
