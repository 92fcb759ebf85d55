pub mod poll;

pub use poll::{PollLoop, PollSettings, PollState, PollSummary};
