pub mod types;
pub mod planner;
pub mod provider;

pub use types::{
    AndroidConfig, ApnsConfig, BatchResponse, FailedToken, Notification, OutboundMessage,
    SendError, SendResponse, Target,
};
pub use planner::MessagePlanner;
pub use provider::{FcmProvider, MockProvider, PushProvider};
