pub mod fan_out;

pub use fan_out::{
    FanOutError, FanOutExecutor, FanOutReport, FanOutResult, TelescopeOutcome, TelescopeReport,
};
