#![doc = include_str!("../README.md")]

mod error;
mod observer;
mod pipeline;
mod ticker;
mod widget;

pub use error::Error;
pub use observer::{Observe, WIDGET_DESCRIPTION, WIDGET_METRIC, register, report};
pub use pipeline::{Config, Pipeline, run};
pub use ticker::{Builder, Ticker};
pub use widget::Widget;
