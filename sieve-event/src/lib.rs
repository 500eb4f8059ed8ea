//! The event payload evaluated by the sampling rule engine.
//!
//! An [`Event`] is a trimmed down error or transaction payload. It carries the attributes sampling
//! conditions can refer to and, optionally, the [`DynamicSamplingContext`] of the trace it belongs
//! to. Both types implement [`Getter`], which resolves dotted field paths such as
//! `event.release` or `trace.user.id` to borrowed [`Val`]ues.
#![warn(missing_docs)]

mod dsc;
mod event;
mod getter;

pub use crate::dsc::*;
pub use crate::event::*;
pub use crate::getter::*;
