//! The model protocol the travel agents speak.
//!
//! Every language model the agents can use (a hosted inference endpoint,
//! an OpenAI-compatible router, a scripted fake in tests) is driven through
//! the types in this crate, so agents never depend on a concrete provider.
//!
//! Types here carry no behaviour of their own. Providers implement the
//! traits, and the agent runtime consumes them.

#![deny(missing_docs)]

mod error;
mod opaque;
mod provider;
mod request;
mod response;

pub use error::*;
pub use opaque::*;
pub use provider::*;
pub use request::*;
pub use response::*;
