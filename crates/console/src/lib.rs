//! Session orchestration for the DAPS administration console.
//!
//! - [`Console`] runs the message loop over the core state machines.
//! - [`EventBus`] carries toasts, prompts and other feedback to the shell.
//! - [`ConsoleConfig`] reads the backend location and tuning knobs from the
//!   environment.

pub mod bus;
pub mod command;
pub mod config;
pub mod console;
pub mod error;
mod poller;
pub mod telemetry;
pub mod view;

pub use bus::{EventBus, Toast, ToastLevel, UiEvent};
pub use command::{Action, Command, ConsoleSnapshot};
pub use config::{ConfigError, ConsoleConfig};
pub use console::{Console, ConsoleHandle};
pub use error::ConsoleError;
pub use view::View;
