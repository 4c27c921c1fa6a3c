//! WebDriver lifecycle for squirrel.
//!
//! * [`driver`] finds and spawns a local `chromedriver` and waits until it is ready
//! * [`wire`] speaks the W3C WebDriver protocol over HTTP
//! * [`process`] holds port helpers shared by both

pub mod driver;
pub mod error;
pub mod process;
pub mod wire;

pub use driver::{DriverProcess, find_chromedriver};
pub use error::{Result, RuntimeError};
pub use wire::{Capabilities, ElementRef, Locator, WebDriverSession, WireCookie};
