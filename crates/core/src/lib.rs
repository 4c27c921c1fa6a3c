//! Session, retry and polling engine behind the `squirrel` seat watcher.
//!
//! The engine drives a [`Browser`] through ACORN's login, availability and
//! enrolment pages. [`SessionStore`] persists the authenticated session between
//! runs, [`Poller`] runs one check-and-act cycle, and [`watch()`] repeats
//! cycles until a seat is claimed or the run is stopped.

pub mod browser;
pub mod client;
pub mod endpoints;
pub mod enroll;
pub mod error;
pub mod fake;
pub mod guard;
pub mod login;
pub mod poller;
pub mod retry;
pub mod store;
pub mod target;
pub mod watch;
pub mod webdriver;

pub use browser::{Browser, HttpResponse, Selector};
pub use client::AcornClient;
pub use endpoints::Endpoints;
pub use enroll::{EnrollTimings, Enroller};
pub use error::{Error, ErrorKind, Result};
pub use guard::SessionGuard;
pub use login::{Credentials, LoginFlow};
pub use poller::{PollMode, PollOutcome, Poller};
pub use retry::RetryPolicy;
pub use store::{CONFIG_PATH_ENV, SessionStore, StoredConfig};
pub use target::{EnrollmentTarget, SectionSnapshot};
pub use tokio_util::sync::CancellationToken;
pub use watch::{WatchExit, watch};
pub use webdriver::{LaunchOptions, WebDriverBrowser};

pub use squirrel_protocol as protocol;
