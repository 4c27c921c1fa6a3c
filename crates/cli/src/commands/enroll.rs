use chrono::Local;
use colored::Colorize;
use squirrel::{AcornClient, Browser, CancellationToken, EnrollmentTarget, ErrorKind, PollMode, WatchExit};
use tracing::{error, info, warn};

use crate::cli::EnrollArgs;
use crate::commands::close_quietly;
use crate::context::CommandContext;
use crate::error::{CliError, Result};

pub async fn run(ctx: &CommandContext, args: &EnrollArgs) -> Result<()> {
	let target = args.target(Local::now().date_naive());
	let mode = args.mode();

	let mut client = ctx.connect(ctx.open_store()).await?;

	let cancel = CancellationToken::new();
	let signals = tokio::spawn(stop_on_signal(cancel.clone()));

	let result = watch_course(&mut client, &target, mode, &cancel).await;

	signals.abort();
	close_quietly(client).await;

	if let Ok(WatchExit::Enrolled(section)) = &result {
		println!(
			"{} Enrolled in {} {} ({})",
			"✓".green(),
			target.course_code,
			target.section_code,
			section.label()
		);
	}
	result.map(|_| ())
}

/// Restores and verifies the saved session, then watches `target` until it is
/// enrolled, `cancel` fires, or the session expires.
///
/// An expired session, whether found at start-up or mid-run, is cleared from
/// the store so the next `login` starts clean.
pub async fn watch_course<B: Browser>(
	client: &mut AcornClient<B>,
	target: &EnrollmentTarget,
	mode: PollMode,
	cancel: &CancellationToken,
) -> Result<WatchExit> {
	client.restore_session().await?;

	if !client.verify_session().await {
		error!(target = "squirrel", "Session expired, please login again");
		client.invalidate_session()?;
		return Err(CliError::SessionInvalid);
	}
	client.refresh_session().await?;

	let activity = match mode {
		PollMode::Monitor => "monitoring",
		PollMode::Enroll => "enrollment process",
	};
	info!(
		target = "squirrel",
		course = %target.course_code,
		interval_secs = target.poll_interval.as_secs(),
		"Starting {activity} for {}",
		target.course_code
	);

	let result = client.poller(mode).watch(target, cancel).await;

	match result {
		Ok(exit) => Ok(exit),
		Err(err) if err.kind() == ErrorKind::SessionExpired => {
			error!(target = "squirrel", "Session expired, please login again");
			if let Err(clear_err) = client.invalidate_session() {
				warn!(target = "squirrel", error = %clear_err, "could not clear expired session");
			}
			Err(CliError::SessionInvalid)
		}
		Err(err) => Err(err.into()),
	}
}

async fn stop_on_signal(cancel: CancellationToken) {
	let reason = shutdown_signal().await;
	info!(target = "squirrel", "{reason}, shutting down...");
	cancel.cancel();
}

#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
	use tokio::signal::unix::{SignalKind, signal};

	let mut terminate = match signal(SignalKind::terminate()) {
		Ok(stream) => stream,
		Err(err) => {
			warn!(target = "squirrel", error = %err, "cannot listen for SIGTERM");
			let _ = tokio::signal::ctrl_c().await;
			return "Received stop signal";
		}
	};

	tokio::select! {
		_ = tokio::signal::ctrl_c() => "Received stop signal",
		_ = terminate.recv() => "Received termination signal",
	}
}

#[cfg(not(unix))]
async fn shutdown_signal() -> &'static str {
	let _ = tokio::signal::ctrl_c().await;
	"Received stop signal"
}
