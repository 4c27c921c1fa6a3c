pub mod enroll;
pub mod login;

use squirrel::{AcornClient, Browser};
use tracing::warn;

use crate::cli::{Cli, Commands};
use crate::context::CommandContext;
use crate::error::Result;

pub async fn dispatch(cli: Cli) -> Result<()> {
	let ctx = CommandContext::from_cli(&cli)?;

	match cli.command {
		Commands::Login => login::run(&ctx).await,
		Commands::Enroll(args) => enroll::run(&ctx, &args).await,
	}
}

/// Closes the browser, logging instead of failing.
pub(crate) async fn close_quietly<B: Browser>(client: AcornClient<B>) {
	if let Err(err) = client.close().await {
		warn!(target = "squirrel", error = %err, "failed to close browser");
	}
}
