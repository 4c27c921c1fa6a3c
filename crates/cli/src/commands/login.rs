use colored::Colorize;
use tracing::{error, info};

use crate::commands::close_quietly;
use crate::context::CommandContext;
use crate::credentials;
use crate::error::Result;

/// Signs in interactively and saves the session for later `enroll` runs.
pub async fn run(ctx: &CommandContext) -> Result<()> {
	let store = ctx.open_store();
	let credentials = credentials::resolve(&store.config().utorid).await?;

	info!(target = "squirrel", utorid = %credentials.utorid, path = %store.path().display(), "logging in");
	let mut client = ctx.connect(store).await?;

	let result = client.login(&credentials).await;
	close_quietly(client).await;

	match result {
		Ok(()) => {
			println!("{} Successfully logged in and saved session", "✓".green());
			Ok(())
		}
		Err(err) => {
			error!(target = "squirrel", error = %err, "Login failed");
			Err(err.into())
		}
	}
}
