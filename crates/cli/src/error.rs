use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Engine(#[from] squirrel::Error),

	#[error("cannot locate a session file; pass --config or set SQUIRREL_CONFIG")]
	NoConfigPath,

	#[error("Missing UTORid or password")]
	MissingCredentials,

	#[error("Session expired, please login again (run `squirrel login`)")]
	SessionInvalid,

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
