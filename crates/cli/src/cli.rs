use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use squirrel::{EnrollmentTarget, PollMode};

#[derive(Parser, Debug)]
#[command(name = "squirrel")]
#[command(about = "Watch ACORN for open seats and enroll when one appears")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v debug, -vv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Session file (defaults to $SQUIRREL_CONFIG or ~/.squirrel/config.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Run the browser without a window
	#[arg(long, global = true)]
	pub headless: bool,

	/// Path to the chromedriver executable
	#[arg(long, global = true, value_name = "PATH")]
	pub driver: Option<PathBuf>,

	/// Port for chromedriver (defaults to a free port)
	#[arg(long, global = true, value_name = "PORT")]
	pub driver_port: Option<u16>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Log in to ACORN and save the session
	Login,

	/// Watch a course and enroll when a seat opens
	Enroll(EnrollArgs),
}

#[derive(Args, Debug, Clone)]
pub struct EnrollArgs {
	/// Course code (e.g., CSC108H1)
	#[arg(short, long, value_name = "CODE")]
	pub course: String,

	/// Section code (F/S/Y)
	#[arg(short, long, value_name = "CODE", default_value = "F")]
	pub section: String,

	/// Seconds to wait between checks
	#[arg(short, long, value_name = "SECONDS", default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
	pub wait: u64,

	/// Tutorial sections (comma separated)
	#[arg(short, long = "tutorial", value_name = "SECTIONS", value_delimiter = ',')]
	pub tutorials: Vec<String>,

	/// Lecture sections (comma separated)
	#[arg(short, long = "lecture", value_name = "SECTIONS", value_delimiter = ',')]
	pub lectures: Vec<String>,

	/// Only report open seats, never enroll
	#[arg(short, long)]
	pub monitor: bool,
}

impl EnrollArgs {
	pub fn mode(&self) -> PollMode {
		if self.monitor { PollMode::Monitor } else { PollMode::Enroll }
	}

	/// Builds the watch target, deriving session codes from `today`.
	pub fn target(&self, today: NaiveDate) -> EnrollmentTarget {
		EnrollmentTarget::new(&self.course, &self.section, today)
			.with_lectures(self.lectures.iter().map(String::as_str))
			.with_tutorials(self.tutorials.iter().map(String::as_str))
			.with_poll_interval(std::time::Duration::from_secs(self.wait))
	}
}
