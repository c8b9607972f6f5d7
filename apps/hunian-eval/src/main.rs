use clap::Parser;

use hunian_eval::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	hunian_eval::run(args).await
}
