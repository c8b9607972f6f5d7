use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = hunian_ingest::Args::parse();

	hunian_ingest::run(args).await
}
