use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = hunian_api::Args::parse();

	hunian_api::run(args).await
}
