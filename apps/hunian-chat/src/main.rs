use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = hunian_chat::Args::parse();

	hunian_chat::run(args).await
}
