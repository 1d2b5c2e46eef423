use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = doclea_api::Args::parse();
	doclea_api::run(args).await
}
