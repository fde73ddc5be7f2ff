use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = mmp_api::Args::parse();

	mmp_api::run(args).await
}
