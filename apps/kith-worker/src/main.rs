use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	kith_worker::run(kith_worker::Args::parse()).await
}
