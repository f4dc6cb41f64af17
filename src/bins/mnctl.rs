use std::error::Error as StdError;

use clap::App;
use tokio::io::BufReader;

use mnctl::cli::init_help;
use mnctl::command::op_help;
use mnctl::repl::Repl;
use mnctl::telemetry;

#[tokio::main(flavor = "current_thread")]
pub async fn main() -> Result<(), Box<dyn StdError>> {
    let usage = format!(
        "The first prompt accepts the initialization arguments:\n{}\nThe operation prompt accepts these subcommands:\n{}",
        init_help(),
        op_help()
    );
    let _ = App::new("mnctl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Interactive control client of the mocknet emulation service")
        .after_help(usage.as_str())
        .get_matches();

    if let Err(e) = telemetry::init("warn") {
        eprintln!("fail to initialize logging: {}", e);
    }

    let input = BufReader::new(tokio::io::stdin());
    let mut repl = Repl::new(input, std::io::stdout());

    let config = repl.initialize().await?;
    repl.setup(&config).await?;
    repl.run(&config).await?;
    Ok(())
}
