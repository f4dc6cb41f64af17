use std::error::Error as StdError;
use std::net::SocketAddr;

use clap::{App, Arg};

use mnctl::mockserver::{routes, MockService};
use mnctl::telemetry;

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn StdError>> {
    let matches = App::new("emunet_mockserver")
        .about("In-memory emunet REST service for trying out mnctl")
        .arg(
            Arg::with_name("addr")
                .long("addr")
                .value_name("ADDR")
                .help("listening address")
                .takes_value(true)
                .default_value("127.0.0.1:3030"),
        )
        .arg(
            Arg::with_name("capacity")
                .long("capacity")
                .value_name("CAPACITY")
                .help("total number of devices the backend can host")
                .takes_value(true)
                .default_value("100"),
        )
        .get_matches();

    if let Err(e) = telemetry::init("info") {
        eprintln!("fail to initialize logging: {}", e);
    }

    let addr: SocketAddr = matches.value_of("addr").unwrap_or_default().parse()?;
    let capacity: u64 = matches.value_of("capacity").unwrap_or_default().parse()?;

    tracing::info!(%addr, capacity, "emunet mock service listening");
    warp::serve(routes(MockService::new(capacity))).run(addr).await;
    Ok(())
}
