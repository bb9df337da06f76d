//! Integration tests for the BLE echo firmware.
//!
//! Run after flashing the firmware. Connects over BLE, checks the echo
//! behaviour, then disconnects and reconnects to check re-advertising.

mod ble_client;

use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use ble_client::BleClient;
use tests::{print_results, run_connected_tests, run_test};

#[derive(Parser)]
#[command(name = "integration-tests")]
#[command(about = "Integration tests for the BLE echo firmware")]
struct Args {
    /// Advertised BLE device name
    #[arg(short, long, default_value = "ESP32 Echo")]
    name: String,

    /// BLE scan timeout in seconds
    #[arg(long, default_value = "10")]
    scan_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let scan_timeout = Duration::from_secs(args.scan_timeout);

    println!("{}", "BLE Echo Integration Tests".bold());
    println!("Device: \"{}\"", args.name);
    println!();

    println!("Scanning for \"{}\"...", args.name);
    let client = BleClient::connect_by_name(&args.name, scan_timeout).await?;
    println!("{}", "Connected!".green());

    println!("\nRunning tests...\n");
    let mut results = run_connected_tests(&client).await;

    client.disconnect().await?;
    // Give the device time to restart advertising
    tokio::time::sleep(Duration::from_millis(500)).await;

    let name = args.name.clone();
    results.push(
        run_test("Device re-advertises after disconnect", async move {
            let client = BleClient::connect_by_name(&name, scan_timeout).await?;
            let line = client.echo("again", Duration::from_secs(2)).await?;
            client.disconnect().await?;
            if line == "again\n" {
                Ok(())
            } else {
                Err(anyhow::anyhow!("Expected \"again\\n\", got {:?}", line))
            }
        })
        .await,
    );

    print_results(&results);

    // Exit with error code if any tests failed
    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
