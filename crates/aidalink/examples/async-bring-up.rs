//! Async bring-up against a simulated robot, then one transcript request.
//!
//! Run with:
//!   cargo run --example async-bring-up --features async

use aidalink::session::{AsyncRobotLink, RobotSimulator, Settings, SimulatorConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let simulator = RobotSimulator::bind("127.0.0.1:0", SimulatorConfig::default())?.spawn()?;
    let addr = simulator.local_addr();

    let link = AsyncRobotLink::default();
    let report = link
        .bring_up(Settings::new(addr.ip().to_string(), addr.port()))
        .await?;
    eprintln!("[client] complete bring-up: {}", report.is_complete());

    link.request_stt().await?;
    eprintln!("[client] transcript: {}", link.receive_stt().await?);

    link.disconnect().await?;
    Ok(())
}
