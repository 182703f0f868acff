//! Binary entrypoint that launches the clinic desk agent.
//! Run with: cargo run --bin clinicdesk-server

use std::process::ExitCode;

use clinicdesk_agent::start_desk_agent;

fn main() -> ExitCode {
    start_desk_agent::run()
}
