//! Weekly program example.
//!
//! Reads the first heating program of circuit 1 and prints every defined
//! switch point, then adds a Saturday morning switch-on.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p emsbus --example weekly_program
//! ```

use emsbus::{ACTION_ON, EmsBuilder, HeatingCircuit, ProgramSlot, SwitchProgram};

const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = EmsBuilder::new().serial_port("/dev/ttyUSB0").build().await?;

    let program = SwitchProgram::Heating(HeatingCircuit::Hc1, ProgramSlot::First);
    let mut free = None;

    for index in 0..emsbus::protocol::catalog::SWITCH_POINTS {
        let point = client.get_switch_point(program, index).await?;
        if point.is_undefined() {
            free.get_or_insert(index);
            continue;
        }
        let day = DAYS.get(point.day as usize).copied().unwrap_or("???");
        let action = if point.action == ACTION_ON { "on" } else { "off" };
        println!(
            "#{:02} {} {:02}:{:02} {}",
            point.index, day, point.hour, point.minute, action
        );
    }

    match free {
        Some(index) => {
            println!("Adding Sat 07:30 on at slot {index}");
            client
                .set_program_switch_point(program, index, ACTION_ON, 5, 7, 30)
                .await?;
        }
        None => println!("Program is full"),
    }

    client.close().await?;
    Ok(())
}
