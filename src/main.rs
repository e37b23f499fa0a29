use color_eyre::{eyre::eyre, Result};
use joyroute::config::RouterSettings;
use joyroute::device::{
    DerivedEvent, DeviceLayout, DeviceRouter, EventInjector, EventKind, RawEventKind,
    RouterHandle,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const BUTTONS: u8 = 4;
const HATS: u8 = 1;
const AXIS_MAX: i32 = 32767;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let settings = RouterSettings::load_or_default().await?;
    info!("Simulating a device with {} buttons and {} hat", BUTTONS, HATS);

    let layout = DeviceLayout::sequential(BUTTONS, HATS);
    let (mut router, injector) = DeviceRouter::with_injector(layout, settings)
        .map_err(|e| eyre!("Failed to create router: {}", e))?;

    // every stream gets its own logging consumer
    let mut consumers = Vec::new();
    for kind in EventKind::ALL {
        let numbers = if kind.is_button() { 0..BUTTONS } else { 0..HATS };
        for number in numbers {
            let receiver = router.register_with_capacity(kind, number, 16);
            consumers.push(spawn_consumer(kind, number, receiver));
        }
    }

    let handle = RouterHandle::spawn(router);
    let snapshot = handle.snapshot();

    run_script(&injector).await?;
    drop(injector);

    let stats = handle.join().await?;
    for consumer in consumers {
        consumer.await?;
    }

    let last = snapshot.borrow();
    info!(
        "Final state: button 1 pressed={}, hat 0 at {:?}",
        last.button_pressed(1),
        last.hat_position(0)
    );
    info!("Simulation finished: {:?}", stats);
    Ok(())
}

/// Short press, long press, then a hat swept to an edge and back to rest
async fn run_script(injector: &EventInjector) -> Result<()> {
    let script: [(u64, RawEventKind, u8, i32); 10] = [
        (0, RawEventKind::Button, 0, 1),
        (200, RawEventKind::Button, 0, 0),
        (500, RawEventKind::Button, 1, 1),
        (2000, RawEventKind::Button, 1, 0),
        (2100, RawEventKind::HatAxis, 0, AXIS_MAX / 2),
        (2150, RawEventKind::HatAxis, 0, AXIS_MAX),
        (2200, RawEventKind::HatAxis, 1, -AXIS_MAX),
        (2300, RawEventKind::HatAxis, 0, 0),
        (2350, RawEventKind::HatAxis, 1, 0),
        (2400, RawEventKind::Unknown(0x04), 0, 0),
    ];

    for (ms, kind, index, value) in script {
        injector
            .inject_at(Duration::from_millis(ms), value, kind, index)
            .await?;
    }
    Ok(())
}

fn spawn_consumer(
    kind: EventKind,
    number: u8,
    mut receiver: mpsc::Receiver<DerivedEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            info!(
                "[{} #{}] at {:>5}ms: {:?}",
                kind,
                number,
                event.moment().as_millis(),
                event
            );
        }
    })
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
