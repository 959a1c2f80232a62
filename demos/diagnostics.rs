use {
    rotalog::{RotatingLoggerBuilder, RotationSize, TimeZone},
    std::{thread, time::Duration},
    tracing_subscriber::EnvFilter,
};

/// Shows the engine's own diagnostics (rotations, retention sweeps, failures)
/// on stderr while lines are echoed to stdout.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rotalog=debug")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut logger = RotatingLoggerBuilder::new("./logs", "tracing.log")
        .max_size(RotationSize::KB(1))
        .max_backups(2)
        .check_interval(Duration::from_millis(200))
        .time_zone(TimeZone::UTC)
        .console_output(true)
        .build()?;

    for i in 0..60 {
        logger.warn(format!("disk usage sample {i} above threshold"))?;
        thread::sleep(Duration::from_millis(20));
    }
    thread::sleep(Duration::from_millis(500));
    logger.shutdown();
    Ok(())
}
