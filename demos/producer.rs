use {
    rotalog::{Fields, RotatingLoggerBuilder, RotationSize, Severity},
    std::{thread, time::Duration},
};

/// Many workers feeding one rotating log, as a busy service would.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut logger = RotatingLoggerBuilder::new("./logs", "application.log")
        .archive_pattern("application-{timestamp}.log")
        .max_size(RotationSize::MB(1))
        .max_backups(3)
        .check_interval(Duration::from_secs(1))
        .buffer_size(100)
        .min_severity(Severity::Info)
        .app_name("exampleApp")
        .build()?;

    let workers: Vec<_> = (0..100)
        .map(|worker| {
            let handle = logger.handle();
            thread::spawn(move || {
                for task in 0..1_000 {
                    let mut fields = Fields::new();
                    fields.insert("worker".into(), (worker as u64).into());
                    handle.log(
                        Severity::Info,
                        format!("This is an info log message from worker {worker}. With item: {task}"),
                        fields,
                    )?;
                }
                Ok::<_, rotalog::RotatingLoggerError>(())
            })
        })
        .collect();

    for worker in workers {
        if let Ok(Err(err)) = worker.join() {
            eprintln!("worker failed: {err}");
        }
    }

    // Give the monitor a chance to pick up the last overflow.
    thread::sleep(Duration::from_secs(2));
    logger.shutdown();
    Ok(())
}
