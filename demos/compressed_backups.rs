use {
    rotalog::{RotatingLoggerBuilder, RotationSize},
    std::{thread, time::Duration},
};

const LOG_FOLDER: &str = "./logs/compressed";

/// Rotates a small file many times and prints what retention left behind.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut logger = RotatingLoggerBuilder::new(LOG_FOLDER, "sized.log")
        .max_size(RotationSize::KB(64))
        .max_backups(5)
        .check_interval(Duration::from_millis(100))
        .file_mode(0o640)
        .build()?;

    for i in 1..=20_000 {
        logger.info(format!(
            "Log entry #{i}: This is a sample log message that will contribute to file size"
        ))?;
        if i % 2_000 == 0 {
            logger.sync()?;
            thread::sleep(Duration::from_millis(250));
        }
    }
    logger.shutdown();

    println!("File | Bytes");
    for entry in std::fs::read_dir(LOG_FOLDER)?.flatten() {
        let size = entry.metadata().map_or(0, |m| m.len());
        println!("{:?} : {size}", entry.file_name());
    }
    Ok(())
}
