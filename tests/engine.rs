use {
    chrono::{Duration as ChronoDuration, TimeZone as _, Utc},
    flate2::read::GzDecoder,
    rotalog::{
        Fields, Formatter, LogRecord, ManualClock, RotatingLoggerBuilder, RotationSize, Severity, APP_NAME_FIELD,
    },
    std::{
        collections::HashSet,
        fs,
        io::Read as _,
        path::{Path, PathBuf},
        sync::Arc,
        thread,
        time::{Duration, Instant},
    },
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `message\n`, so line sizes are known up front.
struct Plain;

impl Formatter for Plain {
    fn format(&self, record: &LogRecord) -> String {
        format!("{}\n", record.message)
    }
}

/// Sleeps before every record to make the writer the bottleneck.
struct Slow(Duration);

impl Formatter for Slow {
    fn format(&self, record: &LogRecord) -> String {
        thread::sleep(self.0);
        format!("{}\n", record.message)
    }
}

fn wait_for(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(10));
    }
}

fn archives(dir: &Path) -> Vec<PathBuf> {
    let mut found: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            let name = p.file_name().unwrap().to_string_lossy().into_owned();
            name.starts_with("application-") && name != "application.log"
        })
        .collect();
    found.sort();
    found
}

fn read_archive(path: &Path) -> String {
    let mut content = String::new();
    if path.extension().is_some_and(|ext| ext == "gz") {
        GzDecoder::new(fs::File::open(path).unwrap())
            .read_to_string(&mut content)
            .unwrap();
    } else {
        content = fs::read_to_string(path).unwrap();
    }
    content
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(u64::MAX)
}

#[test]
fn crossing_one_megabyte_rotates_exactly_once() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut logger = RotatingLoggerBuilder::new(dir.path(), Path::new("application.log"))
        .max_size(RotationSize::MB(1))
        .max_backups(3)
        .check_interval(Duration::from_millis(20))
        .formatter(Plain)
        .build()
        .unwrap();

    // 99 characters plus newline per line.
    let line = |i: usize| format!("{i:08} {}", "x".repeat(90));
    let lines = 1024 * 1024 / 100 + 1;
    for i in 0..lines {
        logger.info(line(i)).unwrap();
    }
    logger.sync().unwrap();

    let active = logger.active_path().to_path_buf();
    // The raw rotated file disappears only once its archive is complete.
    wait_for("compressed archive", || {
        let found = archives(dir.path());
        found.len() == 1 && found[0].extension().is_some_and(|e| e == "gz")
    });
    // A further tick must not rotate the now empty file again.
    thread::sleep(Duration::from_millis(100));

    let found = archives(dir.path());
    assert_eq!(found.len(), 1, "{found:?}");
    assert_eq!(file_len(&active), 0);

    let content = read_archive(&found[0]);
    let restored: Vec<_> = content.lines().collect();
    assert_eq!(restored.len(), lines);
    assert_eq!(restored[0], line(0));
    assert_eq!(restored[lines - 1], line(lines - 1));
    logger.shutdown();
}

#[test]
fn five_rotations_leave_three_newest_archives() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 4, 1, 10, 0, 0).unwrap()));
    let mut logger = RotatingLoggerBuilder::new(dir.path(), Path::new("application.log"))
        .max_size(RotationSize::Bytes(256))
        .max_backups(3)
        .check_interval(Duration::from_millis(10))
        .time_zone(rotalog::TimeZone::UTC)
        .clock(clock.clone())
        .formatter(Plain)
        .build()
        .unwrap();
    let active = logger.active_path().to_path_buf();

    let mut expected = Vec::new();
    for round in 0..5 {
        // One record per round, larger than the limit on its own.
        logger.info(format!("round {round} {}", "y".repeat(300))).unwrap();
        logger.sync().unwrap();
        let name = format!("application-2025-04-01-10-00-{:02}.log.gz", round);
        let archive = dir.path().join(&name);
        wait_for(&name, || archive.exists() && file_len(&active) == 0);
        expected.push(archive);
        clock.advance(ChronoDuration::seconds(1));
        // Distinct modification times between rounds.
        thread::sleep(Duration::from_millis(20));
    }
    logger.shutdown();

    assert_eq!(archives(dir.path()), expected[2..].to_vec());
    assert!(read_archive(&expected[4]).starts_with("round 4 "));
}

#[test]
fn full_queue_blocks_producer_without_dropping() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut logger = RotatingLoggerBuilder::new(dir.path(), Path::new("application.log"))
        .buffer_size(2)
        .formatter(Slow(Duration::from_millis(20)))
        .build()
        .unwrap();

    let started = Instant::now();
    for i in 0..10 {
        logger.info(format!("record {i}")).unwrap();
    }
    // Ten records through a queue of two with a 20ms writer: at least seven
    // must be written before the last enqueue is accepted.
    assert!(started.elapsed() >= Duration::from_millis(100), "{:?}", started.elapsed());

    logger.sync().unwrap();
    let content = fs::read_to_string(logger.active_path()).unwrap();
    let expected: Vec<_> = (0..10).map(|i| format!("record {i}")).collect();
    assert_eq!(content.lines().collect::<Vec<_>>(), expected);
    logger.shutdown();
}

#[test]
fn concurrent_producers_lose_nothing_across_rotations() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut logger = RotatingLoggerBuilder::new(dir.path(), Path::new("application.log"))
        .max_size(RotationSize::KB(4))
        .max_backups(10_000)
        .check_interval(Duration::from_millis(5))
        .buffer_size(16)
        .formatter(Plain)
        .build()
        .unwrap();

    let producers: Vec<_> = (0..8)
        .map(|p| {
            let handle = logger.handle();
            thread::spawn(move || {
                for i in 0..250 {
                    handle.info(format!("producer {p} record {i:03}")).unwrap();
                    if i % 50 == 0 {
                        thread::sleep(Duration::from_millis(5));
                    }
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    logger.shutdown();

    let mut seen = HashSet::new();
    let mut files = archives(dir.path());
    files.push(dir.path().join("application.log"));
    for file in &files {
        for line in read_archive(file).lines() {
            assert!(seen.insert(line.to_string()), "duplicate line {line}");
        }
    }
    assert_eq!(seen.len(), 8 * 250);
    assert!(files.len() > 2, "expected several rotations, got {files:?}");
}

#[test]
fn records_below_the_floor_are_discarded() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut logger = RotatingLoggerBuilder::new(dir.path(), Path::new("application.log"))
        .min_severity(Severity::Warn)
        .formatter(Plain)
        .build()
        .unwrap();

    logger.debug("debug").unwrap();
    logger.info("info").unwrap();
    logger.warn("warn").unwrap();
    logger.error("error").unwrap();
    logger.fatal("fatal").unwrap();
    logger.sync().unwrap();

    assert_eq!(fs::read_to_string(logger.active_path()).unwrap(), "warn\nerror\nfatal\n");
    logger.shutdown();
}

#[test]
fn shutdown_drains_queued_records() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut logger = RotatingLoggerBuilder::new(dir.path(), Path::new("application.log"))
        .buffer_size(64)
        .formatter(Slow(Duration::from_millis(2)))
        .build()
        .unwrap();
    let active = logger.active_path().to_path_buf();

    for i in 0..50 {
        logger.info(format!("queued {i}")).unwrap();
    }
    logger.shutdown();

    assert_eq!(fs::read_to_string(active).unwrap().lines().count(), 50);
}

#[test]
fn default_formatter_writes_journal_lines() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut logger = RotatingLoggerBuilder::new(dir.path(), Path::new("application.log"))
        .app_name("billing")
        .build()
        .unwrap();

    logger.info("invoice sent").unwrap();
    let mut fields = Fields::new();
    fields.insert(APP_NAME_FIELD.to_string(), "mailer".into());
    logger.log(Severity::Error, "bounce", fields).unwrap();
    logger.sync().unwrap();

    let content = fs::read_to_string(logger.active_path()).unwrap();
    let lines: Vec<_> = content.lines().collect();
    let pid = std::process::id();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(&format!(" billing[{pid}]: invoice sent")), "{}", lines[0]);
    assert!(lines[1].ends_with(&format!(" mailer[{pid}]: bounce")), "{}", lines[1]);
    logger.shutdown();
}

#[test]
fn existing_active_file_is_appended_to() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("application.log"), "from before\n").unwrap();

    let mut logger = RotatingLoggerBuilder::new(dir.path(), Path::new("application.log"))
        .formatter(Plain)
        .build()
        .unwrap();
    logger.info("after restart").unwrap();
    logger.shutdown();

    assert_eq!(
        fs::read_to_string(dir.path().join("application.log")).unwrap(),
        "from before\nafter restart\n"
    );
}
