use {
    crate::{
        archive::ARCHIVE_EXTENSION,
        error::{Result, RotatingLoggerError},
    },
    chrono::{DateTime, FixedOffset, Local, Offset as _, Utc},
    regex::Regex,
    std::time::Duration,
};

/// Placeholder substituted with the rotation time in archive names.
pub const TIMESTAMP_PLACEHOLDER: &str = "{timestamp}";

/// Second precision, lexical order equals chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Width of the zero-padded counter appended to same-second archive names.
const COLLISION_WIDTH: usize = 3;

/// Defines size thresholds for rotating log files in various units.
///
/// The active file is rotated once its size on disk strictly exceeds the
/// threshold at a poll instant. A file at exactly the threshold is left alone.
///
/// # Examples
/// ```
/// use rotalog::RotationSize;
///
/// assert_eq!(RotationSize::KB(2).bytes(), 2048);
/// assert_eq!(RotationSize::MB(1).bytes(), 1_048_576);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationSize {
    /// Raw byte count
    Bytes(u64),
    /// Kilobytes (1 KB = 1024 bytes)
    KB(u64),
    /// Megabytes (1 MB = 1024 KB = 1,048,576 bytes)
    MB(u64),
    /// Gigabytes (1 GB = 1024 MB = 1,073,741,824 bytes)
    GB(u64),
}

impl RotationSize {
    /// Get the threshold in bytes.
    pub fn bytes(&self) -> u64 {
        match self {
            RotationSize::Bytes(b) => *b,
            RotationSize::KB(kb) => kb.saturating_mul(1 << 10),
            RotationSize::MB(mb) => mb.saturating_mul(1 << 20),
            RotationSize::GB(gb) => gb.saturating_mul(1 << 30),
        }
    }
}

/// Specifies the time zone used for archive names and formatted log lines.
///
/// The offset is resolved once when the logger is built, so a `Local` zone
/// does not follow daylight saving changes of a long-running process.
#[derive(Debug, Clone)]
pub enum TimeZone {
    /// Use UTC time zone.
    UTC,
    /// Use the system's local time zone.
    Local,
    /// Use a fixed time zone offset.
    Fix(FixedOffset),
}

impl TimeZone {
    pub fn offset(&self) -> FixedOffset {
        match self {
            TimeZone::UTC => Utc.fix(),
            TimeZone::Local => Local::now().offset().to_owned(),
            TimeZone::Fix(fixed_offset) => *fixed_offset,
        }
    }
}

/// Template for rotated file names, e.g. `application-{timestamp}.log`.
///
/// The template must contain exactly one `{timestamp}` placeholder and no
/// path separators; archives always live next to the active file.
#[derive(Debug, Clone)]
pub struct ArchivePattern {
    prefix: String,
    suffix: String,
    matcher: Regex,
}

impl ArchivePattern {
    pub fn new(template: &str) -> Result<Self> {
        if template.contains('/') || template.contains('\\') {
            return Err(RotatingLoggerError::InvalidConfig(format!(
                "archive pattern '{template}' must be a file name, not a path"
            )));
        }
        let mut parts = template.split(TIMESTAMP_PLACEHOLDER);
        let (prefix, suffix) = match (parts.next(), parts.next(), parts.next()) {
            (Some(prefix), Some(suffix), None) => (prefix, suffix),
            _ => {
                return Err(RotatingLoggerError::InvalidConfig(format!(
                    "archive pattern '{template}' must contain exactly one {TIMESTAMP_PLACEHOLDER}"
                )))
            }
        };
        let matcher = Regex::new(&format!(
            r"^{}(?P<timestamp>\d{{4}}-\d{{2}}-\d{{2}}-\d{{2}}-\d{{2}}-\d{{2}})(?:-(?P<collision>\d+))?{}(?:\.{})?$",
            regex::escape(prefix),
            regex::escape(suffix),
            ARCHIVE_EXTENSION,
        ))
        .map_err(|err| RotatingLoggerError::InternalError(err.to_string()))?;

        Ok(ArchivePattern {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            matcher,
        })
    }

    /// Archive file name for a rotation at `at`. A non-zero `collision`
    /// disambiguates rotations that land in the same second.
    pub fn file_name(&self, at: &DateTime<FixedOffset>, collision: u32) -> String {
        let mut timestamp = at.format(TIMESTAMP_FORMAT).to_string();
        if collision > 0 {
            timestamp = format!("{timestamp}-{collision:0width$}", width = COLLISION_WIDTH);
        }
        format!("{}{}{}", self.prefix, timestamp, self.suffix)
    }

    /// Whether `file_name` is an archive produced by this pattern, compressed
    /// or not.
    pub fn matches(&self, file_name: &str) -> bool {
        self.matcher.is_match(file_name)
    }

    /// Rotation order of an archive: its timestamp, then its same-second
    /// counter. The unsuffixed name is the first rotation of its second,
    /// which plain string order gets wrong (`-` sorts before `.`).
    pub fn rotation_key(&self, file_name: &str) -> Option<(String, u32)> {
        let caps = self.matcher.captures(file_name)?;
        let collision = match caps.name("collision") {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        Some((caps.name("timestamp")?.as_str().to_string(), collision))
    }
}

/// How and when the active file is rotated and how many archives survive.
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    pub max_size: RotationSize,
    pub check_interval: Duration,
    pub max_backups: usize,
    pub compress: bool,
    pub archive_pattern: ArchivePattern,
}

impl RotationPolicy {
    /// Rotation is due only when the size strictly exceeds the threshold.
    pub fn should_rotate(&self, size: u64) -> bool {
        size > self.max_size.bytes()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, chrono::TimeZone as _};

    fn at(h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
        Utc.with_ymd_and_hms(2025, 4, 1, h, m, s).unwrap().fixed_offset()
    }

    #[test]
    fn threshold_is_strict() {
        let policy = RotationPolicy {
            max_size: RotationSize::Bytes(100),
            check_interval: Duration::from_secs(1),
            max_backups: 3,
            compress: false,
            archive_pattern: ArchivePattern::new("application-{timestamp}.log").unwrap(),
        };
        assert!(!policy.should_rotate(99));
        assert!(!policy.should_rotate(100));
        assert!(policy.should_rotate(101));
    }

    #[test]
    fn archive_names_sort_chronologically() {
        let pattern = ArchivePattern::new("application-{timestamp}.log").unwrap();
        let earlier = pattern.file_name(&at(9, 59, 59), 0);
        let later = pattern.file_name(&at(10, 0, 0), 0);
        assert_eq!(earlier, "application-2025-04-01-09-59-59.log");
        assert!(earlier < later);
        assert_eq!(pattern.file_name(&at(10, 0, 0), 2), "application-2025-04-01-10-00-00-002.log");
    }

    #[test]
    fn same_second_rotations_keep_their_order() {
        let pattern = ArchivePattern::new("application-{timestamp}.log").unwrap();
        let names: Vec<_> = [0, 1, 9, 10].iter().map(|&n| pattern.file_name(&at(10, 0, 0), n)).collect();

        let keys: Vec<_> = names.iter().map(|n| pattern.rotation_key(n).unwrap()).collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]), "{keys:?}");
        // Padded counters also sort as plain strings.
        assert!(names[1] < names[2] && names[2] < names[3]);

        let compressed = format!("{}.gz", names[3]);
        assert_eq!(pattern.rotation_key(&compressed), Some(keys[3].clone()));
        assert!(pattern.rotation_key(&pattern.file_name(&at(10, 0, 1), 0)).unwrap() > keys[3]);
        assert_eq!(pattern.rotation_key("application.log"), None);
    }

    #[test]
    fn huge_sizes_saturate() {
        assert_eq!(RotationSize::GB(u64::MAX).bytes(), u64::MAX);
        assert_eq!(RotationSize::MB(u64::MAX / 2).bytes(), u64::MAX);
        assert_eq!(RotationSize::GB(3).bytes(), 3 * 1_073_741_824);
    }

    #[test]
    fn matcher_accepts_raw_and_compressed_archives_only() {
        let pattern = ArchivePattern::new("application-{timestamp}.log").unwrap();
        assert!(pattern.matches("application-2025-04-01-10-00-00.log"));
        assert!(pattern.matches("application-2025-04-01-10-00-00.log.gz"));
        assert!(pattern.matches("application-2025-04-01-10-00-00-003.log.gz"));
        assert!(!pattern.matches("application.log"));
        assert!(!pattern.matches("application-2025-04-01.log"));
        assert!(!pattern.matches("application-2025-04-01-10-00-00.log.bak"));
        assert!(!pattern.matches("other-2025-04-01-10-00-00.log"));
    }

    #[test]
    fn pattern_metacharacters_are_escaped() {
        let pattern = ArchivePattern::new("svc.{timestamp}.log").unwrap();
        assert!(pattern.matches("svc.2025-04-01-10-00-00.log"));
        assert!(!pattern.matches("svcX2025-04-01-10-00-00.log"));
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        assert!(ArchivePattern::new("application.log").is_err());
        assert!(ArchivePattern::new("{timestamp}-{timestamp}.log").is_err());
        assert!(ArchivePattern::new("old/{timestamp}.log").is_err());
    }
}
