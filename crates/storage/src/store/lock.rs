#![forbid(unsafe_code)]

//! Cross-process write permit backed by an advisory lock on a file under the
//! store directory.
//!
//! Only mutating units of work take the permit; readers go straight to SQLite.
//! While the permit is held the lock file carries two lines, `pid:<n>` and
//! `time:<rfc3339>`, so a waiter that times out can report who is in the way.
//! The OS drops the advisory lock when the holder dies, so a record that names a
//! dead process is only a diagnostic lag, never a deadlock.

use super::config::LockConfig;
use super::error::StoreError;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const LOCK_FILE_NAME: &str = "write.lock";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HolderLiveness {
    Alive,
    /// The recorded process no longer exists.
    Stale,
    Unknown,
}

impl HolderLiveness {
    pub fn describe(self) -> &'static str {
        match self {
            HolderLiveness::Alive => "holder process is alive",
            HolderLiveness::Stale => "holder process no longer exists (stale record)",
            HolderLiveness::Unknown => "holder liveness unknown",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockHolder {
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
    pub liveness: HolderLiveness,
}

#[derive(Clone, Debug)]
pub struct WriteLock {
    path: PathBuf,
    config: LockConfig,
}

impl WriteLock {
    pub fn new(path: impl Into<PathBuf>, config: LockConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    pub fn in_dir(storage_dir: &Path, config: LockConfig) -> Self {
        Self::new(storage_dir.join(LOCK_FILE_NAME), config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Runs `work` while holding the permit. The permit is released on every exit
    /// path, including an error or panic inside `work`.
    pub fn with_permit<T, E>(&self, work: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let permit = self.acquire().map_err(E::from)?;
        let result = work();
        drop(permit);
        result
    }

    /// Current holder record, if the lock file names one.
    pub fn holder(&self) -> Option<LockHolder> {
        let contents = fs::read_to_string(&self.path).ok()?;
        let (pid, acquired_at) = parse_holder_record(&contents)?;
        Some(LockHolder {
            pid,
            acquired_at,
            liveness: probe_process(pid),
        })
    }

    fn acquire(&self) -> Result<HeldPermit, StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.path)?;

        let started = Instant::now();
        let mut delay = self.config.initial_backoff;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(err) if is_contended(&err) => {}
                Err(err) => return Err(err.into()),
            }

            let elapsed = started.elapsed();
            if elapsed >= self.config.timeout {
                let holder = self.holder();
                if let Some(holder) = holder.as_ref()
                    && holder.liveness == HolderLiveness::Stale
                {
                    warn!(
                        pid = holder.pid,
                        since = %holder.acquired_at.to_rfc3339(),
                        "write lock record names a process that no longer exists"
                    );
                }
                debug!(attempts, "write lock acquisition timed out");
                return Err(StoreError::LockTimeout {
                    timeout: self.config.timeout,
                    holder,
                });
            }

            std::thread::sleep(delay.min(self.config.timeout - elapsed));
            delay = next_backoff(delay, self.config.max_backoff);
        }

        let mut permit = HeldPermit { file };
        permit.write_holder_record()?;
        debug!(
            attempts,
            waited_ms = started.elapsed().as_millis() as u64,
            "write lock acquired"
        );
        Ok(permit)
    }
}

struct HeldPermit {
    file: File,
}

impl HeldPermit {
    fn write_holder_record(&mut self) -> Result<(), StoreError> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        write!(
            self.file,
            "pid:{}\ntime:{}\n",
            std::process::id(),
            Utc::now().to_rfc3339()
        )?;
        self.file.flush()?;
        Ok(())
    }
}

impl Drop for HeldPermit {
    fn drop(&mut self) {
        if let Err(err) = self.file.set_len(0) {
            warn!(error = %err, "failed to clear write lock holder record");
        }
        if let Err(err) = FileExt::unlock(&self.file) {
            warn!(error = %err, "failed to release write lock");
        }
        debug!("write lock released");
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn next_backoff(current: Duration, cap: Duration) -> Duration {
    current.saturating_mul(2).min(cap)
}

fn parse_holder_record(contents: &str) -> Option<(u32, DateTime<Utc>)> {
    let mut pid = None;
    let mut acquired_at = None;
    for line in contents.lines() {
        if let Some(raw) = line.strip_prefix("pid:") {
            pid = raw.trim().parse::<u32>().ok();
        } else if let Some(raw) = line.strip_prefix("time:") {
            acquired_at = DateTime::parse_from_rfc3339(raw.trim())
                .ok()
                .map(|value| value.with_timezone(&Utc));
        }
    }
    Some((pid?, acquired_at?))
}

#[cfg(unix)]
fn probe_process(pid: u32) -> HolderLiveness {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return HolderLiveness::Unknown;
    };
    match kill(Pid::from_raw(raw), None::<Signal>) {
        Ok(()) | Err(Errno::EPERM) => HolderLiveness::Alive,
        Err(Errno::ESRCH) => HolderLiveness::Stale,
        Err(_) => HolderLiveness::Unknown,
    }
}

#[cfg(not(unix))]
fn probe_process(_pid: u32) -> HolderLiveness {
    HolderLiveness::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_cap() {
        let cap = Duration::from_millis(50);
        let mut delay = Duration::from_millis(5);
        let mut schedule = vec![delay.as_millis()];
        for _ in 0..5 {
            delay = next_backoff(delay, cap);
            schedule.push(delay.as_millis());
        }
        assert_eq!(schedule, vec![5, 10, 20, 40, 50, 50]);
    }

    #[test]
    fn holder_record_parses_both_lines() {
        let (pid, at) =
            parse_holder_record("pid:4242\ntime:2026-10-18T09:30:00+00:00\n").expect("record");
        assert_eq!(pid, 4242);
        assert_eq!(at.to_rfc3339(), "2026-10-18T09:30:00+00:00");
    }

    #[test]
    fn truncated_or_partial_record_has_no_holder() {
        assert!(parse_holder_record("").is_none());
        assert!(parse_holder_record("pid:12\n").is_none());
        assert!(parse_holder_record("pid:abc\ntime:2026-10-18T09:30:00Z\n").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn own_process_is_alive() {
        assert_eq!(probe_process(std::process::id()), HolderLiveness::Alive);
    }
}
