use std::time::{Duration, Instant};

use crate::backend::Request;
use crate::pipeline::{ApiError, JobStatus};

use super::detail::PanelState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollTimer {
    interval: Duration,
    next_due: Instant,
}

impl PollTimer {
    pub fn start(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: now + interval,
        }
    }

    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.interval;
        true
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.next_due.saturating_duration_since(now)
    }
}

/// Log text of the selected job: one fetch on selection, interval polling
/// while the job runs, and live `log_line` appends in between.
///
/// Every fetch is numbered. A reply lands only if it is newer than the last
/// one applied and was issued under the current selection; selecting a job
/// raises the floor past every fetch issued before it.
#[derive(Debug)]
pub struct LogFollower {
    interval: Duration,
    job_id: Option<String>,
    text: PanelState<String>,
    timer: Option<PollTimer>,
    issued_seq: u64,
    applied_seq: u64,
    pub auto_scroll: bool,
}

impl LogFollower {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(250)),
            job_id: None,
            text: PanelState::Idle,
            timer: None,
            issued_seq: 0,
            applied_seq: 0,
            auto_scroll: true,
        }
    }

    pub fn text(&self) -> &PanelState<String> {
        &self.text
    }

    pub fn is_polling(&self) -> bool {
        self.timer.is_some()
    }

    fn issue(&mut self, job_id: String, poll: bool) -> Request {
        self.issued_seq += 1;
        Request::Log {
            job_id,
            seq: self.issued_seq,
            poll,
        }
    }

    pub fn select(
        &mut self,
        job_id: Option<&str>,
        status: Option<JobStatus>,
        now: Instant,
    ) -> Option<Request> {
        self.timer = None;
        self.job_id = job_id.map(str::to_owned);
        self.text = PanelState::Idle;
        self.applied_seq = self.issued_seq;

        let job_id = self.job_id.clone()?;
        self.text = PanelState::Loading;
        self.sync_status(status, now);
        Some(self.issue(job_id, false))
    }

    pub fn sync_status(&mut self, status: Option<JobStatus>, now: Instant) {
        let running = self.job_id.is_some() && status == Some(JobStatus::Running);
        match (running, self.timer.is_some()) {
            (true, false) => {
                tracing::debug!(job_id = ?self.job_id, "log polling started");
                self.timer = Some(PollTimer::start(self.interval, now));
            }
            (false, true) => {
                tracing::debug!(job_id = ?self.job_id, "log polling stopped");
                self.timer = None;
            }
            _ => {}
        }
    }

    pub fn tick(&mut self, now: Instant) -> Option<Request> {
        let timer = self.timer.as_mut()?;
        if !timer.fire_if_due(now) {
            return None;
        }
        let job_id = self.job_id.clone()?;
        Some(self.issue(job_id, true))
    }

    pub fn next_poll_in(&self, now: Instant) -> Option<Duration> {
        self.timer.map(|timer| timer.remaining(now))
    }

    pub fn refresh(&mut self) -> Option<Request> {
        let job_id = self.job_id.clone()?;
        if !matches!(self.text, PanelState::Ready(_)) {
            self.text = PanelState::Loading;
        }
        Some(self.issue(job_id, false))
    }

    pub fn apply_fetch(
        &mut self,
        job_id: &str,
        seq: u64,
        poll: bool,
        result: Result<String, ApiError>,
    ) -> bool {
        if self.job_id.as_deref() != Some(job_id) || seq <= self.applied_seq {
            tracing::debug!(
                job_id = %job_id,
                seq,
                applied = self.applied_seq,
                "discarding stale log reply"
            );
            return false;
        }
        self.applied_seq = seq;

        match result {
            Ok(text) => self.text = PanelState::Ready(text),
            Err(error) if poll && matches!(self.text, PanelState::Ready(_)) => {
                tracing::warn!(job_id = %job_id, %error, "log poll failed");
                return false;
            }
            Err(error) => {
                tracing::warn!(job_id = %job_id, %error, "log fetch failed");
                self.text = PanelState::Failed(error.to_string());
            }
        }
        true
    }

    pub fn on_log_line(&mut self, job_id: &str, line: &str) -> bool {
        if self.job_id.as_deref() != Some(job_id) {
            return false;
        }
        let PanelState::Ready(text) = &mut self.text else {
            return false;
        };
        text.push_str(line);
        text.push('\n');
        true
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const J1: &str = "Refine3D/job010";
    const J2: &str = "Class3D/job011";

    fn follower() -> LogFollower {
        LogFollower::new(Duration::from_secs(4))
    }

    fn seq_of(request: Option<Request>) -> u64 {
        match request {
            Some(Request::Log { seq, .. }) => seq,
            other => panic!("expected a log request, got {other:?}"),
        }
    }

    #[test]
    fn stale_log_fetch_does_not_touch_new_selection() {
        let now = Instant::now();
        let mut log = follower();
        let first = seq_of(log.select(Some(J1), Some(JobStatus::Running), now));
        let second = seq_of(log.select(Some(J2), Some(JobStatus::Finished), now));
        log.apply_fetch(J2, second, false, Ok("J2 log\n".to_owned()));

        assert!(!log.apply_fetch(J1, first, false, Ok("J1 log\n".to_owned())));
        assert_eq!(log.text(), &PanelState::Ready("J2 log\n".to_owned()));
    }

    #[test]
    fn older_fetch_cannot_overwrite_newer_text() {
        let now = Instant::now();
        let mut log = follower();
        let initial = seq_of(log.select(Some(J1), Some(JobStatus::Running), now));
        let refresh = seq_of(log.refresh());
        assert!(refresh > initial);

        assert!(log.apply_fetch(J1, refresh, false, Ok("line1\nline2\n".to_owned())));
        assert!(log.on_log_line(J1, "line3"));

        assert!(!log.apply_fetch(J1, initial, false, Ok("line1\n".to_owned())));
        assert_eq!(
            log.text(),
            &PanelState::Ready("line1\nline2\nline3\n".to_owned())
        );
    }

    #[test]
    fn reselecting_a_job_drops_replies_from_its_earlier_selection() {
        let now = Instant::now();
        let mut log = follower();
        let earlier = seq_of(log.select(Some(J1), Some(JobStatus::Finished), now));
        log.select(Some(J2), Some(JobStatus::Finished), now);
        let current = seq_of(log.select(Some(J1), Some(JobStatus::Finished), now));

        assert!(!log.apply_fetch(J1, earlier, false, Ok("stale\n".to_owned())));
        assert!(log.text().ready().is_none());

        assert!(log.apply_fetch(J1, current, false, Ok("fresh\n".to_owned())));
        assert!(!log.apply_fetch(J1, earlier, false, Ok("stale\n".to_owned())));
        assert_eq!(log.text(), &PanelState::Ready("fresh\n".to_owned()));
    }

    #[test]
    fn polls_only_while_running() {
        let start = Instant::now();
        let mut log = follower();
        let first = log.select(Some(J1), Some(JobStatus::Running), start);
        assert_matches!(first, Some(Request::Log { poll: false, .. }));
        assert!(log.is_polling());

        assert_eq!(log.tick(start + Duration::from_secs(1)), None);
        assert_matches!(
            log.tick(start + Duration::from_secs(4)),
            Some(Request::Log { poll: true, ref job_id, .. }) if job_id == J1
        );
        assert_eq!(log.tick(start + Duration::from_secs(5)), None);

        log.sync_status(Some(JobStatus::Finished), start + Duration::from_secs(6));
        assert!(!log.is_polling());
        assert_eq!(log.tick(start + Duration::from_secs(60)), None);
        assert_eq!(log.next_poll_in(start), None);
    }

    #[test]
    fn selection_change_clears_timer() {
        let now = Instant::now();
        let mut log = follower();
        log.select(Some(J1), Some(JobStatus::Running), now);
        assert!(log.is_polling());

        log.select(Some(J2), Some(JobStatus::Queued), now);
        assert!(!log.is_polling());

        log.select(None, None, now);
        assert!(!log.is_polling());
        assert_eq!(log.text(), &PanelState::Idle);
    }

    #[test]
    fn live_lines_append_only_for_selected_job() {
        let now = Instant::now();
        let mut log = follower();
        let seq = seq_of(log.select(Some(J1), Some(JobStatus::Running), now));
        assert!(!log.on_log_line(J1, "early"));

        log.apply_fetch(J1, seq, false, Ok("Iteration 1\n".to_owned()));
        assert!(log.on_log_line(J1, "Iteration 2"));
        assert!(!log.on_log_line(J2, "other job"));
        assert_eq!(
            log.text(),
            &PanelState::Ready("Iteration 1\nIteration 2\n".to_owned())
        );
    }

    #[test]
    fn failed_poll_keeps_existing_text() {
        let now = Instant::now();
        let mut log = follower();
        let seq = seq_of(log.select(Some(J1), Some(JobStatus::Running), now));
        log.apply_fetch(J1, seq, false, Ok("kept\n".to_owned()));
        let poll = seq_of(log.tick(now + Duration::from_secs(4)));

        let error = ApiError::Status {
            status: 502,
            url: "http://h/api/log/x".to_owned(),
        };
        assert!(!log.apply_fetch(J1, poll, true, Err(error)));
        assert_eq!(log.text(), &PanelState::Ready("kept\n".to_owned()));
    }

    #[test]
    fn failed_initial_fetch_is_shown_inline() {
        let now = Instant::now();
        let mut log = follower();
        let seq = seq_of(log.select(Some(J1), Some(JobStatus::Finished), now));
        let error = ApiError::Status {
            status: 404,
            url: "http://h/api/log/x".to_owned(),
        };
        log.apply_fetch(J1, seq, false, Err(error));
        assert_matches!(log.text(), PanelState::Failed(message) if message.contains("404"));
    }
}
