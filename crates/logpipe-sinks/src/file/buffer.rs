//! In-memory accumulation for asynchronous file writes.

use chrono::{DateTime, Local};

/// Buffered text taken out of an [`AsyncBuffer`], ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drained {
    /// Concatenated rendered events.
    pub text: String,
    /// Timestamp of the newest buffered event; rotation is decided on it.
    pub last_event_time: DateTime<Local>,
}

/// Append-only accumulator of rendered events.
///
/// The buffer remembers the timestamp of the most recent event it holds,
/// because rotation is keyed to event time rather than to the moment the
/// buffer happens to be written.
#[derive(Debug)]
pub struct AsyncBuffer {
    data: String,
    last_event_time: Option<DateTime<Local>>,
    threshold: usize,
}

impl AsyncBuffer {
    /// Creates an empty buffer that reports itself full past `threshold` bytes.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            data: String::with_capacity(threshold),
            last_event_time: None,
            threshold,
        }
    }

    /// Appends one rendered event.
    ///
    /// When the buffered size now exceeds the threshold the whole buffer is
    /// drained and returned so the caller can write it immediately.
    pub fn push(&mut self, rendered: &str, event_time: DateTime<Local>) -> Option<Drained> {
        self.data.push_str(rendered);
        self.last_event_time = Some(event_time);
        if self.data.len() > self.threshold {
            return self.take();
        }
        None
    }

    /// Drains the buffer if it holds anything.
    pub fn drain(&mut self) -> Option<Drained> {
        if self.data.is_empty() {
            return None;
        }
        self.take()
    }

    /// Buffered byte count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true when nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size past which [`push`](Self::push) drains.
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Changes the threshold. Takes effect on the next push.
    pub fn set_threshold(&mut self, threshold: usize) {
        self.threshold = threshold;
    }

    fn take(&mut self) -> Option<Drained> {
        let last_event_time = self.last_event_time.take()?;
        let text = std::mem::replace(&mut self.data, String::with_capacity(self.threshold));
        Some(Drained {
            text,
            last_event_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn at(hour: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn drains_only_past_threshold() {
        let mut buffer = AsyncBuffer::new(10);
        assert!(buffer.push("12345", at(1)).is_none());
        assert!(buffer.push("12345", at(2)).is_none());
        assert_eq!(buffer.len(), 10);

        let drained = buffer.push("x", at(3)).unwrap();
        assert_eq!(drained.text, "1234512345x");
        assert_eq!(drained.last_event_time, at(3));
        assert!(buffer.is_empty());
    }

    #[test]
    fn drain_reports_latest_event_time() {
        let mut buffer = AsyncBuffer::new(100);
        assert!(buffer.drain().is_none());

        buffer.push("a", at(5));
        buffer.push("b", at(5) + TimeDelta::minutes(3));
        let drained = buffer.drain().unwrap();
        assert_eq!(drained.text, "ab");
        assert_eq!(drained.last_event_time, at(5) + TimeDelta::minutes(3));
        assert!(buffer.drain().is_none());
    }

    #[test]
    fn threshold_change_applies_on_next_push() {
        let mut buffer = AsyncBuffer::new(100);
        buffer.push("0123456789", at(1));
        buffer.set_threshold(4);
        assert_eq!(buffer.threshold(), 4);
        assert_eq!(buffer.push("z", at(2)).unwrap().text, "0123456789z");
    }
}
