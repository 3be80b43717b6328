use core::cell::Cell;

/// A single-slot mailbox shared between cooperatively scheduled tasks.
///
/// Writes overwrite the slot and reads never consume it. Before the first
/// write [`get`](SharedChannel::get) returns `T::default()`, so a consumer
/// polling an unwritten channel sees the same value as "not ready yet".
///
/// The slot is a plain [`Cell`], which is only sound because tasks never
/// interleave inside a scheduler step. A task must not assume a value it
/// read stays current once it has returned to the scheduler.
pub struct SharedChannel<T> {
    name: &'static str,
    value: Cell<T>,
}

impl<T> SharedChannel<T>
where
    T: Copy + Default,
{
    /// Create an empty channel holding `T::default()`.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            value: Cell::new(T::default()),
        }
    }

    /// Replace the stored value.
    pub fn put(&self, value: T) {
        self.value.set(value);
    }

    /// Read the last written value (or the default).
    pub fn get(&self) -> T {
        self.value.get()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::SharedChannel;

    #[test]
    fn empty_channel_reads_default() {
        let start: SharedChannel<bool> = SharedChannel::new("start");
        assert!(!start.get());

        let angle: SharedChannel<f64> = SharedChannel::new("angle");
        assert_eq!(angle.get(), 0.);
    }

    #[test]
    fn last_write_wins_and_reads_repeat() {
        let channel = SharedChannel::new("count");
        channel.put(3u8);
        channel.put(7u8);

        assert_eq!(channel.get(), 7);
        assert_eq!(channel.get(), 7);
        assert_eq!(channel.name(), "count");
    }
}
