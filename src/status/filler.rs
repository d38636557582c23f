//! Rotating filler messages shown while a call is in flight.
//!
//! Owned by the caller: start it when an operation starts, drop or
//! [`stop`](FillerRotation::stop) it when the operation ends.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;

/// Filler lines shown while waiting on the wallet or the chain.
pub const PRIVACY_FILLERS: [&str; 10] = [
    "Shh... encrypting your secrets 🤫",
    "Hiding data from nosy squirrels 🐿️",
    "Scrambling bytes like a secret recipe 🧪",
    "Putting your age in a velvet bag 👜",
    "Mixing in cryptographic glitter ✨",
    "Sealing your info in a tiny safe 🔐",
    "Masking details like a mystery novel 🕵️",
    "Whispering your age to the blockchain winds 🌬️",
    "Cooking privacy, low heat, high secrecy 🍳",
    "Wrapping data in a cloak of stealth 🦉",
];

/// A running filler rotation. Cancelled on drop.
#[derive(Debug)]
pub struct FillerRotation {
    task: Option<JoinHandle<()>>,
}

impl FillerRotation {
    /// Call `show` with the next filler every `period`, starting immediately.
    pub fn start<F>(period: Duration, mut show: F) -> Self
    where
        F: FnMut(&'static str) + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            for filler in PRIVACY_FILLERS.iter().cycle() {
                ticker.tick().await;
                show(*filler);
            }
        });
        Self { task: Some(task) }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn stop(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for FillerRotation {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test(start_paused = true)]
    async fn test_rotation_cycles_and_stops() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let rotation = FillerRotation::start(Duration::from_millis(1200), move |line| {
            sink.lock().unwrap().push(line);
        });
        assert!(rotation.is_running());

        tokio::time::sleep(Duration::from_millis(2500)).await;
        rotation.stop();

        let count = seen.lock().unwrap().len();
        assert!(count >= 2, "only {} fillers shown", count);
        assert_eq!(seen.lock().unwrap()[0], PRIVACY_FILLERS[0]);
        assert_eq!(seen.lock().unwrap()[1], PRIVACY_FILLERS[1]);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(seen.lock().unwrap().len(), count);
    }
}
