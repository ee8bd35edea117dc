use std::sync::mpsc;

pub type UiTask<T> = Box<dyn FnOnce(&mut T) + Send + 'static>;

/// Single-consumer queue bound to the UI context.
///
/// Any thread may submit work through a [`UiSender`]; tasks only run when the owner drains the
/// queue, in the order they were submitted.
pub struct UiQueue<T> {
    tx: mpsc::Sender<UiTask<T>>,
    rx: mpsc::Receiver<UiTask<T>>,
}

pub struct UiSender<T> {
    tx: mpsc::Sender<UiTask<T>>,
}

impl<T> Clone for UiSender<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T> UiSender<T> {
    /// Returns false once the queue has been dropped.
    pub fn submit<F>(&self, task: F) -> bool
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        self.tx.send(Box::new(task)).is_ok()
    }
}

impl<T> UiQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> UiSender<T> {
        UiSender { tx: self.tx.clone() }
    }

    pub fn drain(&self) -> Vec<UiTask<T>> {
        let mut tasks = Vec::new();
        while let Ok(task) = self.rx.try_recv() {
            tasks.push(task);
        }
        tasks
    }
}

impl<T> Default for UiQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn run_all<T>(queue: &UiQueue<T>, target: &mut T) -> usize {
        let tasks = queue.drain();
        let count = tasks.len();
        for task in tasks {
            task(target);
        }
        count
    }

    #[test]
    fn runs_tasks_in_submission_order() {
        let queue: UiQueue<Vec<u32>> = UiQueue::new();
        let sender = queue.sender();
        for value in 0..5 {
            assert!(sender.submit(move |log: &mut Vec<u32>| log.push(value)));
        }
        let mut log = Vec::new();
        assert_eq!(run_all(&queue, &mut log), 5);
        assert_eq!(log, vec![0, 1, 2, 3, 4]);
        assert_eq!(run_all(&queue, &mut log), 0);
    }

    #[test]
    fn accepts_work_from_other_threads() {
        let queue: UiQueue<Vec<&'static str>> = UiQueue::new();
        let sender = queue.sender();
        thread::spawn(move || {
            sender.submit(|log: &mut Vec<&'static str>| log.push("worker"));
        })
        .join()
        .expect("worker thread");
        let mut log = Vec::new();
        run_all(&queue, &mut log);
        assert_eq!(log, vec!["worker"]);
    }

    #[test]
    fn submit_fails_after_queue_is_dropped() {
        let queue: UiQueue<u32> = UiQueue::new();
        let sender = queue.sender();
        drop(queue);
        assert!(!sender.submit(|value: &mut u32| *value += 1));
    }
}
