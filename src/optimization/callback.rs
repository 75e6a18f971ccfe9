use super::solvers::traits::{StepEvent, StepObserver};
use crossbeam::channel::{Receiver, Sender, unbounded};
use tracing::info;

/// Observer that ignores every step
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl StepObserver for NoopObserver {
    fn on_step(&mut self, _event: &StepEvent) -> Result<(), String> {
        Ok(())
    }
}

/// Logs one progress line per step and keeps the best-fitness trace
#[derive(Debug, Default)]
pub struct LoggingObserver {
    label: String,
    trace: Vec<Option<f64>>,
}

impl LoggingObserver {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            trace: Vec::new(),
        }
    }

    /// Best fitness after each observed step
    pub fn trace(&self) -> &[Option<f64>] {
        &self.trace
    }
}

impl StepObserver for LoggingObserver {
    fn on_step(&mut self, event: &StepEvent) -> Result<(), String> {
        self.trace.push(event.best_fitness);
        info!(
            run = %self.label,
            step = event.step,
            best_fitness = ?event.best_fitness,
            converged = event.nominally_converged,
            outside_steps = event.outside_step_counter,
            evaluations = event.compute_counter,
            "step complete"
        );
        Ok(())
    }
}

/// Forwards step events to another thread (typically a UI or plotting loop).
///
/// Dropping the receiving side requests a stop before the next step.
#[derive(Debug)]
pub struct ChannelObserver {
    sender: Sender<StepEvent>,
    disconnected: bool,
}

impl ChannelObserver {
    pub fn new(sender: Sender<StepEvent>) -> Self {
        Self {
            sender,
            disconnected: false,
        }
    }

    /// Observer plus the receiving end of a fresh unbounded channel
    pub fn channel() -> (Self, Receiver<StepEvent>) {
        let (sender, receiver) = unbounded();
        (Self::new(sender), receiver)
    }
}

impl StepObserver for ChannelObserver {
    fn on_step(&mut self, event: &StepEvent) -> Result<(), String> {
        if self.sender.send(event.clone()).is_err() {
            self.disconnected = true;
        }
        Ok(())
    }

    fn should_stop(&self) -> bool {
        self.disconnected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(step: usize, best: f64) -> StepEvent {
        StepEvent {
            step,
            best_fitness: Some(best),
            best_position: vec![0.5],
            nominally_converged: false,
            outside_step_counter: step,
            compute_counter: step * 4,
        }
    }

    #[test]
    fn test_logging_observer_keeps_trace() {
        let mut observer = LoggingObserver::new("tilt");
        observer.on_step(&event(1, 0.5)).unwrap();
        observer.on_step(&event(2, 0.8)).unwrap();
        assert_eq!(observer.trace(), &[Some(0.5), Some(0.8)]);
        assert!(!observer.should_stop());
    }

    #[test]
    fn test_channel_observer_forwards_events() {
        let (mut observer, receiver) = ChannelObserver::channel();
        observer.on_step(&event(1, 0.1)).unwrap();
        observer.on_step(&event(2, 0.2)).unwrap();

        let received: Vec<StepEvent> = receiver.try_iter().collect();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1].step, 2);
        assert!(!observer.should_stop());
    }

    #[test]
    fn test_channel_observer_stops_when_receiver_dropped() {
        let (mut observer, receiver) = ChannelObserver::channel();
        drop(receiver);
        observer.on_step(&event(1, 0.1)).unwrap();
        assert!(observer.should_stop());
    }
}
