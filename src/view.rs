//! State owned by the interactive thread and read by rendering

use ratatui::style::Color;
use std::collections::VecDeque;
use std::time::Instant;
use tokio::sync::watch;

use crate::coordinator::{ActivationId, Status};

/// The color the "Hello, world!" text is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualAttribute {
    pub color: Color,
    pub activation: Option<ActivationId>,
    pub committed_at: Option<Instant>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Scheduled,
    StatusCommitted(String),
    ColorCommitted(Color),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub activation: ActivationId,
    pub event: LogEvent,
    pub at: Instant,
}

pub struct ViewState {
    status: watch::Receiver<Status>,
    visual: VisualAttribute,
    in_flight: usize,
    log: VecDeque<LogEntry>,
    log_capacity: usize,
}

impl ViewState {
    pub fn new(status: watch::Receiver<Status>, initial_color: Color, log_capacity: usize) -> Self {
        Self {
            status,
            visual: VisualAttribute {
                color: initial_color,
                activation: None,
                committed_at: None,
            },
            in_flight: 0,
            log: VecDeque::with_capacity(log_capacity),
            log_capacity,
        }
    }

    /// Snapshot of the current Status
    pub fn status(&self) -> Status {
        self.status.borrow().clone()
    }

    pub fn visual(&self) -> VisualAttribute {
        self.visual
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Oldest first
    pub fn log(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        self.log.iter()
    }

    pub(crate) fn mark_scheduled(&mut self, activation: ActivationId) {
        self.in_flight += 1;
        self.record(activation, LogEvent::Scheduled, Instant::now());
    }

    pub(crate) fn note_status(&mut self, activation: ActivationId, text: String, at: Instant) {
        self.record(activation, LogEvent::StatusCommitted(text), at);
    }

    /// Commit the Visual Attribute. Only ever called from a job drained on
    /// the interactive thread.
    pub(crate) fn commit_color(&mut self, activation: ActivationId, color: Color) {
        let now = Instant::now();
        self.visual = VisualAttribute {
            color,
            activation: Some(activation),
            committed_at: Some(now),
        };
        self.in_flight = self.in_flight.saturating_sub(1);
        self.record(activation, LogEvent::ColorCommitted(color), now);
    }

    /// Activation finished on its worker without reaching the color commit
    pub(crate) fn abandon(&mut self, activation: ActivationId) {
        tracing::debug!(%activation, "activation abandoned");
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    fn record(&mut self, activation: ActivationId, event: LogEvent, at: Instant) {
        if self.log_capacity == 0 {
            return;
        }
        while self.log.len() >= self.log_capacity {
            self.log.pop_front();
        }
        self.log.push_back(LogEntry {
            activation,
            event,
            at,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(capacity: usize) -> ViewState {
        let (_tx, rx) = watch::channel(Status::default());
        ViewState::new(rx, Color::Blue, capacity)
    }

    #[test]
    fn test_initial_state() {
        let view = view(4);
        assert_eq!(view.status().text, "");
        assert_eq!(view.visual().color, Color::Blue);
        assert_eq!(view.visual().activation, None);
        assert_eq!(view.in_flight(), 0);
        assert_eq!(view.log().count(), 0);
    }

    #[test]
    fn test_log_drops_oldest_entries() {
        let mut view = view(2);
        view.mark_scheduled(ActivationId(1));
        view.mark_scheduled(ActivationId(2));
        view.mark_scheduled(ActivationId(3));

        let ids: Vec<_> = view.log().map(|e| e.activation).collect();
        assert_eq!(ids, vec![ActivationId(2), ActivationId(3)]);
        assert_eq!(view.in_flight(), 3);
    }

    #[test]
    fn test_color_commit_settles_in_flight() {
        let mut view = view(8);
        view.mark_scheduled(ActivationId(1));
        view.commit_color(ActivationId(1), Color::Green);

        let visual = view.visual();
        assert_eq!(visual.color, Color::Green);
        assert_eq!(visual.activation, Some(ActivationId(1)));
        assert!(visual.committed_at.is_some());
        assert_eq!(view.in_flight(), 0);
        assert_eq!(
            view.log().last().map(|e| &e.event),
            Some(&LogEvent::ColorCommitted(Color::Green))
        );
    }

    #[test]
    fn test_zero_capacity_disables_log() {
        let mut view = view(0);
        view.mark_scheduled(ActivationId(1));
        assert_eq!(view.log().count(), 0);
    }
}
