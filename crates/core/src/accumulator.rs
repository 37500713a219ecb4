//! Append-only slide collection for one in-flight presentation.

use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::types::{Presentation, PresentationStatus, Slide};

/// Sole owner of a presentation while it is being generated.
///
/// `append` is the only way slides enter the list and nothing removes or
/// reorders them. Every change is published as a fresh snapshot; observers
/// hold a [`watch::Receiver`] and never touch the live list.
#[derive(Debug)]
pub struct PresentationAccumulator {
    presentation: Presentation,
    publisher: watch::Sender<Presentation>,
}

impl PresentationAccumulator {
    /// Start accumulating a pending presentation.
    pub fn new(presentation: Presentation) -> Self {
        let (publisher, _) = watch::channel(presentation.clone());
        Self {
            presentation,
            publisher,
        }
    }

    /// Subscribe to snapshots. The receiver starts at the current state.
    pub fn subscribe(&self) -> watch::Receiver<Presentation> {
        self.publisher.subscribe()
    }

    /// Read-only view of the current state.
    pub fn snapshot(&self) -> &Presentation {
        &self.presentation
    }

    /// Consume the accumulator, returning the presentation.
    pub fn into_presentation(self) -> Presentation {
        self.presentation
    }

    pub fn status(&self) -> PresentationStatus {
        self.presentation.status
    }

    pub fn len(&self) -> usize {
        self.presentation.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presentation.slides.is_empty()
    }

    /// Ordinal the next appended slide will receive.
    pub fn next_index(&self) -> usize {
        self.presentation.slides.len()
    }

    /// Move from pending to streaming. Idempotent while streaming.
    pub fn mark_streaming(&mut self) -> Result<()> {
        match self.presentation.status {
            PresentationStatus::Pending => {
                log::debug!("Presentation {} is streaming", self.presentation.id);
                self.presentation.status = PresentationStatus::Streaming;
                self.publish();
                Ok(())
            }
            PresentationStatus::Streaming => Ok(()),
            status => Err(Error::PresentationClosed(status)),
        }
    }

    /// Append a slide, assigning it the next sequential index.
    ///
    /// Returns the slide as stored.
    pub fn append(&mut self, mut slide: Slide) -> Result<&Slide> {
        if self.presentation.status.is_terminal() {
            return Err(Error::PresentationClosed(self.presentation.status));
        }
        if self.presentation.status == PresentationStatus::Pending {
            self.mark_streaming()?;
        }

        let index = self.next_index();
        if slide.index != index {
            log::debug!("Reassigning slide index {} -> {}", slide.index, index);
            slide.index = index;
        }
        self.presentation.slides.push(slide);
        self.publish();

        Ok(&self.presentation.slides[index])
    }

    /// Set a terminal status. No appends are accepted afterwards.
    pub fn finalize(&mut self, status: PresentationStatus) -> Result<()> {
        let current = self.presentation.status;
        if current.is_terminal() {
            return Err(Error::PresentationClosed(current));
        }
        if !status.is_terminal() {
            return Err(Error::InvalidTransition {
                from: current,
                to: status,
            });
        }

        log::debug!(
            "Presentation {} finalized as {} with {} slides",
            self.presentation.id,
            status,
            self.presentation.slides.len()
        );
        self.presentation.status = status;
        self.publish();
        Ok(())
    }

    fn publish(&self) {
        // No receivers is fine; the snapshot is kept for later subscribers.
        self.publisher.send_replace(self.presentation.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accumulator() -> PresentationAccumulator {
        PresentationAccumulator::new(Presentation::with_id("p1", "Calculus"))
    }

    #[test]
    fn test_append_assigns_sequential_indices() {
        let mut acc = accumulator();
        acc.append(Slide::new(7, "A", "")).unwrap();
        acc.append(Slide::new(0, "B", "")).unwrap();
        acc.append(Slide::new(2, "C", "")).unwrap();

        let indices: Vec<usize> = acc.snapshot().slides.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(acc.next_index(), 3);
    }

    #[test]
    fn test_first_append_starts_streaming() {
        let mut acc = accumulator();
        assert_eq!(acc.status(), PresentationStatus::Pending);

        acc.append(Slide::new(0, "A", "")).unwrap();
        assert_eq!(acc.status(), PresentationStatus::Streaming);
    }

    #[test]
    fn test_no_append_after_finalize() {
        let mut acc = accumulator();
        acc.append(Slide::new(0, "A", "")).unwrap();
        acc.finalize(PresentationStatus::Completed).unwrap();

        let err = acc.append(Slide::new(1, "B", "")).unwrap_err();
        assert!(matches!(
            err,
            Error::PresentationClosed(PresentationStatus::Completed)
        ));
        assert_eq!(acc.len(), 1);
        assert!(acc.mark_streaming().is_err());
    }

    #[test]
    fn test_finalize_rules() {
        let mut acc = accumulator();
        assert!(matches!(
            acc.finalize(PresentationStatus::Streaming),
            Err(Error::InvalidTransition { .. })
        ));

        acc.finalize(PresentationStatus::Failed).unwrap();
        assert!(acc.finalize(PresentationStatus::Completed).is_err());
        assert_eq!(acc.status(), PresentationStatus::Failed);
    }

    #[test]
    fn test_subscribers_see_growing_snapshots() {
        let mut acc = accumulator();
        let mut rx = acc.subscribe();
        assert!(rx.borrow_and_update().slides.is_empty());

        acc.append(Slide::new(0, "A", "")).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().slides.len(), 1);

        acc.append(Slide::new(0, "B", "")).unwrap();
        acc.finalize(PresentationStatus::Completed).unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.slides.len(), 2);
        assert_eq!(snapshot.status, PresentationStatus::Completed);
    }

    #[test]
    fn test_snapshot_is_detached_from_live_list() {
        let mut acc = accumulator();
        let rx = acc.subscribe();
        acc.append(Slide::new(0, "A", "")).unwrap();

        let held = rx.borrow().clone();
        acc.append(Slide::new(0, "B", "")).unwrap();

        assert_eq!(held.slides.len(), 1);
        assert_eq!(acc.len(), 2);
    }
}
