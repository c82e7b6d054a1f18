use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Song tempo as seen by the scheduler, read once per loop iteration.
pub trait TempoSource: Send + Sync {
    fn bpm(&self) -> f64;
}

impl<F> TempoSource for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn bpm(&self) -> f64 {
        self()
    }
}

/// Lock-free BPM cell shared between the editor and the scheduler thread.
#[derive(Debug, Clone)]
pub struct SharedTempo(Arc<AtomicU64>);

impl SharedTempo {
    pub fn new(bpm: f64) -> Self {
        Self(Arc::new(AtomicU64::new(bpm.to_bits())))
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, bpm: f64) {
        self.0.store(bpm.to_bits(), Ordering::Relaxed);
    }
}

impl TempoSource for SharedTempo {
    fn bpm(&self) -> f64 {
        self.get()
    }
}

/// Tempo values the scheduler can run with.
pub fn is_valid_bpm(bpm: f64) -> bool {
    bpm.is_finite() && bpm > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_tempo_is_shared() {
        let tempo = SharedTempo::new(120.0);
        let reader = tempo.clone();
        tempo.set(93.5);
        assert_eq!(reader.bpm(), 93.5);
    }

    #[test]
    fn closures_are_tempo_sources() {
        let fixed = || 140.0;
        assert_eq!(fixed.bpm(), 140.0);
    }

    #[test]
    fn validity() {
        assert!(is_valid_bpm(0.5));
        assert!(!is_valid_bpm(0.0));
        assert!(!is_valid_bpm(-10.0));
        assert!(!is_valid_bpm(f64::NAN));
        assert!(!is_valid_bpm(f64::INFINITY));
    }
}
