//! Period suggestions
//!
//! Looks at harmonics and subharmonics of the selected period, fetches a
//! small window of periods around each in one detached request and keeps the
//! best few by entropy or vector strength.

use std::cell::Cell;
use std::rc::Rc;
use tracing::debug;

use super::dataset::{AdditionalData, Dataset, SubscriptionId};
use super::session::{DatasetSession, RequestId, Result, Transport};

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestorConfig {
    /// Window periods on each side of a candidate
    pub context: usize,
    /// Largest multiple, divisor and denominator considered
    pub max_factor: u32,
    /// Suggestions kept
    pub num_previews: usize,
    /// Geometric spacing of the window periods
    pub spacing: f64,
    /// Seconds the dataset must stay unchanged before refreshing
    pub idle_timeout: f64,
}

impl Default for SuggestorConfig {
    fn default() -> Self {
        Self {
            context: 5,
            max_factor: 12,
            num_previews: 5,
            spacing: 1.005,
            idle_timeout: 0.15,
        }
    }
}

impl SuggestorConfig {
    pub fn block_len(&self) -> usize {
        2 * self.context + 1
    }
}

/// A period derived from the current one
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub label: String,
    pub period: f64,
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Multiples `× d`, divisors `/ d` and fractions `× n / d` of `period`, each
/// factor once, for `d` in `2..=max_factor` and `n < 2d`
pub fn candidate_periods(period: f64, max_factor: u32) -> Vec<Candidate> {
    let mut result = Vec::new();
    for d in 2..=max_factor {
        result.push(Candidate { label: format!("× {d}"), period: period * d as f64 });
        result.push(Candidate { label: format!("/ {d}"), period: period / d as f64 });
        for n in 2..2 * d {
            // Reducible fractions repeat an earlier factor
            if gcd(n, d) != 1 {
                continue;
            }
            result.push(Candidate {
                label: format!("× {n} / {d}"),
                period: period * n as f64 / d as f64,
            });
        }
    }
    result
}

/// `period * spacing^k` for `k` in `-context..=context`
pub fn window(period: f64, context: usize, spacing: f64) -> impl Iterator<Item = f64> {
    let c = context as i32;
    (-c..=c).map(move |k| spacing.powi(k) * period)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub label: String,
    pub period: f64,
    pub entropy: f32,
    pub vectorstrength: f32,
    /// Entropy minus the selected period's entropy
    pub relative_entropy: f32,
    /// Vector strength minus the selected period's vector strength
    pub relative_vectorstrength: f32,
    /// Periods of the window, ascending
    pub periods: Vec<f64>,
    /// Histogram rows of the window, row-major
    pub histograms: Vec<f32>,
    pub num_bins: usize,
    /// 1-based rank among the kept suggestions
    pub rank: usize,
    pub of: usize,
}

impl Suggestion {
    /// Quality under the active metric and its difference to the selection,
    /// signed so that positive is better
    pub fn quality(&self, use_vector_strength: bool) -> (f32, f32) {
        if use_vector_strength {
            (self.vectorstrength, self.relative_vectorstrength)
        } else {
            (self.entropy, -self.relative_entropy)
        }
    }
}

struct Evaluated {
    candidate: Candidate,
    entropy: f32,
    vectorstrength: f32,
    periods: Vec<f64>,
    histograms: Vec<f32>,
}

struct Awaiting {
    request_id: RequestId,
    candidates: Vec<Candidate>,
}

pub struct PeriodSuggestor {
    config: SuggestorConfig,
    use_vector_strength: bool,
    subscription: Option<SubscriptionId>,
    dirty: Rc<Cell<bool>>,
    changed_at: Option<f64>,
    awaiting: Option<Awaiting>,
    /// Last evaluated candidates with the dataset state they were ranked against
    evaluated: Vec<Evaluated>,
    reference: (f32, f32),
    num_bins: usize,
    suggestions: Vec<Suggestion>,
}

impl PeriodSuggestor {
    pub fn new(config: SuggestorConfig) -> Self {
        Self {
            config,
            use_vector_strength: false,
            subscription: None,
            dirty: Rc::new(Cell::new(false)),
            changed_at: None,
            awaiting: None,
            evaluated: Vec::new(),
            reference: (0.0, 0.0),
            num_bins: 0,
            suggestions: Vec::new(),
        }
    }

    pub fn config(&self) -> &SuggestorConfig {
        &self.config
    }

    /// Takes effect with the next refresh
    pub fn config_mut(&mut self) -> &mut SuggestorConfig {
        &mut self.config
    }

    /// Start listening to `dataset`; the first refresh is due immediately
    pub fn attach(&mut self, dataset: &mut Dataset) {
        self.detach(dataset);
        let dirty = self.dirty.clone();
        self.subscription = Some(dataset.subscribe(move |_| dirty.set(true)));
        self.dirty.set(false);
        self.changed_at = Some(f64::NEG_INFINITY);
        self.awaiting = None;
        self.evaluated.clear();
        self.suggestions.clear();
    }

    pub fn detach(&mut self, dataset: &mut Dataset) {
        if let Some(id) = self.subscription.take() {
            dataset.unsubscribe(id);
        }
    }

    /// Forget a dataset that went away with its session
    pub fn reset(&mut self) {
        self.subscription = None;
        self.dirty.set(false);
        self.changed_at = None;
        self.awaiting = None;
        self.evaluated.clear();
        self.suggestions.clear();
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn is_waiting(&self) -> bool {
        self.awaiting.is_some()
    }

    pub fn use_vector_strength(&self) -> bool {
        self.use_vector_strength
    }

    /// Switch the ranking metric and re-rank what was fetched last
    pub fn set_use_vector_strength(&mut self, enabled: bool) {
        if self.use_vector_strength != enabled {
            self.use_vector_strength = enabled;
            self.rank();
        }
    }

    /// Drive the idle debounce. Call regularly with the current time in
    /// seconds; refreshes once the dataset has been quiet for the idle timeout.
    pub fn poll<T: Transport>(&mut self, now: f64, session: &mut DatasetSession<T>) -> Result<bool> {
        if self.dirty.replace(false) {
            self.changed_at = Some(now);
            self.suggestions.clear();
            self.awaiting = None;
        }
        match self.changed_at {
            Some(t) if now - t >= self.config.idle_timeout => {
                self.changed_at = None;
                self.refresh(session)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Issue a new detached request for the current selection. Any response
    /// to an earlier refresh is ignored from now on.
    pub fn refresh<T: Transport>(&mut self, session: &mut DatasetSession<T>) -> Result<()> {
        let Some(dataset) = session.dataset() else {
            return Ok(());
        };

        let period = dataset.period();
        let candidates: Vec<Candidate> = candidate_periods(period, self.config.max_factor)
            .into_iter()
            .filter(|c| dataset.contains_period(c.period))
            .collect();

        self.suggestions.clear();
        self.evaluated.clear();
        if candidates.is_empty() {
            self.awaiting = None;
            return Ok(());
        }

        let periods: Vec<f64> = candidates
            .iter()
            .flat_map(|c| window(c.period, self.config.context, self.config.spacing))
            .collect();
        let request_id = session.load_additional_periods(&periods, false)?;
        debug!(request_id, period, candidates = candidates.len(), "Refreshing period suggestions");
        self.awaiting = Some(Awaiting { request_id, candidates });
        Ok(())
    }

    /// Take a detached response. Returns false when it is not the response to
    /// the latest refresh, in which case it is dropped.
    pub fn accept(&mut self, data: &AdditionalData, dataset: &Dataset) -> bool {
        let Some(awaiting) = self.awaiting.as_ref() else {
            debug!(request_id = data.request_id, "No suggestion request outstanding, discarding");
            return false;
        };
        if awaiting.request_id != data.request_id {
            debug!(
                request_id = data.request_id,
                latest = awaiting.request_id,
                "Suggestion data arrived too late, discarding"
            );
            return false;
        }

        let block = self.config.block_len();
        let bins = dataset.num_bins();
        if data.period_count() != awaiting.candidates.len() * block
            || data.histograms.len() != data.period_count() * bins
        {
            debug!(request_id = data.request_id, "Suggestion data has the wrong shape, discarding");
            self.awaiting = None;
            return false;
        }

        let Some(awaiting) = self.awaiting.take() else {
            return false;
        };
        let center = self.config.context;
        self.evaluated = awaiting
            .candidates
            .into_iter()
            .enumerate()
            .map(|(i, candidate)| {
                let rows = i * block..(i + 1) * block;
                Evaluated {
                    candidate,
                    entropy: data.entropies[i * block + center],
                    vectorstrength: data.vectorstrengths[i * block + center],
                    periods: data.periods[rows.clone()].to_vec(),
                    histograms: rows
                        .clone()
                        .filter_map(|row| data.histogram(row, bins))
                        .flatten()
                        .copied()
                        .collect(),
                }
            })
            .collect();

        let index = dataset.index();
        self.reference = (dataset.entropies()[index], dataset.vectorstrengths()[index]);
        self.num_bins = bins;
        self.rank();
        true
    }

    fn rank(&mut self) {
        let mut order: Vec<usize> = (0..self.evaluated.len()).collect();
        if self.use_vector_strength {
            order.sort_by(|&a, &b| {
                self.evaluated[b].vectorstrength.total_cmp(&self.evaluated[a].vectorstrength)
            });
        } else {
            order.sort_by(|&a, &b| self.evaluated[a].entropy.total_cmp(&self.evaluated[b].entropy));
        }
        order.truncate(self.config.num_previews);

        let of = order.len();
        let (ref_entropy, ref_vs) = self.reference;
        let mut suggestions: Vec<Suggestion> = order
            .into_iter()
            .enumerate()
            .map(|(rank, i)| {
                let e = &self.evaluated[i];
                Suggestion {
                    label: e.candidate.label.clone(),
                    period: e.candidate.period,
                    entropy: e.entropy,
                    vectorstrength: e.vectorstrength,
                    relative_entropy: e.entropy - ref_entropy,
                    relative_vectorstrength: e.vectorstrength - ref_vs,
                    periods: e.periods.clone(),
                    histograms: e.histograms.clone(),
                    num_bins: self.num_bins,
                    rank: rank + 1,
                    of,
                }
            })
            .collect();
        suggestions.sort_by(|a, b| a.period.total_cmp(&b.period));
        self.suggestions = suggestions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::tests::{loaded_session, RecordingTransport};
    use crate::core::session::{Frame, SessionEvent};

    fn has(candidates: &[Candidate], period: f64) -> bool {
        candidates.iter().any(|c| (c.period - period).abs() < 1e-9)
    }

    #[test]
    fn test_candidates_harmonics() {
        let candidates = candidate_periods(100.0, 12);
        assert!(has(&candidates, 200.0));
        assert!(has(&candidates, 50.0));
        assert!(has(&candidates, 150.0));
        assert!(has(&candidates, 1200.0));
        assert_eq!(candidates[0].label, "× 2");
        assert_eq!(candidates[1].label, "/ 2");
        assert_eq!(candidates[2].label, "× 3 / 2");
        // 2/4 duplicates 1/2
        assert!(!candidates.iter().any(|c| c.label == "× 2 / 4"));
        assert!(!candidates.iter().any(|c| c.label == "× 1 / 3"));
    }

    #[test]
    fn test_candidates_unique_factors() {
        let candidates = candidate_periods(1.0, 12);
        let mut factors: Vec<f64> = candidates.iter().map(|c| c.period).collect();
        factors.sort_by(f64::total_cmp);
        let before = factors.len();
        factors.dedup();
        assert_eq!(before, factors.len());
        assert!(!has(&candidates, 1.0));
    }

    #[test]
    fn test_window() {
        let periods: Vec<f64> = window(100.0, 2, 1.005).collect();
        assert_eq!(periods.len(), 5);
        assert_eq!(periods[2], 100.0);
        assert!((periods[3] - 100.5).abs() < 1e-9);
        assert!(periods.windows(2).all(|w| w[0] < w[1]));
    }

    /// Answer the suggestor's last request with entropies from `quality`
    fn answer(
        session: &DatasetSession<RecordingTransport>,
        request_id: u32,
        candidates: usize,
        quality: impl Fn(usize) -> f32,
    ) -> AdditionalData {
        let block = 11;
        let n = candidates * block;
        AdditionalData {
            request_id,
            period_domain: [1.0, 1.0],
            histograms: {
                let bins = session.dataset().unwrap().num_bins();
                (0..n * bins).map(|i| (i / bins) as f32).collect()
            },
            entropies: (0..n).map(|i| quality(i / block)).collect(),
            vectorstrengths: (0..n).map(|i| 1.0 - quality(i / block)).collect(),
            periods: (0..n).map(|i| (i + 1) as f64).collect(),
        }
    }

    #[test]
    fn test_refresh_and_rank() {
        let (mut session, transport) = loaded_session(&[10.0, 100.0, 1000.0]);
        session.dataset_mut().unwrap().set_index(1).unwrap();
        let mut suggestor = PeriodSuggestor::new(SuggestorConfig::default());
        suggestor.attach(session.dataset_mut().unwrap());

        assert!(suggestor.poll(0.0, &mut session).unwrap());
        let awaiting = suggestor.awaiting.as_ref().unwrap();
        let count = awaiting.candidates.len();
        let id = awaiting.request_id;
        assert!(awaiting.candidates.iter().all(|c| c.period >= 10.0 && c.period <= 1000.0));
        assert!(transport.texts().last().unwrap().contains("request additional data"));

        // Candidate i gets entropy (i * 7) % count / count
        let data = answer(&session, id, count, |i| ((i * 7) % count) as f32 / count as f32);
        assert!(suggestor.accept(&data, session.dataset().unwrap()));

        let suggestions = suggestor.suggestions();
        assert_eq!(suggestions.len(), 5);
        assert!(suggestions.windows(2).all(|w| w[0].period <= w[1].period));
        let mut ranks: Vec<usize> = suggestions.iter().map(|s| s.rank).collect();
        ranks.sort();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
        let best = suggestions.iter().find(|s| s.rank == 1).unwrap();
        assert_eq!(best.entropy, 0.0);
        assert_eq!(best.periods.len(), 11);
        assert_eq!(best.histograms.len(), 11 * 2);
        let first_row = best.periods[0] as f32 - 1.0;
        assert_eq!(&best.histograms[..2], &[first_row, first_row]);
        assert_eq!(best.of, 5);

        suggestor.set_use_vector_strength(true);
        let best = suggestor.suggestions().iter().find(|s| s.rank == 1).unwrap();
        assert_eq!(best.vectorstrength, 1.0);
    }

    #[test]
    fn test_stale_response_discarded() {
        let (mut session, _) = loaded_session(&[10.0, 100.0, 1000.0]);
        session.dataset_mut().unwrap().set_index(1).unwrap();
        let mut suggestor = PeriodSuggestor::new(SuggestorConfig::default());
        suggestor.attach(session.dataset_mut().unwrap());

        suggestor.refresh(&mut session).unwrap();
        let first = suggestor.awaiting.as_ref().unwrap().request_id;
        let count = suggestor.awaiting.as_ref().unwrap().candidates.len();
        suggestor.refresh(&mut session).unwrap();

        let stale = answer(&session, first, count, |_| 0.5);
        assert!(!suggestor.accept(&stale, session.dataset().unwrap()));
        assert!(suggestor.suggestions().is_empty());
        assert!(suggestor.is_waiting());
    }

    #[test]
    fn test_selection_change_drops_outstanding_request() {
        let (mut session, _) = loaded_session(&[10.0, 100.0, 1000.0]);
        session.dataset_mut().unwrap().set_index(1).unwrap();
        let mut suggestor = PeriodSuggestor::new(SuggestorConfig::default());
        suggestor.attach(session.dataset_mut().unwrap());
        assert!(suggestor.poll(0.0, &mut session).unwrap());
        let id = suggestor.awaiting.as_ref().unwrap().request_id;
        let count = suggestor.awaiting.as_ref().unwrap().candidates.len();

        // The answer for the old selection lands inside the debounce window
        session.dataset_mut().unwrap().set_index(2).unwrap();
        assert!(!suggestor.poll(0.05, &mut session).unwrap());
        assert!(!suggestor.is_waiting());
        let late = answer(&session, id, count, |_| 0.5);
        assert!(!suggestor.accept(&late, session.dataset().unwrap()));
        assert!(suggestor.suggestions().is_empty());

        assert!(suggestor.poll(0.3, &mut session).unwrap());
        assert!(suggestor.is_waiting());
    }

    #[test]
    fn test_debounce_waits_for_quiet() {
        let (mut session, _) = loaded_session(&[10.0, 100.0, 1000.0]);
        let mut suggestor = PeriodSuggestor::new(SuggestorConfig::default());
        suggestor.attach(session.dataset_mut().unwrap());
        assert!(suggestor.poll(0.0, &mut session).unwrap());

        session.dataset_mut().unwrap().set_index(1).unwrap();
        assert!(!suggestor.poll(1.0, &mut session).unwrap());
        session.dataset_mut().unwrap().set_index(0).unwrap();
        assert!(!suggestor.poll(1.1, &mut session).unwrap());
        assert!(!suggestor.poll(1.2, &mut session).unwrap());
        assert!(suggestor.poll(1.3, &mut session).unwrap());
        assert!(!suggestor.poll(5.0, &mut session).unwrap());
    }

    #[test]
    fn test_detach_stops_listening() {
        let (mut session, _) = loaded_session(&[10.0, 100.0]);
        let mut suggestor = PeriodSuggestor::new(SuggestorConfig::default());
        suggestor.attach(session.dataset_mut().unwrap());
        assert_eq!(session.dataset().unwrap().listener_count(), 1);
        suggestor.detach(session.dataset_mut().unwrap());
        assert_eq!(session.dataset().unwrap().listener_count(), 0);
    }

    #[test]
    fn test_session_routes_detached_data() {
        let (mut session, _) = loaded_session(&[10.0, 100.0, 1000.0]);
        session.dataset_mut().unwrap().set_index(1).unwrap();
        let mut suggestor = PeriodSuggestor::new(SuggestorConfig::default());
        suggestor.attach(session.dataset_mut().unwrap());
        suggestor.refresh(&mut session).unwrap();
        let id = suggestor.awaiting.as_ref().unwrap().request_id;
        let count = suggestor.awaiting.as_ref().unwrap().candidates.len();

        let periods: Vec<f32> = (0..count * 11).map(|i| (i + 1) as f32).collect();
        let bytes = crate::core::session::tests::supplement_frame(id, &periods);
        let Some(SessionEvent::Supplement(data)) = session.handle_frame(Frame::Binary(bytes)).unwrap() else {
            panic!("expected detached data");
        };
        assert!(suggestor.accept(&data, session.dataset().unwrap()));
        assert_eq!(suggestor.suggestions().len(), 5);
    }
}
