//! The periodicity dataset model
//!
//! Owns the selected period index, the per-period histogram series, the
//! overview binning and the raw samples. All mutation goes through methods
//! that keep the invariants below and notify subscribers:
//!
//! - `periods` is sorted ascending (stable order for equal periods)
//! - `histograms.len() == num_bins * period_count`
//! - `entropies.len() == vectorstrengths.len() == period_count`
//! - `index < period_count`
//! - `period_domain` contains every entry of `periods`

use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, trace};

use super::protocol::{DisplayAttribute, FullFrame, SupplementFrame};
use super::units::DAY_SECONDS;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DatasetError {
    #[error("index out of bounds: {index} (period count {count})")]
    IndexOutOfBounds { index: usize, count: usize },

    #[error("outside period domain ({domain:?}): {period}")]
    OutsidePeriodDomain { period: f64, domain: [f64; 2] },

    #[error("empty index range: {start}..={end}")]
    EmptyRange { start: usize, end: usize },

    #[error("malformed dataset: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, DatasetError>;

/// One raw sample. `time` is in seconds after scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Datapoint {
    pub x: f32,
    pub y: f32,
    pub value: f32,
    pub time: f64,
}

/// A sample together with its phase under the selected period
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhasedDatapoint {
    pub x: f32,
    pub y: f32,
    pub value: f32,
    pub time: f64,
    pub phase: f64,
}

/// Freshly fetched period data, already scaled to seconds and not yet merged
#[derive(Debug, Clone, PartialEq)]
pub struct AdditionalData {
    pub request_id: u32,
    pub period_domain: [f64; 2],
    pub histograms: Vec<f32>,
    pub entropies: Vec<f32>,
    pub vectorstrengths: Vec<f32>,
    pub periods: Vec<f64>,
}

impl AdditionalData {
    pub fn from_frame(frame: SupplementFrame, scaling: f64) -> Self {
        let [d0, d1] = frame.metadata.period_domain;
        Self {
            request_id: frame.request_id,
            period_domain: [d0 * scaling, d1 * scaling],
            histograms: frame.histograms,
            entropies: frame.entropies,
            vectorstrengths: frame.vectorstrengths,
            periods: frame.periods.iter().map(|&p| p as f64 * scaling).collect(),
        }
    }

    pub fn period_count(&self) -> usize {
        self.periods.len()
    }

    /// Histogram row `i` of the fetched data, `None` past the last row
    pub fn histogram(&self, i: usize, num_bins: usize) -> Option<&[f32]> {
        self.histograms.get(i * num_bins..(i + 1) * num_bins)
    }
}

/// Everything needed to build a dataset, in seconds
#[derive(Debug, Clone, Default)]
pub struct DatasetParts {
    pub key: String,
    pub display_attribute: DisplayAttribute,
    pub datapoints: Vec<Datapoint>,
    pub num_bins: usize,
    pub binning: Vec<f32>,
    pub binning_bin_size: f64,
    pub temporal_domain_scaling: f64,
    pub temporal_domain: [f64; 2],
    pub period_domain: [f64; 2],
    pub histograms: Vec<f32>,
    pub entropies: Vec<f32>,
    pub vectorstrengths: Vec<f32>,
    pub periods: Vec<f64>,
}

impl DatasetParts {
    /// Convert a decoded full frame, applying `temporalDomainScaling` to
    /// periods, both domains, timestamps and the binning bin size
    pub fn from_frame(key: &str, display_attribute: DisplayAttribute, frame: FullFrame) -> Self {
        let meta = &frame.metadata;
        let s = meta.temporal_domain_scaling;
        let datapoints = (0..frame.timestamps.len())
            .map(|i| Datapoint {
                x: frame.xs[i],
                y: frame.ys[i],
                value: frame.values[i],
                time: frame.timestamps[i] as f64 * s,
            })
            .collect();

        Self {
            key: key.to_string(),
            display_attribute,
            datapoints,
            num_bins: meta.num_bins as usize,
            binning_bin_size: meta.binning_bin_size * s,
            temporal_domain_scaling: s,
            temporal_domain: [meta.temporal_domain[0] * s, meta.temporal_domain[1] * s],
            period_domain: [meta.period_domain[0] * s, meta.period_domain[1] * s],
            periods: frame.periods.iter().map(|&p| p as f64 * s).collect(),
            histograms: frame.histograms,
            entropies: frame.entropies,
            vectorstrengths: frame.vectorstrengths,
            binning: frame.binning,
        }
    }

    fn validate(&mut self) -> Result<()> {
        let count = self.periods.len();
        if count == 0 {
            return Err(DatasetError::Malformed("dataset has no periods".into()));
        }
        if self.num_bins == 0 {
            return Err(DatasetError::Malformed("histograms have no bins".into()));
        }
        if self.histograms.len() != self.num_bins * count {
            return Err(DatasetError::Malformed(format!(
                "{} histogram values for {} periods of {} bins",
                self.histograms.len(),
                count,
                self.num_bins
            )));
        }
        if self.entropies.len() != count || self.vectorstrengths.len() != count {
            return Err(DatasetError::Malformed("quality arrays do not match period count".into()));
        }
        if self.periods.windows(2).any(|w| !(w[0] <= w[1])) {
            return Err(DatasetError::Malformed("periods are not sorted".into()));
        }
        // The domain must cover every period
        self.period_domain[0] = self.period_domain[0].min(self.periods[0]);
        self.period_domain[1] = self.period_domain[1].max(self.periods[count - 1]);
        Ok(())
    }
}

type Listener = Box<dyn FnMut(&Dataset)>;

/// Handle returned by [`Dataset::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Notifier {
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
    suspended: u32,
    pending: bool,
}

pub struct Dataset {
    key: String,
    display_attribute: DisplayAttribute,
    datapoints: Vec<Datapoint>,
    num_bins: usize,
    binning: Vec<f32>,
    binning_bin_size: f64,
    binning_by_value: Vec<(f32, Vec<usize>)>,
    temporal_domain_scaling: f64,
    temporal_domain: [f64; 2],
    period_domain: [f64; 2],
    histograms: Vec<f32>,
    entropies: Vec<f32>,
    vectorstrengths: Vec<f32>,
    periods: Vec<f64>,
    index: usize,
    /// Bumped on every notification-worthy change
    generation: u64,
    notifier: Notifier,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("key", &self.key)
            .field("period_count", &self.periods.len())
            .field("num_bins", &self.num_bins)
            .field("index", &self.index)
            .field("period", &self.period())
            .finish_non_exhaustive()
    }
}

/// Wrap any real number into `[0, 1)`, also for negative input
pub fn wrap01(v: f64) -> f64 {
    let wrapped = v.rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative input
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}

/// Index of the entry nearest to `value` in a sorted slice.
/// On a tie the lower index wins.
pub fn nearest_index(sorted: &[f64], value: f64) -> usize {
    let i = sorted.partition_point(|&p| p < value);
    if i == 0 {
        return 0;
    }
    if i >= sorted.len() {
        return sorted.len().saturating_sub(1);
    }
    if value - sorted[i - 1] <= sorted[i] - value {
        i - 1
    } else {
        i
    }
}

fn group_by_value(binning: &[f32]) -> Vec<(f32, Vec<usize>)> {
    let mut positions: HashMap<u32, usize> = HashMap::new();
    let mut groups: Vec<(f32, Vec<usize>)> = Vec::new();
    for (i, &v) in binning.iter().enumerate() {
        let slot = *positions.entry(v.to_bits()).or_insert_with(|| {
            groups.push((v, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(i);
    }
    groups
}

impl Dataset {
    /// Build a dataset. The initial selection is the period nearest to one day.
    pub fn from_parts(mut parts: DatasetParts) -> Result<Self> {
        parts.validate()?;
        let index = nearest_index(&parts.periods, DAY_SECONDS);

        debug!(
            key = %parts.key,
            period_count = parts.periods.len(),
            num_bins = parts.num_bins,
            data_count = parts.datapoints.len(),
            index,
            "Dataset created"
        );

        Ok(Self {
            key: parts.key,
            display_attribute: parts.display_attribute,
            datapoints: parts.datapoints,
            num_bins: parts.num_bins,
            binning_by_value: group_by_value(&parts.binning),
            binning: parts.binning,
            binning_bin_size: parts.binning_bin_size,
            temporal_domain_scaling: parts.temporal_domain_scaling,
            temporal_domain: parts.temporal_domain,
            period_domain: parts.period_domain,
            histograms: parts.histograms,
            entropies: parts.entropies,
            vectorstrengths: parts.vectorstrengths,
            periods: parts.periods,
            index,
            generation: 0,
            notifier: Notifier::default(),
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn display_attribute(&self) -> DisplayAttribute {
        self.display_attribute
    }

    pub fn datapoints(&self) -> &[Datapoint] {
        &self.datapoints
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn period_count(&self) -> usize {
        self.periods.len()
    }

    pub fn periods(&self) -> &[f64] {
        &self.periods
    }

    pub fn entropies(&self) -> &[f32] {
        &self.entropies
    }

    pub fn vectorstrengths(&self) -> &[f32] {
        &self.vectorstrengths
    }

    pub fn binning(&self) -> &[f32] {
        &self.binning
    }

    pub fn binning_bin_size(&self) -> f64 {
        self.binning_bin_size
    }

    /// Overview bins grouped by value, in order of first appearance
    pub fn binning_by_value(&self) -> &[(f32, Vec<usize>)] {
        &self.binning_by_value
    }

    pub fn temporal_domain(&self) -> [f64; 2] {
        self.temporal_domain
    }

    pub fn temporal_domain_scaling(&self) -> f64 {
        self.temporal_domain_scaling
    }

    pub fn period_domain(&self) -> [f64; 2] {
        self.period_domain
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_index(&mut self, index: usize) -> Result<()> {
        if index >= self.periods.len() {
            return Err(DatasetError::IndexOutOfBounds { index, count: self.periods.len() });
        }
        self.index = index;
        trace!(index, period = self.period(), "Index selected");
        self.notify();
        Ok(())
    }

    /// Move the selection by `delta` rows
    pub fn step_index(&mut self, delta: isize) -> Result<()> {
        let target = self.index as isize + delta;
        if target < 0 {
            return Err(DatasetError::IndexOutOfBounds { index: 0, count: self.periods.len() });
        }
        self.set_index(target as usize)
    }

    pub fn period(&self) -> f64 {
        self.periods[self.index]
    }

    pub fn contains_period(&self, period: f64) -> bool {
        // NaN fails both comparisons
        period >= self.period_domain[0] && period <= self.period_domain[1]
    }

    fn check_domain(&self, period: f64) -> Result<()> {
        if self.contains_period(period) {
            Ok(())
        } else {
            Err(DatasetError::OutsidePeriodDomain { period, domain: self.period_domain })
        }
    }

    /// Select the existing period nearest to `period`
    pub fn set_period(&mut self, period: f64) -> Result<()> {
        self.check_domain(period)?;
        self.index = nearest_index(&self.periods, period);
        trace!(requested = period, index = self.index, period = self.period(), "Period selected");
        self.notify();
        Ok(())
    }

    /// Index of `period` if it is present exactly
    pub fn exact_index(&self, period: f64) -> Result<Option<usize>> {
        self.check_domain(period)?;
        let i = nearest_index(&self.periods, period);
        Ok((self.periods[i] == period).then_some(i))
    }

    pub fn nearest_index(&self, period: f64) -> usize {
        nearest_index(&self.periods, period)
    }

    // ------------------------------------------------------------------
    // Derived data
    // ------------------------------------------------------------------

    /// Phase of `seconds` under the selected period, in `[0, 1)`
    pub fn calculate_phase(&self, seconds: f64) -> f64 {
        wrap01((seconds - self.temporal_domain[0]) / self.period())
    }

    /// Samples with their phase, computed on every call
    pub fn data_with_phase(&self) -> impl Iterator<Item = PhasedDatapoint> + '_ {
        self.datapoints.iter().map(move |d| PhasedDatapoint {
            x: d.x,
            y: d.y,
            value: d.value,
            time: d.time,
            phase: self.calculate_phase(d.time),
        })
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.periods.len() {
            return Err(DatasetError::IndexOutOfBounds { index, count: self.periods.len() });
        }
        Ok(())
    }

    /// Copy of histogram row `index`
    pub fn histogram(&self, index: usize) -> Result<Vec<f32>> {
        self.check_index(index)?;
        Ok(self.histograms[index * self.num_bins..(index + 1) * self.num_bins].to_vec())
    }

    /// Copy of histogram rows `start..=end`
    pub fn histograms_range(&self, start: usize, end: usize) -> Result<Vec<f32>> {
        self.check_index(start)?;
        self.check_index(end)?;
        if start > end {
            return Err(DatasetError::EmptyRange { start, end });
        }
        Ok(self.histograms[start * self.num_bins..(end + 1) * self.num_bins].to_vec())
    }

    /// Borrowed view of all histogram rows, row-major
    pub fn histograms(&self) -> &[f32] {
        &self.histograms
    }

    /// Periods of the `count` lowest-entropy rows, sorted by period
    pub fn lowest_entropy_periods(&self, count: usize) -> Vec<f64> {
        let mut order: Vec<usize> = (0..self.periods.len()).collect();
        order.sort_by(|&a, &b| self.entropies[a].total_cmp(&self.entropies[b]));
        let mut result: Vec<f64> = order.into_iter().take(count).map(|i| self.periods[i]).collect();
        result.sort_by(f64::total_cmp);
        result
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Merge fetched period data into the sorted series. The selected period
    /// value survives, its index may move. Equal periods are kept as separate
    /// rows, existing rows first.
    pub fn splice(&mut self, data: &AdditionalData) -> Result<()> {
        let added = data.periods.len();
        if data.histograms.len() != added * self.num_bins
            || data.entropies.len() != added
            || data.vectorstrengths.len() != added
        {
            return Err(DatasetError::Malformed(format!(
                "additional data for {} periods does not match {} bins",
                added, self.num_bins
            )));
        }

        let old_period = self.period();
        let old_count = self.periods.len();

        // (period, from_new, source row); sort_by is stable
        let mut rows: Vec<(f64, bool, usize)> = self
            .periods
            .iter()
            .enumerate()
            .map(|(i, &p)| (p, false, i))
            .chain(data.periods.iter().enumerate().map(|(i, &p)| (p, true, i)))
            .collect();
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total = old_count + added;
        let bins = self.num_bins;
        let mut histograms = Vec::with_capacity(total * bins);
        let mut entropies = Vec::with_capacity(total);
        let mut vectorstrengths = Vec::with_capacity(total);
        let mut periods = Vec::with_capacity(total);

        for &(period, from_new, row) in &rows {
            let (hs, es, vs) = if from_new {
                (&data.histograms, &data.entropies, &data.vectorstrengths)
            } else {
                (&self.histograms, &self.entropies, &self.vectorstrengths)
            };
            histograms.extend_from_slice(&hs[row * bins..(row + 1) * bins]);
            entropies.push(es[row]);
            vectorstrengths.push(vs[row]);
            periods.push(period);
        }

        let [d0, d1] = data.period_domain;
        let mut domain = [self.period_domain[0].min(d0), self.period_domain[1].max(d1)];
        if let (Some(&lo), Some(&hi)) = (periods.first(), periods.last()) {
            domain = [domain[0].min(lo), domain[1].max(hi)];
        }

        self.index = periods.partition_point(|&p| p < old_period);
        self.histograms = histograms;
        self.entropies = entropies;
        self.vectorstrengths = vectorstrengths;
        self.periods = periods;
        self.period_domain = domain;
        self.binning_by_value = group_by_value(&self.binning);

        debug!(
            request_id = data.request_id,
            added,
            period_count = total,
            index = self.index,
            "Spliced additional periods"
        );
        self.notify();
        Ok(())
    }

    /// Replace every series after a display attribute change, keeping the
    /// selection on the period nearest to the previous one
    pub fn replace(&mut self, mut parts: DatasetParts) -> Result<()> {
        parts.validate()?;
        let old_period = self.period();

        self.display_attribute = parts.display_attribute;
        self.datapoints = parts.datapoints;
        self.num_bins = parts.num_bins;
        self.binning_by_value = group_by_value(&parts.binning);
        self.binning = parts.binning;
        self.binning_bin_size = parts.binning_bin_size;
        self.temporal_domain_scaling = parts.temporal_domain_scaling;
        self.temporal_domain = parts.temporal_domain;
        self.period_domain = parts.period_domain;
        self.histograms = parts.histograms;
        self.entropies = parts.entropies;
        self.vectorstrengths = parts.vectorstrengths;
        self.periods = parts.periods;
        self.index = nearest_index(&self.periods, old_period);

        debug!(
            key = %self.key,
            attribute = self.display_attribute.label(),
            period_count = self.periods.len(),
            index = self.index,
            "Dataset replaced"
        );
        self.notify();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Change notification
    // ------------------------------------------------------------------

    pub fn subscribe(&mut self, listener: impl FnMut(&Dataset) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.notifier.next_id);
        self.notifier.next_id += 1;
        self.notifier.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.notifier.listeners.len();
        self.notifier.listeners.retain(|(sid, _)| *sid != id);
        before != self.notifier.listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.notifier.listeners.len()
    }

    /// Hold back notifications until the matching [`Dataset::resume`]
    pub fn suspend(&mut self) {
        self.notifier.suspended += 1;
    }

    /// Release one suspension. The last release delivers a single trailing
    /// notification if anything changed meanwhile.
    pub fn resume(&mut self) {
        self.notifier.suspended = self.notifier.suspended.saturating_sub(1);
        if self.notifier.suspended == 0 && self.notifier.pending {
            self.notifier.pending = false;
            self.dispatch();
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.notifier.suspended > 0
    }

    fn notify(&mut self) {
        self.generation += 1;
        if self.notifier.suspended > 0 {
            self.notifier.pending = true;
        } else {
            self.dispatch();
        }
    }

    fn dispatch(&mut self) {
        let mut listeners = std::mem::take(&mut self.notifier.listeners);
        for (_, listener) in listeners.iter_mut() {
            listener(self);
        }
        self.notifier.listeners = listeners;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Dataset over `periods` with 2 bins per row; row `i` holds `[i, i]`
    pub(crate) fn make_dataset(periods: &[f64]) -> Dataset {
        let n = periods.len();
        let histograms = (0..n).flat_map(|i| [i as f32, i as f32]).collect();
        Dataset::from_parts(DatasetParts {
            key: "test".into(),
            num_bins: 2,
            binning: vec![1.0, 0.0, 1.0, 2.0],
            binning_bin_size: 10.0,
            temporal_domain_scaling: 1.0,
            temporal_domain: [1000.0, 2000.0],
            period_domain: [periods[0], periods[n - 1]],
            histograms,
            entropies: (0..n).map(|i| 1.0 - i as f32 / n as f32).collect(),
            vectorstrengths: (0..n).map(|i| i as f32 / n as f32).collect(),
            periods: periods.to_vec(),
            datapoints: vec![
                Datapoint { x: 0.0, y: 0.0, value: 1.0, time: 1000.0 },
                Datapoint { x: 1.0, y: 1.0, value: 2.0, time: 1006.0 },
                Datapoint { x: 2.0, y: 2.0, value: 3.0, time: 997.0 },
            ],
            ..Default::default()
        })
        .unwrap()
    }

    fn additional(periods: &[f64], marker: f32) -> AdditionalData {
        AdditionalData {
            request_id: 0,
            period_domain: [periods[0], periods[periods.len() - 1]],
            histograms: periods.iter().flat_map(|_| [marker, marker]).collect(),
            entropies: vec![0.0; periods.len()],
            vectorstrengths: vec![1.0; periods.len()],
            periods: periods.to_vec(),
        }
    }

    fn counter(dataset: &mut Dataset) -> (Rc<Cell<u32>>, SubscriptionId) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let id = dataset.subscribe(move |_| c.set(c.get() + 1));
        (count, id)
    }

    #[test]
    fn test_initial_index_nearest_day() {
        let ds = make_dataset(&[3600.0, 43200.0, 80000.0, 200000.0]);
        assert_eq!(ds.index(), 2);

        let ds = make_dataset(&[1.0, 2.0, 4.0]);
        assert_eq!(ds.index(), 2);
    }

    #[test]
    fn test_set_index_bounds() {
        let mut ds = make_dataset(&[1.0, 2.0, 4.0, 8.0, 16.0]);
        assert_eq!(
            ds.set_index(5).unwrap_err(),
            DatasetError::IndexOutOfBounds { index: 5, count: 5 }
        );
        ds.set_index(1).unwrap();
        assert_eq!(ds.period(), 2.0);
        assert!(ds.step_index(-2).is_err());
        assert_eq!(ds.index(), 1);
    }

    #[test]
    fn test_set_period_nearest() {
        let mut ds = make_dataset(&[1.0, 2.0, 4.0, 8.0, 16.0]);
        ds.set_index(2).unwrap();
        ds.set_period(5.0).unwrap();
        assert_eq!(ds.index(), 2);
        ds.set_period(7.0).unwrap();
        assert_eq!(ds.index(), 3);
        // Equidistant: lower index wins
        ds.set_period(6.0).unwrap();
        assert_eq!(ds.index(), 2);
    }

    #[test]
    fn test_set_period_outside_domain() {
        let mut ds = make_dataset(&[1.0, 2.0, 4.0]);
        assert!(matches!(ds.set_period(0.5), Err(DatasetError::OutsidePeriodDomain { .. })));
        assert!(matches!(ds.set_period(f64::NAN), Err(DatasetError::OutsidePeriodDomain { .. })));
        assert!(ds.set_period(4.0).is_ok());
    }

    #[test]
    fn test_phase_wraps_negative() {
        let mut ds = make_dataset(&[10.0, 20.0]);
        ds.set_index(0).unwrap();
        let phases: Vec<f64> = ds.data_with_phase().map(|d| d.phase).collect();
        assert_eq!(phases[0], 0.0);
        assert!((phases[1] - 0.6).abs() < 1e-9);
        // 997 is 0.3 periods before the domain start
        assert!((phases[2] - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_copies() {
        let ds = make_dataset(&[1.0, 2.0, 4.0]);
        assert_eq!(ds.histogram(1).unwrap(), vec![1.0, 1.0]);
        assert_eq!(ds.histograms_range(0, 1).unwrap(), vec![0.0, 0.0, 1.0, 1.0]);
        assert_eq!(ds.histograms_range(2, 2).unwrap().len(), 2);
        assert!(ds.histogram(3).is_err());
        assert!(ds.histograms_range(0, 3).is_err());
        assert_eq!(
            ds.histograms_range(2, 1).unwrap_err(),
            DatasetError::EmptyRange { start: 2, end: 1 }
        );
    }

    #[test]
    fn test_additional_histogram_rows() {
        let mut data = additional(&[1.0, 2.0], 5.0);
        data.histograms[2] = 7.0;
        assert_eq!(data.histogram(0, 2), Some(&[5.0, 5.0][..]));
        assert_eq!(data.histogram(1, 2), Some(&[7.0, 5.0][..]));
        assert_eq!(data.histogram(2, 2), None);
    }

    #[test]
    fn test_splice_preserves_selected_period() {
        let mut ds = make_dataset(&[1.0, 2.0, 4.0, 8.0]);
        ds.set_index(2).unwrap();
        let (count, _) = counter(&mut ds);

        ds.splice(&additional(&[0.5, 3.0, 32.0], 9.0)).unwrap();

        assert_eq!(ds.periods(), &[0.5, 1.0, 2.0, 3.0, 4.0, 8.0, 32.0]);
        assert_eq!(ds.period(), 4.0);
        assert_eq!(ds.index(), 4);
        assert_eq!(ds.period_domain(), [0.5, 32.0]);
        assert_eq!(ds.histogram(0).unwrap(), vec![9.0, 9.0]);
        assert_eq!(ds.histogram(3).unwrap(), vec![9.0, 9.0]);
        assert_eq!(ds.histogram(4).unwrap(), vec![2.0, 2.0]);
        assert_eq!(ds.entropies().len(), 7);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_splice_keeps_duplicates_in_arrival_order() {
        let mut ds = make_dataset(&[1.0, 2.0, 4.0]);
        ds.set_index(1).unwrap();
        ds.splice(&additional(&[2.0], 7.0)).unwrap();
        assert_eq!(ds.periods(), &[1.0, 2.0, 2.0, 4.0]);
        assert_eq!(ds.histogram(1).unwrap(), vec![1.0, 1.0]);
        assert_eq!(ds.histogram(2).unwrap(), vec![7.0, 7.0]);
        assert_eq!(ds.index(), 1);
    }

    #[test]
    fn test_splice_rejects_bad_shape() {
        let mut ds = make_dataset(&[1.0, 2.0]);
        let mut data = additional(&[1.5], 1.0);
        data.histograms.push(0.0);
        assert!(ds.splice(&data).is_err());
        assert_eq!(ds.period_count(), 2);
    }

    #[test]
    fn test_suspend_batches_notifications() {
        let mut ds = make_dataset(&[1.0, 2.0, 4.0]);
        let (count, _) = counter(&mut ds);

        ds.suspend();
        ds.set_index(0).unwrap();
        ds.set_index(1).unwrap();
        ds.suspend();
        ds.set_period(4.0).unwrap();
        ds.resume();
        assert_eq!(count.get(), 0);
        ds.resume();
        assert_eq!(count.get(), 1);

        // Nothing pending: resume stays silent
        ds.suspend();
        ds.resume();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let mut ds = make_dataset(&[1.0, 2.0]);
        let (count, id) = counter(&mut ds);
        ds.set_index(0).unwrap();
        assert!(ds.unsubscribe(id));
        assert!(!ds.unsubscribe(id));
        ds.set_index(1).unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(ds.listener_count(), 0);
    }

    #[test]
    fn test_listener_sees_new_state() {
        let mut ds = make_dataset(&[1.0, 2.0, 4.0]);
        let seen = Rc::new(Cell::new(0.0));
        let s = seen.clone();
        ds.subscribe(move |d| s.set(d.period()));
        ds.set_index(0).unwrap();
        assert_eq!(seen.get(), 1.0);
    }

    #[test]
    fn test_replace_keeps_nearest_period() {
        let mut ds = make_dataset(&[1.0, 2.0, 4.0, 8.0]);
        ds.set_index(2).unwrap();
        let parts = DatasetParts {
            key: "test".into(),
            display_attribute: DisplayAttribute::Variance,
            num_bins: 3,
            temporal_domain_scaling: 1.0,
            period_domain: [1.0, 10.0],
            histograms: vec![0.0; 9],
            entropies: vec![0.0; 3],
            vectorstrengths: vec![0.0; 3],
            periods: vec![1.0, 3.5, 10.0],
            ..Default::default()
        };
        ds.replace(parts).unwrap();
        assert_eq!(ds.period(), 3.5);
        assert_eq!(ds.num_bins(), 3);
        assert_eq!(ds.display_attribute(), DisplayAttribute::Variance);
    }

    #[test]
    fn test_from_parts_rejects_malformed() {
        let parts = DatasetParts {
            num_bins: 2,
            histograms: vec![0.0; 3],
            entropies: vec![0.0; 2],
            vectorstrengths: vec![0.0; 2],
            periods: vec![1.0, 2.0],
            ..Default::default()
        };
        assert!(matches!(Dataset::from_parts(parts), Err(DatasetError::Malformed(_))));
        assert!(matches!(
            Dataset::from_parts(DatasetParts { num_bins: 2, ..Default::default() }),
            Err(DatasetError::Malformed(_))
        ));
    }

    #[test]
    fn test_binning_by_value() {
        let ds = make_dataset(&[1.0, 2.0]);
        assert_eq!(
            ds.binning_by_value(),
            &[(1.0, vec![0, 2]), (0.0, vec![1]), (2.0, vec![3])]
        );
    }

    #[test]
    fn test_lowest_entropy_periods() {
        let ds = make_dataset(&[1.0, 2.0, 4.0, 8.0]);
        // Entropy decreases with index
        assert_eq!(ds.lowest_entropy_periods(2), vec![4.0, 8.0]);
        assert_eq!(ds.lowest_entropy_periods(10).len(), 4);
    }

    #[test]
    fn test_wrap01() {
        assert_eq!(wrap01(0.25), 0.25);
        assert!((wrap01(-0.3) - 0.7).abs() < 1e-12);
        assert_eq!(wrap01(-1.0), 0.0);
        assert!(wrap01(-1e-18) < 1.0);
    }

    fn sorted_periods() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(1.0f64..1e6, 1..40).prop_map(|mut v| {
            v.sort_by(f64::total_cmp);
            v
        })
    }

    proptest! {
        #[test]
        fn prop_phase_in_unit_interval(time in -1e9f64..1e9, period in 1e-3f64..1e7) {
            let mut ds = make_dataset(&[period]);
            ds.datapoints = vec![Datapoint { x: 0.0, y: 0.0, value: 0.0, time }];
            for d in ds.data_with_phase() {
                prop_assert!(d.phase >= 0.0 && d.phase < 1.0);
            }
        }

        #[test]
        fn prop_set_period_is_nearest(periods in sorted_periods(), t in 0.0f64..1.0) {
            let mut ds = make_dataset(&periods);
            let [lo, hi] = ds.period_domain();
            let p = (lo + t * (hi - lo)).min(hi);
            ds.set_period(p).unwrap();
            let chosen = (ds.period() - p).abs();
            for &q in ds.periods() {
                prop_assert!(chosen <= (q - p).abs());
            }
        }

        #[test]
        fn prop_splice_sorted_and_widening(
            periods in sorted_periods(),
            extra in sorted_periods(),
            pick in 0usize..40,
        ) {
            let mut ds = make_dataset(&periods);
            ds.set_index(pick % periods.len()).unwrap();
            let selected = ds.period();
            let old_domain = ds.period_domain();

            ds.splice(&additional(&extra, 5.0)).unwrap();

            prop_assert_eq!(ds.period(), selected);
            prop_assert_eq!(ds.period_count(), periods.len() + extra.len());
            prop_assert!(ds.periods().windows(2).all(|w| w[0] <= w[1]));
            let domain = ds.period_domain();
            prop_assert!(domain[0] <= old_domain[0] && domain[1] >= old_domain[1]);
            prop_assert_eq!(ds.histograms().len(), ds.period_count() * ds.num_bins());
        }
    }
}
