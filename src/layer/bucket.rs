//! Per-plot storage for layer data.

use std::collections::BTreeMap;

use crate::types::PlotId;

/// Key that applies one value to every plot
pub const ALL_PLOTS: &str = "*";

/// A value per plot, or one value shared by every plot.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PlotBucket<T> {
    #[default]
    Empty,
    All(T),
    PerPlot(BTreeMap<PlotId, T>),
}

impl<T: Clone> PlotBucket<T> {
    /// The value for `plot_id`. A per-plot bucket falls back to its
    /// [`ALL_PLOTS`] entry.
    pub fn get(&self, plot_id: &str) -> Option<&T> {
        match self {
            PlotBucket::Empty => None,
            PlotBucket::All(v) => Some(v),
            PlotBucket::PerPlot(map) => map.get(plot_id).or_else(|| map.get(ALL_PLOTS)),
        }
    }

    /// New bucket with `value` stored for `plot_id`, or for every plot when
    /// `plot_id` is `None`.
    pub fn with(&self, plot_id: Option<&str>, value: Option<T>) -> Self {
        match (plot_id, value) {
            (None, Some(v)) => PlotBucket::All(v),
            (None, None) => PlotBucket::Empty,
            (Some(id), value) => {
                let mut map = match self {
                    PlotBucket::PerPlot(map) => map.clone(),
                    _ => BTreeMap::new(),
                };
                match value {
                    Some(v) => map.insert(id.to_string(), v),
                    None => map.remove(id),
                };
                if map.is_empty() {
                    PlotBucket::Empty
                } else {
                    PlotBucket::PerPlot(map)
                }
            }
        }
    }

    /// Drop the entries for plots not in `keep`.
    pub fn retain_plots(&self, keep: &[PlotId]) -> Self {
        match self {
            PlotBucket::PerPlot(map) => {
                let map: BTreeMap<_, _> = map
                    .iter()
                    .filter(|(id, _)| id.as_str() == ALL_PLOTS || keep.contains(id))
                    .map(|(id, v)| (id.clone(), v.clone()))
                    .collect();
                if map.is_empty() {
                    PlotBucket::Empty
                } else {
                    PlotBucket::PerPlot(map)
                }
            }
            other => other.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PlotBucket::Empty)
    }

    /// Plots with their own entry
    pub fn plot_ids(&self) -> Vec<&str> {
        match self {
            PlotBucket::PerPlot(map) => map.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_plot_falls_back_to_all_plots_key() {
        let bucket = PlotBucket::Empty
            .with(Some(ALL_PLOTS), Some(1))
            .with(Some("p1"), Some(2));
        assert_eq!(bucket.get("p1"), Some(&2));
        assert_eq!(bucket.get("p2"), Some(&1));
    }

    #[test]
    fn removing_last_entry_empties_bucket() {
        let bucket = PlotBucket::Empty.with(Some("p1"), Some(2));
        assert!(bucket.with(Some("p1"), None).is_empty());
        assert_eq!(PlotBucket::All(3).get("anything"), Some(&3));
    }

    #[test]
    fn retain_prunes_detached_plots() {
        let bucket = PlotBucket::Empty
            .with(Some("p1"), Some(1))
            .with(Some("p2"), Some(2));
        let kept = bucket.retain_plots(&["p2".to_string()]);
        assert_eq!(kept.plot_ids(), vec!["p2"]);
    }
}
