//! Single-pass accumulation of per-label statistics.
//!
//! The label array is split along its first axis and each slice
//! is folded into a map of partial accumulators on the rayon
//! pool; partial maps are then merged. Keys are kept in a
//! `BTreeMap`, so regions always come out in ascending label
//! order whatever the scheduling.

use std::collections::btree_map::{BTreeMap, Entry};

use log::debug;
use ndarray::{ArrayViewD, Axis, Dimension};
use rayon::prelude::*;

use crate::data::image::check_shapes;
use crate::MetricsError;

/// Running intensity statistics of one channel within one region.
/// Variance is tracked with Welford's update and merged with
/// Chan's pairwise formula.
#[derive(Debug, Clone)]
struct ChannelStats {
    min : f64,
    max : f64,
    sum : f64,
    m2 : f64,
    /// Σ coord[d] * value, per spatial axis
    weighted : Vec<f64>,
}

impl ChannelStats {
    fn new(ndim : usize) -> Self {
        ChannelStats {
            min : f64::INFINITY,
            max : f64::NEG_INFINITY,
            sum : 0.0,
            m2 : 0.0,
            weighted : vec![0.0; ndim],
        }
    }
}

/// `f64::min` and `f64::max` skip NaN; a NaN sample makes the
/// region's extrema NaN, like its mean and std.
fn nan_min(a : f64, b : f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) }
}

fn nan_max(a : f64, b : f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.max(b) }
}

/// Partial statistics of one label over the pixels seen so far.
#[derive(Debug, Clone)]
pub(crate) struct Accumulator {
    area : u64,
    bbox_min : Vec<usize>,
    bbox_max : Vec<usize>,
    coord_sum : Vec<f64>,
    channels : Vec<ChannelStats>,
}

impl Accumulator {
    fn new(ndim : usize, n_channels : usize) -> Self {
        Accumulator {
            area : 0,
            bbox_min : vec![usize::MAX; ndim],
            bbox_max : vec![0; ndim],
            coord_sum : vec![0.0; ndim],
            channels : vec![ChannelStats::new(ndim); n_channels],
        }
    }

    fn push(&mut self, coord : &[usize], values : &[f64]) {
        self.area += 1;
        let n = self.area as f64;

        for (d, &c) in coord.iter().enumerate() {
            self.bbox_min[d] = self.bbox_min[d].min(c);
            self.bbox_max[d] = self.bbox_max[d].max(c);
            self.coord_sum[d] += c as f64;
        }

        for (stats, &v) in self.channels.iter_mut().zip(values.iter()) {
            stats.min = nan_min(stats.min, v);
            stats.max = nan_max(stats.max, v);
            if n > 1.0 {
                let mean_before = stats.sum / (n - 1.0);
                stats.sum += v;
                stats.m2 += (v - mean_before) * (v - stats.sum / n);
            } else {
                stats.sum += v;
            }
            for (w, &c) in stats.weighted.iter_mut().zip(coord.iter()) {
                *w += c as f64 * v;
            }
        }
    }

    fn merge(&mut self, other : Accumulator) {
        if other.area == 0 {
            return;
        }
        if self.area == 0 {
            *self = other;
            return;
        }
        let (n_a, n_b) = (self.area as f64, other.area as f64);
        let n = n_a + n_b;

        for d in 0..self.bbox_min.len() {
            self.bbox_min[d] = self.bbox_min[d].min(other.bbox_min[d]);
            self.bbox_max[d] = self.bbox_max[d].max(other.bbox_max[d]);
            self.coord_sum[d] += other.coord_sum[d];
        }

        for (a, b) in self.channels.iter_mut().zip(other.channels) {
            let delta = b.sum / n_b - a.sum / n_a;
            a.m2 += b.m2 + delta * delta * n_a * n_b / n;
            a.min = nan_min(a.min, b.min);
            a.max = nan_max(a.max, b.max);
            a.sum += b.sum;
            for (w_a, w_b) in a.weighted.iter_mut().zip(b.weighted) {
                *w_a += w_b;
            }
        }
        self.area += other.area;
    }

    fn finish(self, label : u32) -> Region {
        let n = self.area as f64;
        let centroid = self.coord_sum.iter().map(|s| s / n).collect();
        let bbox = self.bbox_min.iter().copied()
            .zip(self.bbox_max.iter().map(|&m| m + 1))
            .collect();
        let intensity = self.channels.into_iter().map(|stats| {
            let weighted_centroid = stats.weighted.iter()
                .map(|w| if stats.sum != 0.0 { w / stats.sum } else { f64::NAN })
                .collect();
            IntensityStats {
                min : stats.min,
                max : stats.max,
                mean : stats.sum / n,
                std : nan_max(stats.m2 / n, 0.0).sqrt(),
                weighted_centroid,
            }
        }).collect();

        Region { label, area : self.area, bbox, centroid, intensity }
    }
}

/// Intensity statistics of one channel within a region.
/// `std` is the population standard deviation.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityStats {
    pub min : f64,
    pub max : f64,
    pub mean : f64,
    pub std : f64,
    pub weighted_centroid : Vec<f64>,
}

/// The finished measurements of one labeled object.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub label : u32,
    /// Pixel (voxel) count
    pub area : u64,
    /// `(min, max)` per axis, `max` exclusive
    pub bbox : Vec<(usize, usize)>,
    pub centroid : Vec<f64>,
    /// One entry per channel, empty without an intensity image
    pub intensity : Vec<IntensityStats>,
}

impl Region {
    pub fn area_bbox(&self) -> u64 {
        self.bbox.iter().map(|&(lo, hi)| (hi - lo) as u64).product()
    }

    pub fn extent(&self) -> f64 {
        self.area as f64 / self.area_bbox() as f64
    }

    /// Diameter of the n-ball with the same volume as the region
    pub fn equivalent_diameter(&self) -> f64 {
        let ndim = self.bbox.len();
        // unit n-ball volumes: V0 = 1, V1 = 2, Vn = Vn-2 * 2π / n
        let mut volumes = [1.0, 2.0];
        for n in 2..=ndim {
            volumes[n % 2] *= 2.0 * std::f64::consts::PI / n as f64;
        }
        let unit = volumes[ndim % 2];
        2.0 * (self.area as f64 / unit).powf(1.0 / ndim as f64)
    }
}

/// All regions of a label image, plus what the table needs to
/// know about the arrays they came from.
#[derive(Debug, Clone)]
pub struct Regions {
    pub regions : Vec<Region>,
    /// Spatial dimensionality of the label image
    pub ndim : usize,
    /// Number of intensity channels (0 without an intensity image)
    pub channels : usize,
    /// The intensity image carried its own channel axis
    pub multichannel : bool,
}

type PartialMap = BTreeMap<u32, Accumulator>;

fn merge_maps(mut a : PartialMap, b : PartialMap) -> PartialMap {
    for (label, acc) in b {
        match a.entry(label) {
            Entry::Vacant(slot) => { slot.insert(acc); },
            Entry::Occupied(mut slot) => slot.get_mut().merge(acc),
        }
    }
    a
}

/// Folds one slice (index `i` along the first axis) into `acc`.
fn accumulate_slice(
    mut acc : PartialMap,
    i : usize,
    labels : &ArrayViewD<u32>,
    intensity : Option<&ArrayViewD<f64>>,
    n_channels : usize,
    ) -> PartialMap {
    let ndim = labels.ndim();
    let label_slice = labels.index_axis(Axis(0), i);
    let mut coord = vec![0usize; ndim];
    coord[0] = i;

    match intensity {
        Some(intensity) => {
            let slice = intensity.index_axis(Axis(0), i);
            let channel_axis = Axis(slice.ndim() - 1);
            let mut values = Vec::with_capacity(n_channels);
            label_slice.indexed_iter()
                .zip(slice.lanes(channel_axis).into_iter())
                .for_each(|((idx, &label), lane)| {
                    if label == 0 {
                        return;
                    }
                    coord[1..].copy_from_slice(idx.slice());
                    values.clear();
                    values.extend(lane.iter().copied());
                    acc.entry(label)
                        .or_insert_with(|| Accumulator::new(ndim, n_channels))
                        .push(&coord, &values);
                });
        },
        None => {
            label_slice.indexed_iter().for_each(|(idx, &label)| {
                if label == 0 {
                    return;
                }
                coord[1..].copy_from_slice(idx.slice());
                acc.entry(label)
                    .or_insert_with(|| Accumulator::new(ndim, 0))
                    .push(&coord, &[]);
            });
        }
    }
    acc
}

/// Measures every nonzero label of `labels`.
///
/// ## Arguments
///
/// * `labels` - The label image; 0 is background
/// * `intensity` - Optional intensity image, with the same shape as
/// `labels` or with one extra trailing channel axis
///
/// ## Errors
///
/// * `DimensionsError::MismatchedShapes` - if the intensity image does not
/// line up with the labels
pub fn collect_regions(
    labels : ArrayViewD<u32>,
    intensity : Option<ArrayViewD<f64>>,
    ) -> Result<Regions, MetricsError> {
    let ndim = labels.ndim();
    if ndim == 0 {
        return Err(MetricsError::Format("Label image must have at least one axis".into()));
    }

    let (n_channels, multichannel) = match intensity.as_ref() {
        Some(im) => (check_shapes(labels.shape(), im.shape())?, im.ndim() > ndim),
        None => (0, false),
    };
    // give single-channel intensity a length-1 channel axis so
    // both cases take the same path
    let intensity = intensity.map(|im| {
        if im.ndim() == ndim { im.insert_axis(Axis(ndim)) } else { im }
    });

    let partials = (0..labels.len_of(Axis(0)))
        .into_par_iter()
        .fold(PartialMap::new, |acc, i| {
            accumulate_slice(acc, i, &labels, intensity.as_ref(), n_channels)
        })
        .reduce(PartialMap::new, merge_maps);

    let regions : Vec<Region> = partials.into_iter()
        .map(|(label, acc)| acc.finish(label))
        .collect();
    debug!("Collected {} regions from labels {:?}", regions.len(), labels.shape());

    Ok(Regions { regions, ndim, channels : n_channels, multichannel })
}
