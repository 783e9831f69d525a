//! Prediction vs. ground-truth comparison over converted frames.
//!
//! Within a frame, a predicted box may match a ground-truth box when both
//! carry the same label and their axis-aligned footprints overlap.  Matching
//! is greedy and one-to-one: candidate pairs are taken nearest center first,
//! ties broken by ground-truth index and then predicted index, so results
//! are deterministic.
//!
//! Both box lists and the lidar sweeps are assumed to be in the same frame,
//! which holds for the default vehicle target frame.
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use lvt_convert::compare::{compare_frame, summarize};
//! use lvt_convert::frame::Frame;
//! use lvt_geometry::{BoundingBox3D, BoxSize, Pose, Quaternion, Vec3};
//!
//! let car = |x: f64, confidence: f64| {
//!     BoundingBox3D::new(Vec3::new(x, 0.0, 0.0), BoxSize::new(4.0, 2.0, 1.5), Quaternion::identity(), "car", confidence)
//!         .unwrap()
//! };
//! let frame = Frame {
//!     frame_num: 0,
//!     ego_pose: Pose::identity(),
//!     ground_truth: vec![car(0.0, 100.0), car(20.0, 100.0)],
//!     predicted: vec![car(0.5, 80.0)],
//!     point_clouds: BTreeMap::new(),
//! };
//!
//! let cmp = compare_frame(&frame);
//! assert_eq!(cmp.matches.len(), 1);
//! assert_eq!(cmp.unmatched_ground_truth, vec![1]);
//!
//! let summary = summarize([&cmp]);
//! assert_eq!(summary.precision(), Some(1.0));
//! assert_eq!(summary.recall(), Some(0.5));
//! ```

use lvt_geometry::{box_distance, boxes_overlap, points_in_box};
use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// One matched pair, by index into the frame's box lists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxMatch {
    pub ground_truth: usize,
    pub predicted: usize,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameComparison {
    pub frame_num: u64,
    pub matches: Vec<BoxMatch>,
    pub unmatched_ground_truth: Vec<usize>,
    pub unmatched_predicted: Vec<usize>,
    /// Ground-truth boxes that contain no lidar point.  Empty when the frame
    /// carries no sweeps.
    pub unsupported_ground_truth: Vec<usize>,
}

pub fn compare_frame(frame: &Frame) -> FrameComparison {
    let mut candidates = Vec::new();
    for (g, gt) in frame.ground_truth.iter().enumerate() {
        for (p, pred) in frame.predicted.iter().enumerate() {
            if gt.label() == pred.label() && boxes_overlap(gt, pred) {
                candidates.push(BoxMatch {
                    ground_truth: g,
                    predicted: p,
                    distance: box_distance(gt, pred),
                });
            }
        }
    }
    candidates.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.ground_truth.cmp(&b.ground_truth))
            .then(a.predicted.cmp(&b.predicted))
    });

    let mut gt_used = vec![false; frame.ground_truth.len()];
    let mut pred_used = vec![false; frame.predicted.len()];
    let mut matches = Vec::new();
    for candidate in candidates {
        if gt_used[candidate.ground_truth] || pred_used[candidate.predicted] {
            continue;
        }
        gt_used[candidate.ground_truth] = true;
        pred_used[candidate.predicted] = true;
        matches.push(candidate);
    }

    let unsupported_ground_truth = if frame.point_clouds.is_empty() {
        Vec::new()
    } else {
        frame
            .ground_truth
            .iter()
            .enumerate()
            .filter(|(_, b)| {
                frame
                    .point_clouds
                    .values()
                    .all(|sweep| points_in_box(&sweep.points, b) == 0)
            })
            .map(|(i, _)| i)
            .collect()
    };

    FrameComparison {
        frame_num: frame.frame_num,
        matches,
        unmatched_ground_truth: unused(&gt_used),
        unmatched_predicted: unused(&pred_used),
        unsupported_ground_truth,
    }
}

fn unused(flags: &[bool]) -> Vec<usize> {
    flags
        .iter()
        .enumerate()
        .filter(|(_, used)| !**used)
        .map(|(i, _)| i)
        .collect()
}

/// Totals over many frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub frames: usize,
    pub ground_truth: usize,
    pub predicted: usize,
    pub matched: usize,
    pub unsupported_ground_truth: usize,
    distance_sum: f64,
}

impl ComparisonSummary {
    pub fn add(&mut self, cmp: &FrameComparison) {
        self.frames += 1;
        self.matched += cmp.matches.len();
        self.ground_truth += cmp.matches.len() + cmp.unmatched_ground_truth.len();
        self.predicted += cmp.matches.len() + cmp.unmatched_predicted.len();
        self.unsupported_ground_truth += cmp.unsupported_ground_truth.len();
        self.distance_sum += cmp.matches.iter().map(|m| m.distance).sum::<f64>();
    }

    /// Matched / predicted, or `None` with no predictions.
    pub fn precision(&self) -> Option<f64> {
        (self.predicted > 0).then(|| self.matched as f64 / self.predicted as f64)
    }

    /// Matched / ground truth, or `None` with no ground truth.
    pub fn recall(&self) -> Option<f64> {
        (self.ground_truth > 0).then(|| self.matched as f64 / self.ground_truth as f64)
    }

    /// Mean center distance over matched pairs.
    pub fn mean_distance(&self) -> Option<f64> {
        (self.matched > 0).then(|| self.distance_sum / self.matched as f64)
    }
}

pub fn summarize<'a>(comparisons: impl IntoIterator<Item = &'a FrameComparison>) -> ComparisonSummary {
    let mut summary = ComparisonSummary::default();
    for cmp in comparisons {
        summary.add(cmp);
    }
    summary
}
