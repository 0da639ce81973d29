//! Text-labelled target datasets.
//!
//! A dataset is an ordered collection of [`TrainingPair`] records, each a
//! natural-language label plus the voxel list it describes. Records are
//! persisted as a JSON array (`[{ "text", "voxels", "voxel_count" }, ...]`)
//! when the `serde` feature is enabled.

use rand::rngs::StdRng;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{CoordinatePolicy, TargetGenerator, TargetStructure};
use crate::error::EnvError;
use crate::types::Coord;

/// One labelled target: a text prompt and its voxel coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrainingPair {
    pub text: String,
    pub voxels: Vec<Coord>,
    /// Recorded voxel count; optional in JSON, filled in by `validate`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub voxel_count: usize,
}

impl TrainingPair {
    /// Creates a record, deriving `voxel_count` from the voxel list.
    pub fn new(text: impl Into<String>, voxels: Vec<Coord>) -> Self {
        let voxel_count = voxels.len();
        Self {
            text: text.into(),
            voxels,
            voxel_count,
        }
    }

    /// Checks the record is usable, filling in a missing `voxel_count`
    /// and repairing a stale one.
    pub fn validate(&mut self) -> Result<(), EnvError> {
        if self.voxels.is_empty() {
            return Err(EnvError::EmptyTarget {
                label: self.text.clone(),
            });
        }
        if self.voxel_count != self.voxels.len() {
            if self.voxel_count != 0 {
                warn!(
                    text = %self.text,
                    recorded = self.voxel_count,
                    actual = self.voxels.len(),
                    "voxel_count does not match voxel list; repairing"
                );
            }
            self.voxel_count = self.voxels.len();
        }
        Ok(())
    }

    /// Converts the record into a target on a grid of side `size`.
    pub fn to_target(
        &self,
        size: usize,
        policy: CoordinatePolicy,
    ) -> Result<TargetStructure, EnvError> {
        TargetStructure::from_voxels(size, &self.voxels, policy, self.text.clone())
    }
}

/// Replays dataset records in order, cycling back to the first.
#[derive(Debug, Clone)]
pub struct DatasetTargets {
    pairs: Vec<TrainingPair>,
    cursor: usize,
    policy: CoordinatePolicy,
}

impl DatasetTargets {
    /// Creates a replaying generator. Every record is validated up front.
    pub fn new(
        mut pairs: Vec<TrainingPair>,
        policy: CoordinatePolicy,
    ) -> Result<Self, EnvError> {
        if pairs.is_empty() {
            return Err(EnvError::InvalidConfig("dataset contains no records".into()));
        }
        for pair in &mut pairs {
            pair.validate()?;
        }
        Ok(Self {
            pairs,
            cursor: 0,
            policy,
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Always false; an empty dataset is rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Records in replay order.
    pub fn pairs(&self) -> &[TrainingPair] {
        &self.pairs
    }
}

impl TargetGenerator for DatasetTargets {
    fn generate(
        &mut self,
        grid_size: usize,
        _rng: &mut StdRng,
    ) -> Result<TargetStructure, EnvError> {
        let pair = &self.pairs[self.cursor];
        self.cursor = (self.cursor + 1) % self.pairs.len();
        debug!(text = %pair.text, voxels = pair.voxels.len(), "loading dataset target");

        let target = pair.to_target(grid_size, self.policy)?;
        if !target.is_empty() {
            return Ok(target);
        }

        // Nothing survived sanitizing: substitute a stock shape.
        let fallback = if pair.text.to_lowercase().contains("wall") {
            TargetStructure::fallback_wall()
        } else {
            TargetStructure::fallback_pyramid()
        };
        warn!(
            text = %pair.text,
            grid_size,
            "dataset record has no in-grid voxels; using fallback shape"
        );
        let target =
            TargetStructure::from_voxels(grid_size, &fallback, self.policy, pair.text.clone())?;
        if target.is_empty() {
            return Err(EnvError::EmptyTarget {
                label: pair.text.clone(),
            });
        }
        Ok(target)
    }

    fn name(&self) -> &str {
        "dataset"
    }
}

#[cfg(feature = "serde")]
mod io {
    use std::fs::File;
    use std::io::{BufReader, BufWriter};
    use std::path::Path;

    use super::TrainingPair;
    use crate::error::DatasetError;

    /// Parses records from a JSON array, validating each one.
    pub fn parse_training_pairs(json: &str) -> Result<Vec<TrainingPair>, DatasetError> {
        let mut pairs: Vec<TrainingPair> = serde_json::from_str(json)?;
        for pair in &mut pairs {
            pair.validate()?;
        }
        Ok(pairs)
    }

    /// Loads records from a JSON file.
    pub fn load_training_pairs(path: impl AsRef<Path>) -> Result<Vec<TrainingPair>, DatasetError> {
        let reader = BufReader::new(File::open(path)?);
        let mut pairs: Vec<TrainingPair> = serde_json::from_reader(reader)?;
        for pair in &mut pairs {
            pair.validate()?;
        }
        Ok(pairs)
    }

    /// Writes records to a pretty-printed JSON file.
    pub fn save_training_pairs(
        path: impl AsRef<Path>,
        pairs: &[TrainingPair],
    ) -> Result<(), DatasetError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, pairs)?;
        Ok(())
    }
}

#[cfg(feature = "serde")]
pub use io::{load_training_pairs, parse_training_pairs, save_training_pairs};

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn pair(text: &str, voxels: &[(i32, i32, i32)]) -> TrainingPair {
        TrainingPair::new(
            text,
            voxels.iter().map(|&(x, y, z)| Coord::new(x, y, z)).collect(),
        )
    }

    #[test]
    fn validate_repairs_voxel_count() {
        let mut p = pair("tower", &[(1, 0, 1), (1, 1, 1)]);
        p.voxel_count = 7;
        p.validate().unwrap();
        assert_eq!(p.voxel_count, 2);
    }

    #[test]
    fn validate_rejects_empty() {
        let mut p = pair("nothing", &[]);
        assert_eq!(
            p.validate(),
            Err(EnvError::EmptyTarget {
                label: "nothing".into()
            })
        );
    }

    #[test]
    fn dataset_replays_in_order_and_cycles() {
        let mut ds = DatasetTargets::new(
            vec![pair("a", &[(0, 0, 0)]), pair("b", &[(1, 0, 1)])],
            CoordinatePolicy::Drop,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let labels: Vec<String> = (0..3)
            .map(|_| ds.generate(4, &mut rng).unwrap().label().to_string())
            .collect();
        assert_eq!(labels, vec!["a", "b", "a"]);
    }

    #[test]
    fn out_of_grid_record_falls_back_to_pyramid() {
        let mut ds =
            DatasetTargets::new(vec![pair("far", &[(50, 0, 50)])], CoordinatePolicy::Drop).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let target = ds.generate(8, &mut rng).unwrap();
        assert_eq!(target.label(), "far");
        assert_eq!(target.cell_count(), 30);
    }

    #[test]
    fn out_of_grid_wall_record_falls_back_to_wall() {
        let mut ds = DatasetTargets::new(
            vec![pair("a far Wall", &[(-3, 0, 40)])],
            CoordinatePolicy::Drop,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let target = ds.generate(8, &mut rng).unwrap();
        assert_eq!(target.cell_count(), 24);
    }

    #[test]
    fn fallback_that_misses_the_grid_is_an_empty_target() {
        let mut ds =
            DatasetTargets::new(vec![pair("far", &[(50, 0, 50)])], CoordinatePolicy::Drop).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            ds.generate(2, &mut rng).unwrap_err(),
            EnvError::EmptyTarget {
                label: "far".into()
            }
        );
    }

    #[test]
    fn empty_dataset_is_rejected() {
        assert!(DatasetTargets::new(vec![], CoordinatePolicy::Drop).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn parses_json_records() {
        let json = r#"[
            {"text": "tower 2", "voxels": [{"x": 3, "y": 0, "z": 3}, {"x": 3, "y": 1, "z": 3}], "voxel_count": 2},
            {"text": "dot", "voxels": [{"x": 0, "y": 0, "z": 0}], "voxel_count": 1}
        ]"#;
        let pairs = parse_training_pairs(json).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].voxels[1], Coord::new(3, 1, 3));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn voxel_count_is_optional_in_json() {
        let json = r#"[{"text": "pair", "voxels": [{"x": 0, "y": 0, "z": 0}, {"x": 1, "y": 0, "z": 0}]}]"#;
        let pairs = parse_training_pairs(json).unwrap();
        assert_eq!(pairs[0].voxel_count, 2);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_with_empty_record_is_invalid() {
        let json = r#"[{"text": "void", "voxels": [], "voxel_count": 0}]"#;
        let err = parse_training_pairs(json).unwrap_err();
        assert!(matches!(
            err,
            crate::error::DatasetError::Invalid(EnvError::EmptyTarget { .. })
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn save_then_load_file() {
        let path = std::env::temp_dir().join(format!(
            "voxswarm_pairs_{}.json",
            std::process::id()
        ));
        let pairs = vec![pair("wall", &[(0, 0, 2), (1, 0, 2), (2, 0, 2)])];
        save_training_pairs(&path, &pairs).unwrap();
        let loaded = load_training_pairs(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, pairs);
    }
}
