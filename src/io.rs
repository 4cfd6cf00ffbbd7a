//! JSON export of solution fields and their diagnostics.
//!
//! Arrays are written as plain nested lists so any plotting tool can read them.
//! serde_json writes non-finite values as `null`, so a blown-up field is
//! exported but cannot be read back.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::diagnostics::{
    self, BoundsReport, EnergyDecayReport, EnergyTrace, MaxPrincipleVerdict, MinPrincipleVerdict,
};
use crate::error::HeatResult;
use crate::field::SolutionField;
use crate::grid::GridSpec;
use crate::stability::{self, StabilityReport};
use crate::stepper::Scheme;

/// Axes and values of a [`SolutionField`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub x: Vec<f64>,
    pub t: Vec<f64>,
    /// `u[n][i]`, one list per time level.
    pub u: Vec<Vec<f64>>,
}

impl FieldRecord {
    pub fn from_field(field: &SolutionField) -> Self {
        Self {
            x: field.x().to_vec(),
            t: field.t().to_vec(),
            u: field.to_rows(),
        }
    }

    pub fn into_field(self) -> HeatResult<SolutionField> {
        SolutionField::from_rows(self.x, self.t, self.u)
    }
}

/// Invariant checks of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsRecord {
    pub scheme: Option<Scheme>,
    pub stability: Option<StabilityReport>,
    pub bounds: BoundsReport,
    pub maximum_principle: MaxPrincipleVerdict,
    pub minimum_principle: MinPrincipleVerdict,
    pub energy: EnergyTrace,
    pub energy_decay: EnergyDecayReport,
}

impl DiagnosticsRecord {
    /// Run every diagnostic on `field`. `scheme` is the stepper that produced it,
    /// if any.
    pub fn collect(field: &SolutionField, grid: &GridSpec, scheme: Option<Scheme>) -> Self {
        let energy = diagnostics::energy_trace(field, grid);
        let energy_decay = diagnostics::energy_decay(&energy);
        Self {
            scheme,
            stability: scheme.map(|s| stability::validate(grid, s)),
            bounds: diagnostics::extremal_bounds(grid),
            maximum_principle: diagnostics::verify_maximum_principle(field, grid),
            minimum_principle: diagnostics::verify_minimum_principle(field, grid),
            energy,
            energy_decay,
        }
    }
}

/// On-disk document: the field plus optional diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDocument {
    pub field: FieldRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<DiagnosticsRecord>,
}

/// Writes a field (and optionally its diagnostics) to a JSON file.
pub fn write_field_json(
    path: &Path,
    field: &SolutionField,
    diagnostics: Option<&DiagnosticsRecord>,
) -> Result<()> {
    let document = FieldDocument {
        field: FieldRecord::from_field(field),
        diagnostics: diagnostics.cloned(),
    };
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &document)
        .with_context(|| format!("Failed to serialize field to: {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush file: {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote solution field");
    Ok(())
}

/// Reads a document written by [`write_field_json`].
pub fn read_field_json(path: &Path) -> Result<FieldDocument> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let document: FieldDocument = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to deserialize field from: {}", path.display()))?;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stepper::TimeStepper;
    use tempfile::tempdir;

    fn grid() -> GridSpec {
        GridSpec::builder().nx(11).t_end(0.5).nt(21).build().unwrap()
    }

    #[test]
    fn test_write_and_read_field() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("field.json");
        let grid = grid();
        let field = TimeStepper::implicit().run(&grid)?;
        let diag = DiagnosticsRecord::collect(&field, &grid, Some(Scheme::Implicit));
        assert!(!diag.maximum_principle.violated);
        assert!(diag.energy_decay.monotone);

        write_field_json(&path, &field, Some(&diag))?;
        let loaded = read_field_json(&path)?;
        assert_eq!(loaded.diagnostics.as_ref(), Some(&diag));
        let back = loaded.field.into_field()?;
        assert_eq!(back.shape(), field.shape());
        assert_eq!(back.max_abs_difference(&field), Some(0.0));
        Ok(())
    }

    #[test]
    fn test_diagnostics_are_optional() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("bare.json");
        let field = SolutionField::new(&grid());
        write_field_json(&path, &field, None)?;
        let text = std::fs::read_to_string(&path)?;
        assert!(!text.contains("diagnostics"));
        assert!(read_field_json(&path)?.diagnostics.is_none());
        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_buffered_write_failure_is_reported() {
        // Every write to /dev/full fails with ENOSPC; a small document only
        // reaches it when the buffer is flushed.
        let path = Path::new("/dev/full");
        if !path.exists() {
            return;
        }
        let field = SolutionField::new(&grid());
        let err = write_field_json(path, &field, None).unwrap_err();
        assert!(err.to_string().contains("/dev/full"), "{err:#}");
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let record = FieldRecord {
            x: vec![0.0, 1.0],
            t: vec![0.0],
            u: vec![vec![1.0]],
        };
        assert!(record.into_field().is_err());
    }
}
