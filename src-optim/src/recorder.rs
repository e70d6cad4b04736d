//! Human readable CSV logs appended to the blob store
//!
//! Two logs per engine: one row per trial and one row per finished
//! generation ("convergence"). The header is written the first time a log
//! is touched, detected by the blob being absent or empty.

use serde::Serialize;

use crate::error::Result;
use crate::store::BlobStore;

pub const PSO_TRIAL_HEADER: [&str; 7] =
    ["iteration", "particle", "distance", "pwm", "error", "gbest_error", "inertia"];
pub const DE_TRIAL_HEADER: [&str; 6] =
    ["generation", "individual", "distance", "pwm", "error", "gbest_error"];
pub const PSO_CONVERGENCE_HEADER: [&str; 5] =
    ["iteration", "gbest_error", "kp_best", "ki_best", "kd_best"];
pub const DE_CONVERGENCE_HEADER: [&str; 5] =
    ["generation", "gbest_error", "kp_best", "ki_best", "kd_best"];

/// One PSO trial
#[derive(Debug, Clone, Serialize)]
pub struct PsoTrialRecord {
    pub iteration: usize,
    pub particle: usize,
    pub distance: f64,
    pub pwm: f64,
    pub error: f64,
    pub gbest_error: f64,
    pub inertia: f64,
}

/// One DE trial
#[derive(Debug, Clone, Serialize)]
pub struct DeTrialRecord {
    pub generation: usize,
    pub individual: usize,
    pub distance: f64,
    pub pwm: f64,
    pub error: f64,
    pub gbest_error: f64,
}

/// Best-so-far snapshot, shared by both engines
#[derive(Debug, Clone, Serialize)]
pub struct ConvergenceRecord {
    pub iteration: usize,
    pub gbest_error: f64,
    pub kp_best: f64,
    pub ki_best: f64,
    pub kd_best: f64,
}

/// Append `row` to the log `name`, writing `header` first if the log is new
pub(crate) fn append_row<S, R>(store: &mut S, name: &str, header: &[&str], row: &R) -> Result<()>
where
    S: BlobStore + ?Sized,
    R: Serialize,
{
    let is_new = !store.exists(name) || store.size(name)? == 0;

    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    if is_new {
        wtr.write_record(header)?;
    }
    wtr.serialize(row)?;
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;

    store.append(name, &bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_header_written_once() {
        let mut store = MemoryStore::new();
        let row = ConvergenceRecord {
            iteration: 3,
            gbest_error: 0.5,
            kp_best: 2.0,
            ki_best: 0.25,
            kd_best: 1.0,
        };
        append_row(&mut store, "CONVERG.txt", &PSO_CONVERGENCE_HEADER, &row).unwrap();
        append_row(&mut store, "CONVERG.txt", &PSO_CONVERGENCE_HEADER, &row).unwrap();

        let text = String::from_utf8(store.read("CONVERG.txt").unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "iteration,gbest_error,kp_best,ki_best,kd_best");
        assert_eq!(lines[1], "3,0.5,2.0,0.25,1.0");
        assert_eq!(lines[2], lines[1]);
    }

    #[test]
    fn test_empty_blob_gets_header() {
        let mut store = MemoryStore::new();
        store.insert("DE_DADOS.txt", Vec::new());
        let row = DeTrialRecord {
            generation: 0,
            individual: 1,
            distance: 20.0,
            pwm: 128.0,
            error: 3.5,
            gbest_error: 3.5,
        };
        append_row(&mut store, "DE_DADOS.txt", &DE_TRIAL_HEADER, &row).unwrap();

        let text = String::from_utf8(store.read("DE_DADOS.txt").unwrap()).unwrap();
        assert!(text.starts_with("generation,individual,distance,pwm,error,gbest_error\n"));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_failing_store_reports_error() {
        let mut store = MemoryStore::new();
        store.set_read_only(true);
        let row = ConvergenceRecord {
            iteration: 0,
            gbest_error: 1.0,
            kp_best: 1.0,
            ki_best: 0.0,
            kd_best: 0.0,
        };
        let err = append_row(&mut store, "CONVERG.txt", &PSO_CONVERGENCE_HEADER, &row).unwrap_err();
        assert!(err.is_persistence_error());
    }
}
