//! Deterministic AI4I-shaped fixtures shared by the integration suites

#![allow(dead_code)]

use predmaint::schema::{MachineRecord, Observation};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt::Write as _;
use std::path::Path;

pub const RAW_HEADER: &str = "UDI,Product ID,Type,Air temperature [K],Process temperature [K],\
Rotational speed [rpm],Torque [Nm],Tool wear [min],Machine failure";

/// `n_rows` records with exactly `n_failures` failures spread evenly.
/// Failures run at high torque, high wear and low speed.
pub fn synthetic_records(n_rows: usize, n_failures: usize, seed: u64) -> Vec<MachineRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let step = if n_failures == 0 { usize::MAX } else { n_rows / n_failures };

    (0..n_rows)
        .map(|i| {
            let failed = n_failures > 0 && i % step == 0 && i / step < n_failures;
            let roll: f64 = rng.gen();
            let machine_type = if roll < 0.6 { "L" } else if roll < 0.9 { "M" } else { "H" };
            let air = 298.0 + rng.gen_range(-2.0..2.0);
            let (rpm, torque, wear) = if failed {
                (
                    rng.gen_range(1200..1350),
                    rng.gen_range(58.0..70.0),
                    rng.gen_range(200..240),
                )
            } else {
                (
                    rng.gen_range(1400..1700),
                    rng.gen_range(30.0..50.0),
                    rng.gen_range(0..180),
                )
            };

            MachineRecord {
                uid: i as i64 + 1,
                features: Observation {
                    air_temperature_k: (air * 10.0_f64).round() / 10.0,
                    process_temperature_k: ((air + 10.0 + rng.gen_range(-1.0..1.0)) * 10.0_f64).round() / 10.0,
                    rotational_speed_rpm: rpm,
                    torque_nm: (torque * 10.0_f64).round() / 10.0,
                    tool_wear_min: wear,
                    product_id: format!("{}{}", machine_type, 10000 + i),
                    machine_type: machine_type.to_string(),
                },
                machine_failure: u8::from(failed),
            }
        })
        .collect()
}

/// Render records in the raw AI4I layout
pub fn to_csv(records: &[MachineRecord]) -> String {
    let mut out = String::from(RAW_HEADER);
    out.push('\n');
    for r in records {
        let f = &r.features;
        let _ = writeln!(
            out,
            "{},{},{},{:.1},{:.1},{},{:.1},{},{}",
            r.uid,
            f.product_id,
            f.machine_type,
            f.air_temperature_k,
            f.process_temperature_k,
            f.rotational_speed_rpm,
            f.torque_nm,
            f.tool_wear_min,
            r.machine_failure
        );
    }
    out
}

/// Write a synthetic raw CSV and return its records
pub fn write_ai4i_csv(path: &Path, n_rows: usize, n_failures: usize, seed: u64) -> Vec<MachineRecord> {
    let records = synthetic_records(n_rows, n_failures, seed);
    std::fs::write(path, to_csv(&records)).unwrap();
    records
}

/// The sample reading used throughout scoring tests
pub fn sample_observation() -> Observation {
    Observation {
        air_temperature_k: 298.0,
        process_temperature_k: 310.0,
        rotational_speed_rpm: 1500,
        torque_nm: 40.0,
        tool_wear_min: 120,
        product_id: "M14860".to_string(),
        machine_type: "M".to_string(),
    }
}
