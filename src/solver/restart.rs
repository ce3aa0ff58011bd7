//! Restart reader.
//!
//! A restart file has one header line followed by one line per global
//! owned point, in global index order. Each line starts with the point
//! index; the temperature follows a block of flow columns whose width
//! depends on the solver mode, the dimension and the turbulence model.
//! Tokens are separated by whitespace or commas.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use hashbrown::HashMap;

use crate::config::{HeatConfig, RestartColumnPolicy, TurbulenceModel};
use crate::heat_error::HeatError;
use crate::topology::mesh::DualMesh;

/// Number of columns between the point index and the temperature.
pub fn skipped_columns(config: &HeatConfig, dim: usize) -> usize {
    if !config.is_flow() {
        return 0;
    }
    let turbulence = match (config.restart_columns, config.turbulence) {
        (RestartColumnPolicy::Legacy, TurbulenceModel::None) => TurbulenceModel::Sst,
        (_, model) => model,
    };
    let base = if dim == 2 { 5 } else { 6 };
    base + match turbulence {
        TurbulenceModel::None => 0,
        TurbulenceModel::Sa => 1,
        TurbulenceModel::Sst => 2,
    }
}

/// Read a restart file into a per-point temperature vector.
pub fn read_restart(
    path: impl AsRef<Path>,
    mesh: &DualMesh,
    config: &HeatConfig,
) -> Result<Vec<f64>, HeatError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        HeatError::StartupFailure(format!("cannot open restart file {}: {e}", path.display()))
    })?;
    parse_restart(file, mesh, config)
}

/// Parse restart data from any reader.
///
/// Lines of points owned by other partitions are skipped unparsed. Ghost
/// points take the last temperature read; the halo exchange of the first
/// iteration overwrites them.
pub fn parse_restart<R: Read>(
    mut reader: R,
    mesh: &DualMesh,
    config: &HeatConfig,
) -> Result<Vec<f64>, HeatError> {
    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .map_err(|e| HeatError::StartupFailure(format!("cannot read restart data: {e}")))?;

    if config.is_flow()
        && config.restart_columns == RestartColumnPolicy::Legacy
        && config.turbulence == TurbulenceModel::None
    {
        log::warn!("laminar restart read with the legacy SST column layout");
    }
    let skip = skipped_columns(config, mesh.dim());

    let global_to_local: HashMap<usize, usize> = mesh
        .points()
        .iter()
        .enumerate()
        .filter(|(_, p)| p.domain)
        .map(|(local, p)| (p.global_index, local))
        .collect();

    let mut solution = vec![0.0; mesh.n_points()];
    let mut last = 0.0;
    let mut lines = contents.lines();
    lines
        .next()
        .ok_or_else(|| HeatError::StartupFailure("restart file is empty".into()))?;

    for global in 0..mesh.global_domain_points() {
        let line = lines.next().ok_or_else(|| {
            HeatError::StartupFailure(format!("restart file ends before point {global}"))
        })?;
        let Some(&local) = global_to_local.get(&global) else {
            continue;
        };
        let raw = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .nth(skip + 1)
            .ok_or_else(|| {
                HeatError::StartupFailure(format!(
                    "restart line for point {global} has no temperature column"
                ))
            })?;
        let value = raw.parse::<f64>().map_err(|_| {
            HeatError::StartupFailure(format!("invalid temperature `{raw}` for point {global}"))
        })?;
        solution[local] = value;
        last = value;
    }

    for (t, p) in solution.iter_mut().zip(mesh.points()) {
        if !p.domain {
            *t = last;
        }
    }
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverMode;
    use crate::topology::mesh::MeshBuilder;

    fn flow_config(turbulence: TurbulenceModel, policy: RestartColumnPolicy) -> HeatConfig {
        let mut config = HeatConfig::default();
        config.mode = SolverMode::Flow;
        config.turbulence = turbulence;
        config.restart_columns = policy;
        config
    }

    #[test]
    fn column_layouts() {
        use RestartColumnPolicy::{AsDocumented, Legacy};
        use TurbulenceModel as Tm;
        assert_eq!(skipped_columns(&HeatConfig::default(), 3), 0);
        assert_eq!(skipped_columns(&flow_config(Tm::Sa, Legacy), 2), 6);
        assert_eq!(skipped_columns(&flow_config(Tm::Sst, Legacy), 2), 7);
        assert_eq!(skipped_columns(&flow_config(Tm::None, AsDocumented), 2), 5);
        assert_eq!(skipped_columns(&flow_config(Tm::None, Legacy), 2), 7);
        assert_eq!(skipped_columns(&flow_config(Tm::Sa, AsDocumented), 3), 7);
        assert_eq!(skipped_columns(&flow_config(Tm::Sst, AsDocumented), 3), 8);
        assert_eq!(skipped_columns(&flow_config(Tm::None, AsDocumented), 3), 6);
    }

    #[test]
    fn partitioned_read_takes_owned_lines() {
        let mut b = MeshBuilder::new(2);
        b.point_with([0.0; 3], 1.0, 2, true);
        b.point_with([1.0, 0.0, 0.0], 1.0, 0, true);
        b.point_with([2.0, 0.0, 0.0], 1.0, 1, false);
        b.global_domain_points(3);
        let mesh = b.build().unwrap();

        let data = "\"PointID\",\"Temperature\"\n0, 10.5\n1\t11.5\n2 12.5\n";
        let t = parse_restart(data.as_bytes(), &mesh, &HeatConfig::default()).unwrap();
        assert_eq!(t, vec![12.5, 10.5, 12.5]);
    }

    #[test]
    fn short_file_is_a_startup_failure() {
        let mut b = MeshBuilder::new(2);
        b.point([0.0; 3], 1.0);
        b.point([1.0, 0.0, 0.0], 1.0);
        let mesh = b.build().unwrap();
        let err = parse_restart("header\n0 1.0\n".as_bytes(), &mesh, &HeatConfig::default());
        assert!(matches!(err, Err(HeatError::StartupFailure(_))));
    }
}
