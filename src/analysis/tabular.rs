//! Shape, completeness and type consistency of tabular datasets.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{error, info, warn};

use super::{all_close, Verdict};
use crate::dataset::{CellType, DatasetHandle, DatasetKind, Values};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TableSummary {
    pub row_count: Option<usize>,
    pub column_count: Option<usize>,
    pub missing_cells: Option<usize>,
    /// Columns whose non-null cells disagree on type. `None` for gridded data.
    pub mixed_type_columns: Option<BTreeMap<String, Vec<CellType>>>,
    pub time_consistency: Verdict,
}

/// Summarises a tabular handle. Gridded handles get an all-undefined summary.
pub fn analyze_table(handle: &DatasetHandle, time_column: &str) -> TableSummary {
    if handle.kind() != DatasetKind::Tabular {
        return TableSummary::default();
    }

    let mixed = mixed_type_columns(handle);
    if !mixed.is_empty() {
        warn!(
            "Columns with mixed types in {}: {:?}",
            handle.source().display(),
            mixed.keys().collect::<Vec<_>>()
        );
    }

    TableSummary {
        row_count: Some(handle.row_count()),
        column_count: Some(handle.variables().len()),
        missing_cells: Some(handle.variables().iter().map(|v| v.null_count()).sum()),
        mixed_type_columns: Some(mixed),
        time_consistency: time_column_consistency(handle, time_column),
    }
}

/// Columns holding more than one kind of value. Integers and floats widen to
/// a single numeric type and are not reported.
pub fn mixed_type_columns(handle: &DatasetHandle) -> BTreeMap<String, Vec<CellType>> {
    handle
        .variables()
        .iter()
        .filter_map(|column| {
            let types = column.cell_types();
            let numeric_only = types
                .iter()
                .all(|t| matches!(t, CellType::Integer | CellType::Float));
            if types.len() > 1 && !numeric_only {
                Some((column.name.clone(), types.into_iter().collect()))
            } else {
                None
            }
        })
        .collect()
}

/// Checks that the named time column advances in equal steps.
///
/// Steps are compared in seconds against their mean. A missing column, an
/// unparseable entry or fewer than two timestamps give `Undefined`.
pub fn time_column_consistency(handle: &DatasetHandle, time_column: &str) -> Verdict {
    let Some(column) = handle.variable(time_column) else {
        warn!(
            "No `{}` column in {}",
            time_column,
            handle.source().display()
        );
        return Verdict::Undefined;
    };
    let Values::Cells(cells) = &column.values else {
        return Verdict::Undefined;
    };

    let mut times = Vec::with_capacity(cells.len());
    for cell in cells.iter().filter(|c| !c.is_null()) {
        match cell.as_datetime() {
            Some(t) => times.push(t),
            None => {
                error!(
                    "Cannot read {:?} in column `{}` of {} as a timestamp",
                    cell,
                    time_column,
                    handle.source().display()
                );
                return Verdict::Undefined;
            }
        }
    }

    let steps: Vec<f64> = times
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds() as f64)
        .collect();
    if steps.is_empty() {
        return Verdict::Undefined;
    }
    let mean = steps.iter().sum::<f64>() / steps.len() as f64;
    let verdict = Verdict::from_bool(all_close(&steps, mean));

    info!(
        "Time column consistency of {}: {}",
        handle.source().display(),
        verdict
    );
    verdict
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use std::{
        io::Write,
        sync::{Arc, Mutex},
    };

    use tracing_subscriber::fmt::MakeWriter;

    use super::*;
    use crate::dataset::{Cell, Variable};

    #[test]
    fn should_summarise_table_shape() {
        let handle = table(vec![
            Variable::cells("station", vec![text("a"), text("b"), Cell::Null]),
            Variable::cells("rain", vec![Cell::Integer(1), Cell::Null, Cell::Float(0.5)]),
        ]);

        let summary = analyze_table(&handle, "time");

        assert_eq!(summary.row_count, Some(3));
        assert_eq!(summary.column_count, Some(2));
        assert_eq!(summary.missing_cells, Some(2));
        assert_eq!(summary.mixed_type_columns, Some(BTreeMap::new()));
        assert_eq!(summary.time_consistency, Verdict::Undefined);
    }

    #[test]
    fn should_report_mixed_type_columns() {
        let handle = table(vec![
            Variable::cells("temp", vec![Cell::Float(1.5), text("error"), Cell::Integer(2)]),
            Variable::cells("count", vec![Cell::Integer(1), Cell::Float(2.5)]),
        ]);

        let mixed = mixed_type_columns(&handle);

        assert_eq!(mixed.len(), 1);
        assert_eq!(
            mixed.get("temp"),
            Some(&vec![CellType::Integer, CellType::Float, CellType::Text])
        );
    }

    #[test]
    fn should_accept_evenly_spaced_time_column() {
        let handle = table(vec![Variable::cells(
            "time",
            vec![
                text("2020-01-01 00:00:00"),
                text("2020-01-01 06:00:00"),
                text("2020-01-01 12:00:00"),
            ],
        )]);

        assert_eq!(time_column_consistency(&handle, "time"), Verdict::Consistent);
    }

    #[test]
    fn should_flag_uneven_time_column() {
        let handle = table(vec![Variable::cells(
            "date",
            vec![text("2020-01-01"), text("2020-01-02"), text("2020-01-04")],
        )]);

        assert_eq!(time_column_consistency(&handle, "date"), Verdict::Inconsistent);
    }

    #[test]
    fn should_be_undefined_for_unparseable_time_column() {
        let handle = table(vec![Variable::cells(
            "time",
            vec![text("2020-01-01"), text("yesterday")],
        )]);

        assert_eq!(time_column_consistency(&handle, "time"), Verdict::Undefined);
        assert_eq!(time_column_consistency(&handle, "missing"), Verdict::Undefined);
    }

    #[test]
    fn should_warn_when_time_column_is_absent() {
        let handle = table(vec![Variable::cells("rain", vec![Cell::Float(1.0)])]);
        let logs = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let verdict = tracing::subscriber::with_default(subscriber, || {
            time_column_consistency(&handle, "time")
        });

        assert_eq!(verdict, Verdict::Undefined);
        let output = logs.contents();
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains("No `time` column in obs.csv"), "{output}");
    }

    #[test]
    fn should_leave_gridded_summary_undefined() {
        let handle = DatasetHandle::new("grid.nc", DatasetKind::Gridded);

        assert_eq!(analyze_table(&handle, "time"), TableSummary::default());
    }

    fn table(columns: Vec<Variable>) -> DatasetHandle {
        columns
            .into_iter()
            .fold(DatasetHandle::new("obs.csv", DatasetKind::Tabular), |h, c| {
                h.with_variable(c)
            })
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }
}
