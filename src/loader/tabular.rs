//! Decoders for delimited text, Excel, JSON and Parquet tables.
//!
//! Every decoder ends in the same place: an ordered list of named columns of
//! [`Cell`]s, turned into a tabular [`DatasetHandle`].

use std::{
    fs::File,
    io::{BufRead, BufReader, Seek},
    path::Path,
    sync::Arc,
};

use arrow::{
    array::{Array, ArrayRef, AsArray},
    compute::cast,
    csv::{reader::Format as CsvFormat, ReaderBuilder},
    datatypes::{DataType, Field, Float64Type, Int64Type, Schema, TimeUnit, TimestampMillisecondType},
    error::ArrowError,
};
use calamine::{open_workbook_auto, Data, Reader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::{Map, Value};

use super::{extension_of, LoadOptions};
use crate::{
    dataset::{cell::parse_datetime, Cell, DatasetHandle, DatasetKind, NullMarkers, Variable},
    error::LoadError,
};

/// Named columns in file order.
#[derive(Debug, Default)]
struct Columns {
    names: Vec<String>,
    cells: Vec<Vec<Cell>>,
}

impl Columns {
    fn with_names(names: Vec<String>) -> Self {
        let cells = names.iter().map(|_| Vec::new()).collect();
        Columns { names, cells }
    }

    /// Index of `name`, adding an empty column padded to `rows` if new.
    fn index_or_insert(&mut self, name: &str, rows: usize) -> usize {
        match self.names.iter().position(|n| n == name) {
            Some(i) => i,
            None => {
                self.names.push(name.to_string());
                self.cells.push(vec![Cell::Null; rows]);
                self.names.len() - 1
            }
        }
    }

    fn into_handle(self, path: &Path) -> DatasetHandle {
        self.names.into_iter().zip(self.cells).fold(
            DatasetHandle::new(path, DatasetKind::Tabular),
            |handle, (name, cells)| handle.with_variable(Variable::cells(name, cells)),
        )
    }
}

/// Reads a delimited text file with a header row. Every field is read as
/// text first, then typed cell by cell.
pub fn read_delimited(
    path: &Path,
    delimiter: u8,
    options: &LoadOptions,
) -> Result<DatasetHandle, LoadError> {
    let extension = if delimiter == b'\t' { "tsv" } else { "csv" };
    let decode = |e: ArrowError| LoadError::decode(path, extension, e);

    let mut file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = CsvFormat::default()
        .with_header(true)
        .with_delimiter(delimiter);
    let (inferred, _) = format.infer_schema(&mut file, Some(0)).map_err(decode)?;
    file.rewind().map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let fields: Vec<Field> = inferred
        .fields()
        .iter()
        .map(|f| Field::new(f.name(), DataType::Utf8, true))
        .collect();
    let names = fields.iter().map(|f| f.name().clone()).collect();
    let reader = ReaderBuilder::new(Arc::new(Schema::new(fields)))
        .with_format(format)
        .build(file)
        .map_err(decode)?;

    let mut columns = Columns::with_names(names);
    for batch in reader {
        let batch = batch.map_err(decode)?;
        for (i, array) in batch.columns().iter().enumerate() {
            let strings = array.as_string::<i32>();
            columns.cells[i].extend(strings.iter().map(|value| match value {
                Some(text) => Cell::infer(text, &options.null_markers),
                None => Cell::Null,
            }));
        }
    }

    Ok(columns.into_handle(path))
}

/// Reads the first sheet of a workbook; its first row names the columns.
pub fn read_excel(path: &Path, options: &LoadOptions) -> Result<DatasetHandle, LoadError> {
    let extension = extension_of(path);
    let mut workbook =
        open_workbook_auto(path).map_err(|e| LoadError::decode(path, &extension, e))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| LoadError::decode(path, &extension, "workbook has no sheets"))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| LoadError::decode(path, &extension, e))?;

    let mut rows = range.rows();
    let names: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .enumerate()
            .map(|(i, data)| match data {
                Data::Empty => format!("Unnamed: {}", i),
                other => other.to_string(),
            })
            .collect(),
        None => Vec::new(),
    };

    let mut columns = Columns::with_names(names);
    for row in rows {
        for (i, column) in columns.cells.iter_mut().enumerate() {
            column.push(row.get(i).map_or(Cell::Null, |d| excel_cell(d, &options.null_markers)));
        }
    }

    Ok(columns.into_handle(path))
}

fn excel_cell(data: &Data, nulls: &NullMarkers) -> Cell {
    match data {
        Data::Int(i) => Cell::Integer(*i),
        Data::Float(f) => Cell::float(*f),
        Data::Bool(b) => Cell::Boolean(*b),
        Data::String(s) => Cell::infer(s, nulls),
        Data::DateTime(dt) => dt.as_datetime().map_or(Cell::Null, Cell::DateTime),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::infer(s, nulls),
        _ => Cell::Null,
    }
}

/// Reads JSON records: one object per line, or a single array of objects.
///
/// Keys missing from a record are null, as are strings matching a null
/// marker. Columns appear in first-seen order.
pub fn read_json(path: &Path, options: &LoadOptions) -> Result<DatasetHandle, LoadError> {
    let io = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let decode = |e: serde_json::Error| LoadError::decode(path, "json", e);

    let mut reader = BufReader::new(File::open(path).map_err(io)?);
    let records: Vec<Map<String, Value>> = if starts_with_array(&mut reader).map_err(io)? {
        serde_json::from_reader(reader).map_err(decode)?
    } else {
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(io)?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line).map_err(decode)?);
        }
        records
    };

    let mut columns = Columns::default();
    for (row, record) in records.iter().enumerate() {
        for (key, value) in record {
            let i = columns.index_or_insert(key, row);
            columns.cells[i].push(json_cell(value, &options.null_markers));
        }
        for column in columns.cells.iter_mut() {
            if column.len() == row {
                column.push(Cell::Null);
            }
        }
    }

    Ok(columns.into_handle(path))
}

fn starts_with_array(reader: &mut BufReader<File>) -> std::io::Result<bool> {
    let buffer = reader.fill_buf()?;
    Ok(buffer
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'['))
}

fn json_cell(value: &Value, nulls: &NullMarkers) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::String(s) if nulls.is_null(s) => Cell::Null,
        Value::Bool(b) => Cell::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Cell::Integer(i),
            None => n.as_f64().map_or(Cell::Null, Cell::float),
        },
        Value::String(s) => match parse_datetime(s) {
            Some(dt) => Cell::DateTime(dt),
            None => Cell::Text(s.clone()),
        },
        other => Cell::Text(other.to_string()),
    }
}

pub fn read_parquet(path: &Path, options: &LoadOptions) -> Result<DatasetHandle, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| LoadError::decode(path, "parquet", e))?;
    let names = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder
        .build()
        .map_err(|e| LoadError::decode(path, "parquet", e))?;

    let mut columns = Columns::with_names(names);
    for batch in reader {
        let batch = batch.map_err(|e| LoadError::decode(path, "parquet", e))?;
        for (i, array) in batch.columns().iter().enumerate() {
            let cells = arrow_cells(array, &options.null_markers)
                .map_err(|e| LoadError::decode(path, "parquet", e))?;
            columns.cells[i].extend(cells);
        }
    }

    Ok(columns.into_handle(path))
}

/// Converts an Arrow column to cells by its logical type. Text matching a
/// null marker is null.
fn arrow_cells(array: &ArrayRef, nulls: &NullMarkers) -> Result<Vec<Cell>, ArrowError> {
    let cells = match array.data_type() {
        DataType::Null => vec![Cell::Null; array.len()],
        DataType::Boolean => array
            .as_boolean()
            .iter()
            .map(|v| v.map_or(Cell::Null, Cell::Boolean))
            .collect(),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => cast(array, &DataType::Int64)?
            .as_primitive::<Int64Type>()
            .iter()
            .map(|v| v.map_or(Cell::Null, Cell::Integer))
            .collect(),
        DataType::UInt64 | DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            cast(array, &DataType::Float64)?
                .as_primitive::<Float64Type>()
                .iter()
                .map(|v| v.map_or(Cell::Null, Cell::float))
                .collect()
        }
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
            let millis = cast(array, &DataType::Timestamp(TimeUnit::Millisecond, None))?;
            let millis = millis.as_primitive::<TimestampMillisecondType>();
            (0..millis.len())
                .map(|i| {
                    if millis.is_null(i) {
                        Cell::Null
                    } else {
                        millis.value_as_datetime(i).map_or(Cell::Null, Cell::DateTime)
                    }
                })
                .collect()
        }
        _ => cast(array, &DataType::Utf8)?
            .as_string::<i32>()
            .iter()
            .map(|v| match v {
                Some(s) if !nulls.is_null(s) => Cell::Text(s.to_string()),
                _ => Cell::Null,
            })
            .collect(),
    };
    Ok(cells)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use std::io::Write;

    use arrow::{
        array::{Float64Array, Int32Array, StringArray},
        record_batch::RecordBatch,
    };
    use parquet::arrow::ArrowWriter;

    use super::*;
    use crate::dataset::{CellType, Values};

    #[test]
    fn should_read_csv_with_null_markers() {
        let file = write_temp(
            ".csv",
            "time,station,temp\n\
             2020-01-01,A,1.5\n\
             2020-01-02,B,NA\n\
             2020-01-03,C,-999\n",
        );
        let options = LoadOptions {
            null_markers: NullMarkers::new(&["-999".to_string()]),
            ..Default::default()
        };

        let handle = read_delimited(file.path(), b',', &options).unwrap();

        assert_eq!(handle.kind(), DatasetKind::Tabular);
        assert_eq!(handle.variables().len(), 3);
        assert_eq!(handle.row_count(), 3);
        let temp = handle.variable("temp").unwrap();
        assert_eq!(
            temp.values,
            Values::Cells(vec![Cell::Float(1.5), Cell::Null, Cell::Null])
        );
        let time = handle.variable("time").unwrap();
        assert_eq!(time.cell_types().into_iter().collect::<Vec<_>>(), vec![CellType::DateTime]);
    }

    #[test]
    fn should_read_tab_delimited_file() {
        let file = write_temp(".tsv", "a\tb\n1\tx\n2\ty\n");

        let handle = read_delimited(file.path(), b'\t', &LoadOptions::default()).unwrap();

        assert_eq!(
            handle.variable("a").unwrap().values,
            Values::Cells(vec![Cell::Integer(1), Cell::Integer(2)])
        );
        assert_eq!(handle.variable("b").unwrap().dtype, "object");
    }

    #[test]
    fn should_read_json_lines_with_missing_keys() {
        let file = write_temp(
            ".json",
            "{\"station\": \"A\", \"rain\": 1.5}\n\n{\"station\": \"B\", \"snow\": 2}\n",
        );

        let handle = read_json(file.path(), &LoadOptions::default()).unwrap();

        assert_eq!(handle.row_count(), 2);
        assert_eq!(
            handle.variable("rain").unwrap().values,
            Values::Cells(vec![Cell::Float(1.5), Cell::Null])
        );
        assert_eq!(
            handle.variable("snow").unwrap().values,
            Values::Cells(vec![Cell::Null, Cell::Integer(2)])
        );
    }

    #[test]
    fn should_read_json_array() {
        let file = write_temp(".json", "  [{\"t\": \"2020-01-01\"}, {\"t\": null}]");

        let handle = read_json(file.path(), &LoadOptions::default()).unwrap();

        let t = handle.variable("t").unwrap();
        assert_eq!(t.null_count(), 1);
        assert!(t.cell_types().contains(&CellType::DateTime));
    }

    #[test]
    fn should_read_json_null_markers_as_missing() {
        let file = write_temp(
            ".json",
            "{\"rain\": 1.0}\n{\"rain\": \"NA\"}\n{\"rain\": \"-999\"}\n{\"rain\": 2.0}\n",
        );
        let options = LoadOptions {
            null_markers: NullMarkers::new(&["-999".to_string()]),
            ..Default::default()
        };

        let handle = read_json(file.path(), &options).unwrap();

        let rain = handle.variable("rain").unwrap();
        assert_eq!(
            rain.values,
            Values::Cells(vec![Cell::Float(1.0), Cell::Null, Cell::Null, Cell::Float(2.0)])
        );
        assert_eq!(rain.null_count(), 2);
        assert!(rain.numeric_values().is_some());
    }

    #[test]
    fn should_fail_on_malformed_json() {
        let file = write_temp(".json", "{\"a\": 1\n");

        let result = read_json(file.path(), &LoadOptions::default());

        assert!(matches!(result, Err(LoadError::Decode { .. })));
    }

    #[test]
    fn should_read_parquet_columns() {
        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("value", DataType::Float64, true),
            Field::new("name", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int32Array::from(vec![1, 2])),
                Arc::new(Float64Array::from(vec![Some(0.5), None])),
                Arc::new(StringArray::from(vec![Some("x"), None])),
            ],
        )
        .unwrap();
        let mut writer = ArrowWriter::try_new(File::create(file.path()).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let handle = read_parquet(file.path(), &LoadOptions::default()).unwrap();

        assert_eq!(
            handle.variable("id").unwrap().values,
            Values::Cells(vec![Cell::Integer(1), Cell::Integer(2)])
        );
        assert_eq!(handle.variable("value").unwrap().null_count(), 1);
        assert_eq!(handle.variable("name").unwrap().dtype, "object");
    }

    #[test]
    fn should_read_parquet_text_null_markers_as_missing() {
        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let schema = Arc::new(Schema::new(vec![Field::new("flag", DataType::Utf8, true)]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(StringArray::from(vec![
                Some("ok"),
                Some("NA"),
                Some("missing"),
                None,
            ]))],
        )
        .unwrap();
        let mut writer = ArrowWriter::try_new(File::create(file.path()).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        let options = LoadOptions {
            null_markers: NullMarkers::new(&["missing".to_string()]),
            ..Default::default()
        };

        let handle = read_parquet(file.path(), &options).unwrap();

        assert_eq!(
            handle.variable("flag").unwrap().values,
            Values::Cells(vec![
                Cell::Text("ok".to_string()),
                Cell::Null,
                Cell::Null,
                Cell::Null,
            ])
        );
    }

    #[test]
    fn should_fail_on_corrupt_parquet() {
        let file = write_temp(".parquet", "definitely not parquet");

        let result = read_parquet(file.path(), &LoadOptions::default());

        assert!(matches!(result, Err(LoadError::Decode { .. })));
    }

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }
}
