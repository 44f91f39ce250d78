//! GRIB2 messages through grib-rs.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs::File,
    io::BufReader,
    path::Path,
};

use chrono::{NaiveDate, NaiveDateTime};
use grib::{
    codetables::{CodeTable4_2, Lookup},
    Grib2SubmessageDecoder,
};
use tracing::{debug, warn};

use super::{extension_of, LoadOptions};
use crate::{
    dataset::{Coordinate, DatasetHandle, DatasetKind, Variable},
    error::LoadError,
};

/// Decodes every submessage. Submessages of one parameter form one variable;
/// distinct reference times form the time axis. The lat/lon axes come from
/// the grid of the first submessage that has one.
pub fn read(path: &Path, _options: &LoadOptions) -> Result<DatasetHandle, LoadError> {
    let extension = extension_of(path);
    let decode = |e: grib::GribError| LoadError::decode(path, &extension, e);

    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let grib2 = grib::from_reader(BufReader::new(file)).map_err(decode)?;

    let mut parameters: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut ref_times = BTreeSet::new();
    let mut axes: Option<(Vec<f64>, Vec<f64>)> = None;

    for (index, submessage) in grib2.iter() {
        let discipline = submessage.indicator().discipline;
        let name = match (
            submessage.prod_def().parameter_category(),
            submessage.prod_def().parameter_number(),
        ) {
            (Some(category), Some(number)) => CodeTable4_2::new(discipline, category)
                .lookup(usize::from(number))
                .to_string(),
            _ => format!("param_{}_{}", index.0, index.1),
        };

        let rt = submessage.identification().ref_time_unchecked();
        if let Some(time) = NaiveDate::from_ymd_opt(rt.year.into(), rt.month.into(), rt.day.into())
            .and_then(|d| d.and_hms_opt(rt.hour.into(), rt.minute.into(), rt.second.into()))
        {
            ref_times.insert(time);
        }

        if axes.is_none() {
            match grid_axes(&submessage) {
                Ok(found) => axes = found,
                Err(e) => warn!("No lat/lon grid for submessage {:?}: {}", index, e),
            }
        }

        let values = Grib2SubmessageDecoder::from(submessage)
            .and_then(|decoder| decoder.dispatch().map(|it| it.map(f64::from).collect::<Vec<_>>()))
            .map_err(decode)?;
        debug!(parameter = %name, len = values.len(), "decoded submessage");
        parameters.entry(name).or_default().extend(values);
    }

    let mut handle = DatasetHandle::new(path, DatasetKind::Gridded);
    if let Some((lat, lon)) = axes {
        handle = handle
            .with_coordinate("latitude", Coordinate::Numeric(lat))
            .with_coordinate("longitude", Coordinate::Numeric(lon));
    }
    if !ref_times.is_empty() {
        let times: Vec<NaiveDateTime> = ref_times.into_iter().collect();
        handle = handle.with_coordinate("time", Coordinate::Temporal(times));
    }
    for (name, values) in parameters {
        handle = handle.with_variable(Variable::numeric(name, values).with_dtype("float32"));
    }

    Ok(handle)
}

type Axes = Option<(Vec<f64>, Vec<f64>)>;

// Regular grids only: points run along longitude first.
fn grid_axes<R>(submessage: &grib::SubMessage<'_, R>) -> Result<Axes, grib::GribError> {
    let (ni, nj) = submessage.grid_shape()?;
    let points: Vec<(f32, f32)> = submessage.latlons()?.collect();
    if ni == 0 || points.len() != ni * nj {
        return Ok(None);
    }
    let lon = points[..ni].iter().map(|(_, lon)| f64::from(*lon)).collect();
    let lat = points.iter().step_by(ni).map(|(lat, _)| f64::from(*lat)).collect();
    Ok(Some((lat, lon)))
}
