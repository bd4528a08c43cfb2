//! Observation loading from per-city CSV files.

use std::fs::File;
use std::io::Read;

use serde::Deserialize;

use crate::config::DataSource;
use crate::error::DataError;
use crate::safety::Observation;

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(default)]
    city: Option<String>,
    area_name: String,
    lighting_quality_score: f64,
    uptime_ratio: f64,
}

/// Reads every configured source in order and concatenates the rows.
pub fn load_observations(sources: &[DataSource]) -> Result<Vec<Observation>, DataError> {
    let mut all = Vec::new();
    for source in sources {
        let file = File::open(&source.path).map_err(|source_err| DataError::Io {
            path: source.path.display().to_string(),
            source: source_err,
        })?;
        let rows = read_observations(file, source.city.as_deref())?;
        log::info!(
            "Loaded {} observations from {}",
            rows.len(),
            source.path.display()
        );
        all.extend(rows);
    }
    log::info!("{} observations across {} sources", all.len(), sources.len());
    Ok(all)
}

/// Parses observations from CSV. `city` overrides any `city` column.
///
/// Rows that fail to parse, lack a city, or carry non-finite numbers are
/// skipped with a warning.
pub fn read_observations<R: Read>(
    reader: R,
    city: Option<&str>,
) -> Result<Vec<Observation>, DataError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut observations = Vec::new();

    for (line, result) in rdr.deserialize::<Record>().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                log::warn!("Skipping row {}: {e}", line + 1);
                continue;
            }
        };

        let Some(city) = city.map(str::to_string).or(record.city) else {
            log::warn!("Skipping row {}: no city", line + 1);
            continue;
        };

        if !record.lighting_quality_score.is_finite() || !record.uptime_ratio.is_finite() {
            log::warn!("Skipping row {}: non-finite value", line + 1);
            continue;
        }

        observations.push(Observation {
            city,
            area_name: record.area_name,
            lighting_quality_score: record.lighting_quality_score,
            uptime_ratio: record.uptime_ratio,
        });
    }

    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_source_city() {
        let csv = "area_name,lighting_quality_score,uptime_ratio,reported_at\n\
                   Saket,8,0.95,2024-01-02\n\
                   Dwarka, 6 ,0.99,2024-01-03\n";
        let rows = read_observations(csv.as_bytes(), Some("Delhi")).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.city == "Delhi"));
        assert_eq!(rows[1].area_name, "Dwarka");
        assert_eq!(rows[1].lighting_quality_score, 6.0);
    }

    #[test]
    fn reads_city_column() {
        let csv = "city,area_name,lighting_quality_score,uptime_ratio\n\
                   Kochi,Fort Kochi,7,0.9\n\
                   Mumbai,Bandra,5,0.5\n";
        let rows = read_observations(csv.as_bytes(), None).unwrap();
        assert_eq!(rows[0].city, "Kochi");
        assert_eq!(rows[1].city, "Mumbai");
    }

    #[test]
    fn skips_bad_rows() {
        let csv = "area_name,lighting_quality_score,uptime_ratio\n\
                   Saket,eight,0.95\n\
                   Dwarka,NaN,0.99\n\
                   Karol Bagh,3,0.8\n";
        let rows = read_observations(csv.as_bytes(), Some("Delhi")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].area_name, "Karol Bagh");

        let rows = read_observations(csv.as_bytes(), None).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn empty_file_is_not_an_error() {
        let rows = read_observations("".as_bytes(), Some("Delhi")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let sources = [DataSource {
            path: "does/not/exist.csv".into(),
            city: Some("Delhi".into()),
        }];
        assert!(matches!(
            load_observations(&sources),
            Err(DataError::Io { .. })
        ));
    }
}
