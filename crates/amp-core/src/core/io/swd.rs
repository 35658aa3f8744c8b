use super::traits::{CsvError, CsvFile};
use crate::core::models::sample::Sample;
use crate::core::models::swd::{SamplesWithData, SwdBuilder};
use std::io::{Read, Write};

const SAMPLE_COLUMNS: usize = 3;

/// The samples-with-data table: the sample columns followed by one covariate column per
/// layer. This is what the engine prints when extracting values, and what it accepts as a
/// pre-extracted samples file.
pub struct SwdCsv;

impl CsvFile for SwdCsv {
    type Output = SamplesWithData;
    type Input = SamplesWithData;

    fn read_from(reader: impl Read) -> Result<Self::Output, CsvError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers().map_err(CsvError::csv)?.clone();
        if headers.is_empty() {
            return Ok(SamplesWithData::empty());
        }
        if headers.len() < SAMPLE_COLUMNS {
            return Err(CsvError::malformed(
                1,
                format!(
                    "header has {} columns, expected at least {}",
                    headers.len(),
                    SAMPLE_COLUMNS
                ),
            ));
        }

        let mut builder = SwdBuilder::new().layers(headers.iter().skip(SAMPLE_COLUMNS));
        for result in reader.records() {
            let record = result.map_err(CsvError::csv)?;
            let line = record.position().map_or(0, |p| p.line());

            let sample = Sample::new(
                &record[0],
                parse_number(&record[1], "longitude", line)?,
                parse_number(&record[2], "latitude", line)?,
            );
            let values = headers
                .iter()
                .zip(record.iter())
                .skip(SAMPLE_COLUMNS)
                .map(|(name, field)| parse_number(field, name, line))
                .collect::<Result<Vec<_>, _>>()?;

            builder
                .push(sample, values)
                .map_err(|e| CsvError::malformed(line, e.to_string()))?;
        }
        Ok(builder.build())
    }

    fn write_to(table: &Self::Input, writer: impl Write) -> Result<(), CsvError> {
        let mut writer = csv::Writer::from_writer(writer);

        let mut header = vec!["species", "longitude", "latitude"];
        header.extend(table.layer_names().iter().map(String::as_str));
        writer.write_record(&header).map_err(CsvError::csv)?;

        for record in table.records() {
            let mut row = vec![
                record.sample.species.clone(),
                record.sample.longitude.to_string(),
                record.sample.latitude.to_string(),
            ];
            row.extend(record.values.iter().map(f64::to_string));
            writer.write_record(&row).map_err(CsvError::csv)?;
        }
        writer.flush().map_err(CsvError::io)?;
        Ok(())
    }
}

fn parse_number(field: &str, column: &str, line: u64) -> Result<f64, CsvError> {
    field.parse::<f64>().map_err(|_| {
        CsvError::malformed(line, format!("column '{column}' is not a number: '{field}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const ENGINE_OUTPUT: &str = "\
species,longitude,latitude,bio1,bio12
Puma concolor,-122.25,37.87,14.5,820
Puma concolor,-119.5,36.1,-9999,410.5
";

    #[test]
    fn parses_engine_output_into_records() {
        let swd = SwdCsv::read_from(ENGINE_OUTPUT.as_bytes()).unwrap();

        assert_eq!(swd.layer_names(), ["bio1", "bio12"]);
        assert_eq!(swd.len(), 2);
        assert_eq!(
            swd.records()[0].sample,
            Sample::new("Puma concolor", -122.25, 37.87)
        );
        assert_eq!(swd.value(0, "bio12"), Some(820.0));
        assert_eq!(swd.value(1, "bio1"), Some(-9999.0));
    }

    #[test]
    fn empty_output_is_an_empty_table() {
        let swd = SwdCsv::read_from("".as_bytes()).unwrap();
        assert!(swd.is_empty());
    }

    #[test]
    fn header_only_output_has_layers_but_no_records() {
        let swd = SwdCsv::read_from("species,longitude,latitude,bio1\n".as_bytes()).unwrap();
        assert!(swd.is_empty());
        assert_eq!(swd.layer_names(), ["bio1"]);
    }

    #[test]
    fn non_numeric_covariate_is_malformed() {
        let input = "species,longitude,latitude,bio1\nsp,1,2,warm\n";
        match SwdCsv::read_from(input.as_bytes()) {
            Err(CsvError::Malformed { line, message, .. }) => {
                assert_eq!(line, 2);
                assert!(message.contains("bio1"));
            }
            other => panic!("expected a malformed record error, got {other:?}"),
        }
    }

    #[test]
    fn short_row_is_rejected() {
        let input = "species,longitude,latitude,bio1\nsp,1,2\n";
        assert!(matches!(
            SwdCsv::read_from(input.as_bytes()),
            Err(CsvError::Csv { .. })
        ));
    }

    #[test]
    fn truncated_header_is_malformed() {
        let input = "species,longitude\nsp,1\n";
        assert!(matches!(
            SwdCsv::read_from(input.as_bytes()),
            Err(CsvError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn written_table_parses_back_identically() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("swd.csv");
        let original = SwdCsv::read_from(ENGINE_OUTPUT.as_bytes()).unwrap();

        original.to_csv(&path).unwrap();
        let reread = SamplesWithData::from_csv(&path).unwrap();

        assert_eq!(reread, original);
    }
}
