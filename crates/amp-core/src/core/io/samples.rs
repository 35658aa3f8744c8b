use super::traits::{CsvError, CsvFile};
use crate::core::models::sample::Sample;
use std::io::{Read, Write};

/// The engine's samples file: a `species,longitude,latitude` header followed by one row per
/// occurrence.
pub struct SampleCsv;

impl CsvFile for SampleCsv {
    type Output = Vec<Sample>;
    type Input = [Sample];

    fn read_from(reader: impl Read) -> Result<Self::Output, CsvError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut samples = Vec::new();
        for result in reader.records() {
            let record = result.map_err(CsvError::csv)?;
            let line = record.position().map_or(0, |p| p.line());
            if record.len() != 3 {
                return Err(CsvError::malformed(
                    line,
                    format!("expected 3 columns, found {}", record.len()),
                ));
            }
            let sample: Sample = record.deserialize(None).map_err(CsvError::csv)?;
            samples.push(sample);
        }
        Ok(samples)
    }

    fn write_to(table: &Self::Input, writer: impl Write) -> Result<(), CsvError> {
        let mut writer = csv::Writer::from_writer(writer);
        if table.is_empty() {
            writer
                .write_record(["species", "longitude", "latitude"])
                .map_err(CsvError::csv)?;
        }
        for sample in table {
            writer.serialize(sample).map_err(CsvError::csv)?;
        }
        writer.flush().map_err(CsvError::io)?;
        Ok(())
    }
}
