// src/services/csv_export.rs

use crate::{
    common::error::AppError,
    models::batch::{normalize_batch_id, validate_batch_id, BatchCsvRow, ProductionBatch},
};

/// Full-table dump: header row of field names, one row per record, UTF-8.
pub fn batches_to_csv(batches: Vec<ProductionBatch>) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    if batches.is_empty() {
        // serde only emits the header together with the first record
        writer.write_record(CSV_HEADER).map_err(internal)?;
    }
    for batch in batches {
        writer.serialize(BatchCsvRow::from(batch)).map_err(internal)?;
    }

    writer.into_inner().map_err(internal)
}

fn internal(e: impl std::fmt::Display) -> AppError {
    AppError::InternalServerError(anyhow::Error::msg(e.to_string()))
}

/// Parses a snapshot. Batch ids get the same canonical form and alphabet as
/// on create; one bad row rejects the whole file.
pub fn csv_to_rows(bytes: &[u8]) -> Result<Vec<BatchCsvRow>, AppError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(bytes);
    let mut rows = reader
        .deserialize::<BatchCsvRow>()
        .collect::<Result<Vec<_>, _>>()?;

    for (index, row) in rows.iter_mut().enumerate() {
        let batch_id = normalize_batch_id(&row.batch_id);
        validate_batch_id(&batch_id).map_err(|_| {
            AppError::InvalidBackup(format!("row {}: invalid batch id {:?}", index + 1, row.batch_id))
        })?;
        row.batch_id = batch_id;
    }
    Ok(rows)
}

const CSV_HEADER: [&str; 9] = [
    "batch_id",
    "production_date",
    "person_in_charge",
    "production_site",
    "variant",
    "warehouse_location",
    "expiry_date",
    "created_at",
    "updated_at",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(id: &str, variant: &str) -> ProductionBatch {
        ProductionBatch {
            id: 1,
            batch_id: id.into(),
            production_date: "2025-11-10".into(),
            person_in_charge: "Rina".into(),
            production_site: "Bandung".into(),
            variant: variant.into(),
            warehouse_location: "A-2".into(),
            expiry_date: "2026-05-09".into(),
            created_at: "2025-11-10 09:00:00".into(),
            updated_at: "2025-11-10 09:00:00".into(),
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let csv = batches_to_csv(vec![batch("B1", "Arabica, Gayo"), batch("B2", "Robusta")]).unwrap();
        let text = String::from_utf8(csv).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next(), Some(CSV_HEADER.join(",").as_str()));
        assert_eq!(
            lines.next(),
            Some("B1,2025-11-10,Rina,Bandung,\"Arabica, Gayo\",A-2,2026-05-09,2025-11-10 09:00:00,2025-11-10 09:00:00")
        );
        assert!(lines.next().unwrap().starts_with("B2,"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn empty_table_still_has_header() {
        let text = String::from_utf8(batches_to_csv(Vec::new()).unwrap()).unwrap();
        assert_eq!(text.trim_end(), CSV_HEADER.join(","));
        assert!(csv_to_rows(text.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn reads_back_what_it_writes() {
        let csv = batches_to_csv(vec![batch("B1", "Arabica, Gayo")]).unwrap();
        let rows = csv_to_rows(&csv).unwrap();
        assert_eq!(rows, vec![BatchCsvRow::from(batch("B1", "Arabica, Gayo"))]);
    }

    #[test]
    fn missing_columns_are_an_invalid_backup() {
        let err = csv_to_rows(b"batch_id,variant\nB1,Arabica\n").unwrap_err();
        assert!(matches!(err, AppError::InvalidBackup(_)));
    }

    #[test]
    fn unsafe_batch_ids_reject_the_snapshot() {
        for bad in ["../escaped", "b 1&x=y", ""] {
            let mut row = BatchCsvRow::from(batch("B1", "Arabica"));
            row.batch_id = bad.to_string();
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.serialize(&row).unwrap();
            let bytes = writer.into_inner().unwrap();

            let err = csv_to_rows(&bytes).unwrap_err();
            assert!(matches!(err, AppError::InvalidBackup(_)), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn batch_ids_are_upper_cased_on_read() {
        let csv = batches_to_csv(vec![batch("hc-01", "Arabica")]).unwrap();
        assert_eq!(csv_to_rows(&csv).unwrap()[0].batch_id, "HC-01");
    }

    #[test]
    fn empty_input_is_zero_rows() {
        assert!(csv_to_rows(b"").unwrap().is_empty());
    }
}
