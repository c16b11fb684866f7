use std::io::Read;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use ledger_core::{LedgerRepository, NewTaxSlab, RepositoryError};

/// Errors that can occur when loading a slab schedule.
#[derive(Debug, Error, PartialEq)]
pub enum SlabLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for SlabLoaderError {
    fn from(err: csv::Error) -> Self {
        SlabLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from the slab schedule CSV file.
///
/// Columns:
/// - `min_amount`: lower bound of the slab (inclusive)
/// - `max_amount`: upper bound of the slab (empty for unbounded)
/// - `tax_rate`: marginal rate as a decimal fraction (e.g., 0.05 for 5%)
/// - `description`: optional human-readable label
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SlabRecord {
    pub min_amount: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub max_amount: Option<Decimal>,
    pub tax_rate: Decimal,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub description: Option<String>,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.trim().is_empty()))
}

/// Loader for slab schedule data from CSV files.
///
/// Works through the [`LedgerRepository`] trait, so it supports any database
/// backend.  A load replaces the entire configured schedule: the evaluator
/// treats the slab table as one unit, so partial updates are never meaningful.
pub struct SlabScheduleLoader;

impl SlabScheduleLoader {
    /// Parse slab records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<SlabRecord>, SlabLoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: SlabRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Check that the records form a well-formed marginal schedule:
    /// it starts at zero, each bounded slab ends above where it starts,
    /// consecutive slabs tile without gap or overlap, only the final slab
    /// may be unbounded, and no rate is negative.
    pub fn validate(records: &[SlabRecord]) -> Result<(), SlabLoaderError> {
        if records.is_empty() {
            return Err(SlabLoaderError::InvalidSchedule(
                "schedule is empty".to_string(),
            ));
        }

        let mut sorted: Vec<&SlabRecord> = records.iter().collect();
        sorted.sort_by(|a, b| a.min_amount.cmp(&b.min_amount));

        if sorted[0].min_amount != Decimal::ZERO {
            return Err(SlabLoaderError::InvalidSchedule(format!(
                "first slab must start at 0, found {}",
                sorted[0].min_amount
            )));
        }

        for (i, record) in sorted.iter().enumerate() {
            if record.tax_rate < Decimal::ZERO {
                return Err(SlabLoaderError::InvalidSchedule(format!(
                    "negative tax rate {} in slab starting at {}",
                    record.tax_rate, record.min_amount
                )));
            }

            match record.max_amount {
                Some(max) if max <= record.min_amount => {
                    return Err(SlabLoaderError::InvalidSchedule(format!(
                        "slab [{}, {}) is empty or inverted",
                        record.min_amount, max
                    )));
                }
                Some(max) => {
                    if let Some(next) = sorted.get(i + 1) {
                        if next.min_amount != max {
                            return Err(SlabLoaderError::InvalidSchedule(format!(
                                "slab ending at {} is not followed by one starting there \
                                 (next starts at {})",
                                max, next.min_amount
                            )));
                        }
                    }
                }
                None if i + 1 < sorted.len() => {
                    return Err(SlabLoaderError::InvalidSchedule(format!(
                        "unbounded slab starting at {} is not the last slab",
                        record.min_amount
                    )));
                }
                None => {}
            }
        }

        Ok(())
    }

    /// Validate and load a slab schedule, replacing whatever is configured.
    ///
    /// Returns the number of slabs inserted.  Loading the same file twice
    /// yields the same final state.
    pub async fn load<R: LedgerRepository + ?Sized>(
        repo: &R,
        records: &[SlabRecord],
    ) -> Result<usize, SlabLoaderError> {
        Self::validate(records)?;

        repo.delete_tax_slabs().await?;

        let mut inserted = 0;
        for record in records {
            repo.insert_tax_slab(NewTaxSlab {
                min_amount: record.min_amount,
                max_amount: record.max_amount,
                tax_rate: record.tax_rate,
                description: record.description.clone(),
            })
            .await?;
            inserted += 1;
        }

        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const TEST_CSV: &str = r#"min_amount,max_amount,tax_rate,description
0,100000,0.05,Base slab
100000,500000,0.10,Middle slab
500000,,0.15,Top slab
"#;

    #[test]
    fn parses_a_single_record() {
        let csv = "min_amount,max_amount,tax_rate,description\n0,100000,0.05,Base slab";

        let records = SlabScheduleLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0],
            SlabRecord {
                min_amount: dec!(0),
                max_amount: Some(dec!(100000)),
                tax_rate: dec!(0.05),
                description: Some("Base slab".to_string()),
            }
        );
    }

    #[test]
    fn empty_max_amount_means_unbounded() {
        let csv = "min_amount,max_amount,tax_rate,description\n500000,,0.15,";

        let records = SlabScheduleLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(records[0].max_amount, None);
        assert_eq!(records[0].description, None);
    }

    #[test]
    fn parses_the_full_default_schedule() {
        let records = SlabScheduleLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].tax_rate, dec!(0.05));
        assert_eq!(records[1].tax_rate, dec!(0.10));
        assert_eq!(records[2].tax_rate, dec!(0.15));
        assert_eq!(records[2].max_amount, None);
    }

    #[test]
    fn missing_column_is_a_parse_error() {
        let csv = "min_amount,max_amount\n0,100000";

        let err = SlabScheduleLoader::parse(csv.as_bytes())
            .expect_err("Should fail for missing column");
        let SlabLoaderError::CsvParse(msg) = err else {
            panic!("Expected CsvParse error, got: {:?}", err);
        };
        assert!(
            msg.contains("missing field"),
            "Expected 'missing field' in error, got: {}",
            msg
        );
    }

    #[test]
    fn bad_decimal_is_a_parse_error() {
        let csv = "min_amount,max_amount,tax_rate,description\nabc,100000,0.05,x";

        let result = SlabScheduleLoader::parse(csv.as_bytes());

        assert!(matches!(result, Err(SlabLoaderError::CsvParse(_))));
    }

    #[test]
    fn validate_accepts_the_default_schedule() {
        let records = SlabScheduleLoader::parse(TEST_CSV.as_bytes()).unwrap();

        assert_eq!(SlabScheduleLoader::validate(&records), Ok(()));
    }

    #[test]
    fn validate_rejects_an_empty_schedule() {
        assert!(matches!(
            SlabScheduleLoader::validate(&[]),
            Err(SlabLoaderError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn validate_rejects_a_schedule_not_starting_at_zero() {
        let records = vec![SlabRecord {
            min_amount: dec!(1000),
            max_amount: None,
            tax_rate: dec!(0.10),
            description: None,
        }];

        let err = SlabScheduleLoader::validate(&records).unwrap_err();
        let SlabLoaderError::InvalidSchedule(msg) = err else {
            panic!("Expected InvalidSchedule, got: {:?}", err);
        };
        assert!(msg.contains("start at 0"));
    }

    #[test]
    fn validate_rejects_a_gap_between_slabs() {
        let records = vec![
            SlabRecord {
                min_amount: dec!(0),
                max_amount: Some(dec!(100000)),
                tax_rate: dec!(0.05),
                description: None,
            },
            SlabRecord {
                min_amount: dec!(200000),
                max_amount: None,
                tax_rate: dec!(0.15),
                description: None,
            },
        ];

        assert!(matches!(
            SlabScheduleLoader::validate(&records),
            Err(SlabLoaderError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn validate_rejects_an_inverted_slab() {
        let records = vec![SlabRecord {
            min_amount: dec!(0),
            max_amount: Some(dec!(0)),
            tax_rate: dec!(0.05),
            description: None,
        }];

        assert!(matches!(
            SlabScheduleLoader::validate(&records),
            Err(SlabLoaderError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn validate_rejects_an_unbounded_slab_in_the_middle() {
        let records = vec![
            SlabRecord {
                min_amount: dec!(0),
                max_amount: None,
                tax_rate: dec!(0.05),
                description: None,
            },
            SlabRecord {
                min_amount: dec!(100000),
                max_amount: None,
                tax_rate: dec!(0.15),
                description: None,
            },
        ];

        let err = SlabScheduleLoader::validate(&records).unwrap_err();
        let SlabLoaderError::InvalidSchedule(msg) = err else {
            panic!("Expected InvalidSchedule, got: {:?}", err);
        };
        assert!(msg.contains("not the last slab"));
    }

    #[test]
    fn validate_rejects_a_negative_rate() {
        let records = vec![SlabRecord {
            min_amount: dec!(0),
            max_amount: None,
            tax_rate: dec!(-0.05),
            description: None,
        }];

        assert!(matches!(
            SlabScheduleLoader::validate(&records),
            Err(SlabLoaderError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn validate_accepts_records_given_out_of_order() {
        let mut records = SlabScheduleLoader::parse(TEST_CSV.as_bytes()).unwrap();
        records.reverse();

        assert_eq!(SlabScheduleLoader::validate(&records), Ok(()));
    }
}
