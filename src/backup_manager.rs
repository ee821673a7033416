use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::records::{EnrichedColumns, EnrichedRecord, ListingRecord, DELIMITER};

// Spreadsheet tools misread the files as Latin-1 without an explicit BOM.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Write the collector's full record set to `path`, replacing any previous
/// content. Used for the final output; the collector writes in one shot.
pub fn save_listings(path: &Path, records: &[ListingRecord]) -> Result<()> {
    let mut file = create_output(path)?;
    file.write_all(UTF8_BOM)
        .with_context(|| format!("could not write to {}", path.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(file);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!("Saved {} listings to {}", records.len(), path.display());
    Ok(())
}

/// Write the enricher's accumulated records to `path`, replacing any previous
/// content. Serves both the periodic/error backups and the final output; a
/// backup is always the whole accumulator, never a diff.
pub fn save_enriched(
    path: &Path,
    columns: &EnrichedColumns,
    records: &[EnrichedRecord],
) -> Result<()> {
    let mut file = create_output(path)?;
    file.write_all(UTF8_BOM)
        .with_context(|| format!("could not write to {}", path.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(file);
    writer.write_record([
        "Name",
        "Link",
        columns.country_1.as_str(),
        columns.country_2.as_str(),
        "Index",
        "About (Short Name)",
        "Headquarters",
        "Website",
        "Email",
        "Phone",
    ])?;
    for record in records {
        writer.write_record([
            record.name.as_str(),
            record.link.as_str(),
            record.country_1.as_str(),
            record.country_2.as_str(),
            record.index.as_str(),
            record.about.as_str(),
            record.headquarters.as_str(),
            record.website.as_str(),
            record.email.as_str(),
            record.phone.as_str(),
        ])?;
    }
    writer.flush()?;

    info!("Saved {} records to {}", records.len(), path.display());
    Ok(())
}

fn create_output(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("could not create output file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn listing(name: &str, link: &str) -> ListingRecord {
        ListingRecord {
            name: name.to_string(),
            link: link.to_string(),
            country: "United States".to_string(),
        }
    }

    #[test]
    fn listings_file_has_bom_header_and_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.csv");
        save_listings(&path, &[listing("Acme", "https://x.example/a")]).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Name*Link*Country"));
        assert_eq!(lines.next(), Some("Acme*https://x.example/a*United States"));
    }

    #[test]
    fn fields_containing_the_delimiter_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.csv");
        save_listings(&path, &[listing("Acme*Star", "https://x.example/a")]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"Acme*Star\""));
    }

    #[test]
    fn enriched_header_uses_derived_country_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enriched.csv");
        let columns = EnrichedColumns::derive("United States", "Canada");
        let record = EnrichedRecord {
            name: "Acme".to_string(),
            link: "https://x.example/a".to_string(),
            country_1: "United States".to_string(),
            index: "3".to_string(),
            about: "Great company".to_string(),
            ..EnrichedRecord::default()
        };
        save_enriched(&path, &columns, &[record]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let header = text.trim_start_matches('\u{feff}').lines().next().unwrap();
        assert_eq!(
            header,
            "Name*Link*Country_US*Country_Canada*Index*About (Short Name)*Headquarters*Website*Email*Phone"
        );
        assert!(text.contains("Acme*https://x.example/a*United States**3*Great company****"));
    }

    #[test]
    fn saving_overwrites_previous_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.csv");
        let columns = EnrichedColumns::derive("United States", "Canada");
        let one = EnrichedRecord {
            name: "One".to_string(),
            ..EnrichedRecord::default()
        };
        let two = EnrichedRecord {
            name: "Two".to_string(),
            ..EnrichedRecord::default()
        };

        save_enriched(&path, &columns, &[one.clone()]).unwrap();
        save_enriched(&path, &columns, &[one, two]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        // Header plus exactly the two accumulated records.
        assert_eq!(text.lines().count(), 3);
    }
}
