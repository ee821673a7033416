use serde::Serialize;

/// Delimiter used for all input, output and backup files. Listing names and
/// about-texts can contain commas, so the site exports were settled on `*`.
pub const DELIMITER: u8 = b'*';

/// One listing card harvested from the search results page.
#[derive(Debug, Clone, Serialize)]
pub struct ListingRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Link")]
    pub link: String,
    #[serde(rename = "Country")]
    pub country: String,
}

/// One fully processed row of the enricher: the input row's identity columns
/// plus the fields scraped from the detail page. Fields default to empty when
/// the page doesn't carry them.
#[derive(Debug, Clone, Default)]
pub struct EnrichedRecord {
    pub name: String,
    pub link: String,
    pub country_1: String,
    pub country_2: String,
    pub index: String,
    pub about: String,
    pub headquarters: String,
    pub website: String,
    pub email: String,
    pub phone: String,
}

/// Header names for the two country columns of the enriched output. The first
/// is abbreviated to the country's initials, the second carries the configured
/// name verbatim.
#[derive(Debug, Clone)]
pub struct EnrichedColumns {
    pub country_1: String,
    pub country_2: String,
}

impl EnrichedColumns {
    pub fn derive(country_1: &str, country_2: &str) -> Self {
        EnrichedColumns {
            country_1: format!("Country_{}", country_code(country_1)),
            country_2: format!("Country_{}", country_2),
        }
    }
}

/// Initials of a country name split on whitespace: "United States" -> "US".
pub fn country_code(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_code_takes_initials() {
        assert_eq!(country_code("United States"), "US");
        assert_eq!(country_code("United Arab Emirates"), "UAE");
    }

    #[test]
    fn country_code_single_word() {
        assert_eq!(country_code("Germany"), "G");
    }

    #[test]
    fn country_code_ignores_extra_whitespace() {
        assert_eq!(country_code("  New   Zealand "), "NZ");
        assert_eq!(country_code(""), "");
    }

    #[test]
    fn enriched_columns_use_code_and_verbatim_name() {
        let columns = EnrichedColumns::derive("United States", "Canada");
        assert_eq!(columns.country_1, "Country_US");
        assert_eq!(columns.country_2, "Country_Canada");
    }
}
