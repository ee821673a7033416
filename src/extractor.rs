use scraper::{ElementRef, Html, Selector};

// Detail-page selectors. The section title carries the about-text as its
// direct text node; contact fields live in label/description item pairs.
const SECTION_TITLE_SELECTOR: &str = "p.slds-section__title.appx-section__title";
const CONTACT_ITEM_SELECTOR: &str = ".appx-extended-detail-subsection-label-description";
const CONTACT_LABEL_SELECTOR: &str = ".appx-extended-detail-subsection-label";
const CONTACT_VALUE_SELECTOR: &str = ".appx-extended-detail-subsection-description";

const ABOUT_PREFIX: &str = "About";
const MAILTO_PREFIX: &str = "mailto:";

/// Fields scraped from one detail page. Every field defaults to empty;
/// absence on the page is not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailFields {
    pub about: String,
    pub headquarters: String,
    pub website: String,
    pub email: String,
    pub phone: String,
}

/// Extract all detail fields from a page HTML snapshot.
pub fn extract_details(html: &str) -> DetailFields {
    let document = Html::parse_document(html);
    let mut fields = DetailFields {
        about: extract_about(&document),
        ..DetailFields::default()
    };
    extract_contacts(&document, &mut fields);
    fields
}

/// The about-text: the first section title whose direct (non-nested) text
/// starts with the prefix marker. The marker and its separator character are
/// dropped, as are stray `*` characters (the titles reuse the output
/// delimiter as decoration).
fn extract_about(document: &Html) -> String {
    let selector = Selector::parse(SECTION_TITLE_SELECTOR).unwrap();
    for title in document.select(&selector) {
        let Some(direct) = direct_text(title) else {
            continue;
        };
        let direct = direct.trim();
        if direct.starts_with(ABOUT_PREFIX) {
            return direct
                .chars()
                .skip(ABOUT_PREFIX.len() + 1)
                .collect::<String>()
                .trim()
                .replace('*', "");
        }
    }
    String::new()
}

fn extract_contacts(document: &Html, fields: &mut DetailFields) {
    let item_selector = Selector::parse(CONTACT_ITEM_SELECTOR).unwrap();
    let label_selector = Selector::parse(CONTACT_LABEL_SELECTOR).unwrap();
    let value_selector = Selector::parse(CONTACT_VALUE_SELECTOR).unwrap();
    let anchor_selector = Selector::parse("a").unwrap();

    for item in document.select(&item_selector) {
        // An item missing its label or value is skipped, never fatal.
        let Some(label_el) = item.select(&label_selector).next() else {
            continue;
        };
        let Some(value_el) = item.select(&value_selector).next() else {
            continue;
        };
        let label = rendered_text(label_el);

        if label.contains("Headquarters") {
            fields.headquarters = rendered_text(value_el);
        } else if label.contains("Website") {
            if let Some(href) = anchor_href(value_el, &anchor_selector) {
                fields.website = href;
            }
        } else if label.contains("Email") {
            if let Some(href) = anchor_href(value_el, &anchor_selector) {
                fields.email = href
                    .strip_prefix(MAILTO_PREFIX)
                    .unwrap_or(&href)
                    .to_string();
            }
        } else if label.contains("Phone") {
            fields.phone = rendered_text(value_el);
        }
    }
}

/// The element's first direct text node, ignoring text inside nested tags.
fn direct_text(element: ElementRef<'_>) -> Option<String> {
    element
        .children()
        .find_map(|child| child.value().as_text())
        .map(|text| text.to_string())
}

/// Whitespace-normalized text of an element and its descendants, close to
/// what a browser reports as the rendered text.
fn rendered_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn anchor_href(value_el: ElementRef<'_>, anchor_selector: &Selector) -> Option<String> {
    value_el
        .select(anchor_selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}
