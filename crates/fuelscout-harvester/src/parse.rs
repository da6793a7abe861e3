//! HTML extraction for the price source's listing and detail pages.
//!
//! The source renders listing items with class names containing
//! `StationListItem`, station links as `/station/{digits}` anchors, and
//! price badges with class names containing `Price`. Detail pages embed
//! coordinates as `"latitude": …` / `"longitude": …` in bootstrap JSON.
//! Everything here is best-effort: a listing that doesn't match simply
//! yields nothing.

use std::sync::OnceLock;

use regex::Regex;

use crate::source::{Listing, StationDetail};

fn station_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<a[^>]+href="[^"]*/station/(\d+)[^"]*"[^>]*>(.*?)</a>"#)
            .expect("valid regex")
    })
}

fn price_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)class="[^"]*Price[^"]*"[^>]*>([^<]+)<"#).expect("valid regex")
    })
}

fn latitude_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""latitude":\s*(-?[0-9.]+)"#).expect("valid regex"))
}

fn longitude_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""longitude":\s*(-?[0-9.]+)"#).expect("valid regex"))
}

fn address_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<(address[^>]*|[^>]+class="[^"]*Address[^"]*"[^>]*)>(.*?)</"#)
            .expect("valid regex")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid regex"))
}

/// Parse every station listing on a search results page, first-seen order,
/// deduplicated by station id within the page.
#[must_use]
pub fn parse_listings(html: &str) -> Vec<Listing> {
    let mut listings: Vec<Listing> = Vec::new();

    let anchors: Vec<(usize, usize, String, String)> = station_link_re()
        .captures_iter(html)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let id = cap.get(1)?.as_str().to_owned();
            let name = strip_tags(cap.get(2)?.as_str());
            if name.is_empty() {
                return None;
            }
            Some((whole.start(), whole.end(), id, name))
        })
        .collect();

    for (i, (_, end, id, name)) in anchors.iter().enumerate() {
        if listings.iter().any(|l| &l.id == id) {
            continue;
        }

        // The price badge sits between this anchor and the next listing's.
        let slice_end = anchors.get(i + 1).map_or(html.len(), |next| next.0);
        let slice = &html[*end..slice_end];
        let price_per_unit = price_re()
            .captures(slice)
            .and_then(|cap| parse_price(cap.get(1).map_or("", |m| m.as_str())));

        listings.push(Listing {
            id: id.clone(),
            name: name.clone(),
            price_per_unit,
        });
    }

    listings
}

/// Normalize a currency-formatted price string to a numeric per-unit value.
///
/// Strips non-numeric characters; values of 10 or more are cent-denominated
/// (the source renders e.g. `152.9¢/L`) and are divided by 100. Returns
/// `None` for empty, dashed-out, or unparsable price text.
#[must_use]
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value: f64 = cleaned.parse().ok()?;
    if value <= 0.0 {
        return None;
    }
    if value >= 10.0 {
        Some(value / 100.0)
    } else {
        Some(value)
    }
}

/// Extract coordinates and address from a station detail page.
#[must_use]
pub fn parse_detail(html: &str) -> StationDetail {
    let lat = latitude_re()
        .captures(html)
        .and_then(|cap| cap.get(1)?.as_str().parse::<f64>().ok());
    let lng = longitude_re()
        .captures(html)
        .and_then(|cap| cap.get(1)?.as_str().parse::<f64>().ok());
    let address = address_re()
        .captures(html)
        .map(|cap| strip_tags(cap.get(2).map_or("", |m| m.as_str())))
        .filter(|a| !a.is_empty());

    StationDetail { lat, lng, address }
}

fn strip_tags(fragment: &str) -> String {
    let text = tag_re().replace_all(fragment, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_HTML: &str = r#"
        <div class="GenericStationListItem__station">
          <a href="/station/12345">Shell <span>Oshawa</span></a>
          <span class="StationDisplayPrice__price">152.9</span>
        </div>
        <div class="GenericStationListItem__station">
          <a href="/station/67890">Esso</a>
          <span class="Price__display">--</span>
        </div>
        <div class="GenericStationListItem__station">
          <a href="/station/12345">Shell duplicate</a>
          <span class="StationDisplayPrice__price">150.0</span>
        </div>
    "#;

    #[test]
    fn parses_listing_ids_names_and_prices() {
        let listings = parse_listings(LISTING_HTML);
        assert_eq!(listings.len(), 2);

        assert_eq!(listings[0].id, "12345");
        assert_eq!(listings[0].name, "Shell Oshawa");
        assert_eq!(listings[0].price_per_unit, Some(1.529));

        assert_eq!(listings[1].id, "67890");
        assert_eq!(listings[1].name, "Esso");
        assert_eq!(listings[1].price_per_unit, None);
    }

    #[test]
    fn first_occurrence_wins_on_duplicate_ids() {
        let listings = parse_listings(LISTING_HTML);
        let shell = listings.iter().find(|l| l.id == "12345").unwrap();
        assert_eq!(shell.name, "Shell Oshawa");
    }

    #[test]
    fn empty_page_yields_no_listings() {
        assert!(parse_listings("<html><body>No results</body></html>").is_empty());
    }

    #[test]
    fn price_cents_are_divided() {
        assert_eq!(parse_price("152.9"), Some(1.529));
        assert_eq!(parse_price("$1.52"), Some(1.52));
        assert_eq!(parse_price("139.9¢/L"), Some(1.399));
    }

    #[test]
    fn price_garbage_is_none() {
        assert_eq!(parse_price("--"), None);
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("N/A"), None);
    }

    #[test]
    fn parses_detail_coordinates_and_address() {
        let html = r#"
            <script>window.__data = {"station": {"latitude": 43.8971, "longitude": -78.8658}}</script>
            <address class="StationAddress">123 King St E<br/>Oshawa, ON</address>
        "#;
        let detail = parse_detail(html);
        assert_eq!(detail.lat, Some(43.8971));
        assert_eq!(detail.lng, Some(-78.8658));
        assert_eq!(detail.address.as_deref(), Some("123 King St E Oshawa, ON"));
        assert!(detail.has_coordinates());
    }

    #[test]
    fn detail_without_coordinates() {
        let detail = parse_detail("<html><body>blocked</body></html>");
        assert!(!detail.has_coordinates());
        assert!(detail.address.is_none());
    }
}
