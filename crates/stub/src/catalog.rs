//! Canned location, dealer, and product data

use pavlo_contract::{
    Comparison, LocalDealer, Location, LocationInfo, MainProduct, N8nScrapeResult, Product,
    ScrapeResult, Suggestion,
};
use serde_json::{json, Map, Value};

struct Country {
    code: &'static str,
    name: &'static str,
    region: &'static str,
    currency: &'static str,
    time_zone: &'static str,
    city: Option<&'static str>,
}

const COUNTRIES: &[Country] = &[
    Country {
        code: "US",
        name: "United States",
        region: "North America",
        currency: "$",
        time_zone: "America/New_York",
        city: None,
    },
    Country {
        code: "LT",
        name: "Lithuania",
        region: "Baltic",
        currency: "€",
        time_zone: "Europe/Vilnius",
        city: Some("Vilnius"),
    },
    Country {
        code: "LV",
        name: "Latvia",
        region: "Baltic",
        currency: "€",
        time_zone: "Europe/Riga",
        city: None,
    },
    Country {
        code: "GB",
        name: "United Kingdom",
        region: "Western Europe",
        currency: "£",
        time_zone: "Europe/London",
        city: None,
    },
];

/// (name, host, country, region, currency, priority)
const DEALERS: &[(&str, &str, &str, &str, &str, i64)] = &[
    ("amazon.com", "https://amazon.com", "United States", "North America", "$", 1),
    ("bestbuy.com", "https://bestbuy.com", "United States", "North America", "$", 2),
    ("walmart.com", "https://walmart.com", "United States", "North America", "$", 3),
    ("pigu.lt", "https://pigu.lt", "Lithuania", "Baltic", "€", 1),
    ("varle.lt", "https://varle.lt", "Lithuania", "Baltic", "€", 2),
    ("1a.lv", "https://1a.lv", "Latvia", "Baltic", "€", 1),
    ("argos.co.uk", "https://argos.co.uk", "United Kingdom", "Western Europe", "£", 1),
];

const MAX_DEALERS: usize = 5;

fn country(code: &str) -> &'static Country {
    let code = code.trim().to_ascii_uppercase();
    COUNTRIES
        .iter()
        .find(|c| c.code == code)
        .unwrap_or(&COUNTRIES[0])
}

pub fn supported_countries() -> Vec<Value> {
    COUNTRIES
        .iter()
        .map(|c| json!({"code": c.code, "name": c.name, "currency": c.currency}))
        .collect()
}

/// Location for a country code (unknown codes fall back to the US) and its
/// dealers, best priority first
pub fn location_info(country_code: Option<&str>) -> LocationInfo {
    let c = country(country_code.unwrap_or("US"));
    let mut dealers: Vec<LocalDealer> = DEALERS
        .iter()
        .filter(|d| d.2 == c.name || d.3 == c.region)
        .map(|&(name, url, country, region, currency, priority)| LocalDealer {
            name: name.to_string(),
            url: url.to_string(),
            country: country.to_string(),
            region: region.to_string(),
            search_url_pattern: format!("{url}/search?q={{query}}"),
            currency: currency.to_string(),
            priority,
        })
        .collect();
    dealers.sort_by_key(|d| d.priority);
    dealers.truncate(MAX_DEALERS);

    LocationInfo {
        location: Location {
            country: c.name.to_string(),
            country_code: c.code.to_string(),
            region: c.region.to_string(),
            currency: c.currency.to_string(),
            time_zone: c.time_zone.to_string(),
            city: c.city.map(String::from),
        },
        local_dealers: dealers,
    }
}

fn title_from(url: &url::Url) -> String {
    let slug = url
        .path_segments()
        .and_then(|mut s| s.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or("product");
    slug.replace(['-', '_'], " ")
}

fn image_url(url: &url::Url) -> String {
    let host = url.host_str().unwrap_or("localhost");
    format!("{}://{}/images/product.jpg", url.scheme(), host)
}

fn store_from(url: &url::Url) -> String {
    url.host_str()
        .unwrap_or("unknown")
        .trim_start_matches("www.")
        .to_string()
}

pub fn scrape(url: &url::Url, request_id: String, country_code: Option<&str>) -> ScrapeResult {
    let info = location_info(country_code);
    let title = title_from(url);
    let price = 199.99;

    let comparisons = info
        .local_dealers
        .iter()
        .take(2)
        .enumerate()
        .map(|(i, dealer)| {
            let their_price = price - 10.0 * (i as f64 + 1.0);
            let mut assessment = Map::new();
            assessment.insert("cheaper".to_string(), json!(their_price < price));
            assessment.insert("difference".to_string(), json!(price - their_price));
            Comparison {
                title: title.clone(),
                store: dealer.name.clone(),
                price: their_price,
                currency: dealer.currency.clone(),
                url: dealer.search_url_pattern.replace("{query}", &title.replace(' ', "+")),
                image: format!("{}/images/placeholder.jpg", dealer.url),
                condition: "new".to_string(),
                assessment,
            }
        })
        .collect();

    ScrapeResult {
        product: Product {
            title,
            price,
            currency: info.location.currency,
            url: url.to_string(),
            image: image_url(url),
            store: store_from(url),
        },
        comparisons,
        request_id,
    }
}

pub fn n8n_scrape(url: &url::Url) -> N8nScrapeResult {
    let title = title_from(url);
    let suggestions = location_info(None)
        .local_dealers
        .into_iter()
        .take(3)
        .enumerate()
        .map(|(i, dealer)| Suggestion {
            title: title.clone(),
            standard_price: format!("${}.99", 199 - 10 * i),
            discount_price: if i == 0 { String::new() } else { format!("${}.49", 189 - 10 * i) },
            site: dealer.name,
            link: dealer.search_url_pattern.replace("{query}", &title.replace(' ', "+")),
            image: format!("{}/images/placeholder.jpg", dealer.url),
        })
        .collect();

    N8nScrapeResult {
        main_product: MainProduct {
            title,
            price: "$199.99".to_string(),
            image: image_url(url),
            url: url.to_string(),
        },
        suggestions,
    }
}
