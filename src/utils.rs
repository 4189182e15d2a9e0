use std::collections::HashSet;

use actix_web::HttpRequest;

/// Best-effort client address: first entry of `X-Forwarded-For`, else
/// `X-Real-IP`, else loopback. Spoofable, which is acceptable for the
/// fingerprint and the advisory rate limiter built on top of it.
pub fn client_address(request: &HttpRequest) -> String {
    if let Some(forwarded) = header_str(request, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = header_str(request, "x-real-ip") {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    "127.0.0.1".to_string()
}

pub fn user_agent(request: &HttpRequest) -> String {
    header_str(request, "user-agent").unwrap_or("").to_string()
}

fn header_str<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
    request.headers().get(name)?.to_str().ok()
}

/// Splits a pasted code list on commas and newlines, trims entries, drops
/// empties, and deduplicates while preserving first-seen order.
pub fn parse_codes(input: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut codes = Vec::new();

    for raw in input.split([',', '\n', '\r']) {
        let code = raw.trim();
        if code.is_empty() {
            continue;
        }
        if seen.insert(code.to_string()) {
            codes.push(code.to_string());
        }
    }

    codes
}

/// Bson-datetime (de)serialization for optional chrono datetimes, in the
/// spirit of `bson::serde_helpers::chrono_datetime_as_bson_datetime` which
/// only covers the non-optional case.
pub mod chrono_datetime_option_as_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.map(bson::DateTime::from_chrono).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<bson::DateTime>::deserialize(deserializer)?;

        Ok(value.map(|datetime| datetime.to_chrono()))
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn parse_codes_splits_on_commas_and_newlines() {
        let codes = parse_codes("A1, A2\nA3\r\nA4");

        assert_eq!(codes, vec!["A1", "A2", "A3", "A4"]);
    }

    #[test]
    fn parse_codes_trims_and_drops_empty_entries() {
        let codes = parse_codes("  A1  ,, \n ,A2\n\n");

        assert_eq!(codes, vec!["A1", "A2"]);
    }

    #[test]
    fn parse_codes_deduplicates_preserving_order() {
        let codes = parse_codes("B2,A1,B2,A1,C3");

        assert_eq!(codes, vec!["B2", "A1", "C3"]);
    }

    #[test]
    fn client_address_prefers_first_forwarded_entry() {
        let request = TestRequest::default()
            .insert_header(("x-forwarded-for", "203.0.113.7, 10.0.0.1"))
            .insert_header(("x-real-ip", "198.51.100.2"))
            .to_http_request();

        assert_eq!(client_address(&request), "203.0.113.7");
    }

    #[test]
    fn client_address_falls_back_to_real_ip_then_loopback() {
        let request = TestRequest::default()
            .insert_header(("x-real-ip", "198.51.100.2"))
            .to_http_request();
        assert_eq!(client_address(&request), "198.51.100.2");

        let request = TestRequest::default().to_http_request();
        assert_eq!(client_address(&request), "127.0.0.1");
    }
}
