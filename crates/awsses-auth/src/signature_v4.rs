use awsses_common::{
    error::{ExporterError, Result},
    time::{format_amz_date, format_amz_day},
};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use http::{HeaderMap, HeaderValue, header};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use sha2::{Digest, Sha256};

use crate::credentials::Credentials;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub const AMZ_DATE_HEADER: &str = "x-amz-date";
pub const SECURITY_TOKEN_HEADER: &str = "x-amz-security-token";

const AWS_URI_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'!')
    .add(b'"')
    .add(b'#')
    .add(b'$')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'=')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b']');

/// Region, service and instant a request is signed for.
#[derive(Debug, Clone, Copy)]
pub struct SigningScope<'a> {
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

impl SigningScope<'_> {
    pub fn credential_scope(&self) -> String {
        format!(
            "{}/{}/{}/aws4_request",
            format_amz_day(&self.time),
            self.region,
            self.service
        )
    }
}

pub fn get_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let region_key = hmac_sha256(&date_key, region.as_bytes());
    let service_key = hmac_sha256(&region_key, service.as_bytes());
    hmac_sha256(&service_key, b"aws4_request")
}

pub fn get_canonical_request(
    method: &str,
    uri: &str,
    query_string: &str,
    canonical_headers: &str,
    signed_headers: &str,
    payload_hash: &str,
) -> String {
    format!(
        "{method}\n{uri}\n{query_string}\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
    )
}

pub fn get_string_to_sign(canonical_request: &str, date_time: &str, scope: &str) -> String {
    let canonical_hash = sha256_hex(canonical_request.as_bytes());
    format!("{ALGORITHM}\n{date_time}\n{scope}\n{canonical_hash}")
}

pub fn get_signature(signing_key: &[u8], string_to_sign: &str) -> String {
    hex::encode(hmac_sha256(signing_key, string_to_sign.as_bytes()))
}

/// Adds `x-amz-date`, the session token when present, and `Authorization`
/// to `headers`. Every header already in the map is signed.
pub fn sign_request(
    credentials: &Credentials,
    scope: &SigningScope<'_>,
    method: &str,
    uri: &str,
    query_string: &str,
    headers: &mut HeaderMap,
    payload: &[u8],
) -> Result<()> {
    let date_time = format_amz_date(&scope.time);
    headers.insert(AMZ_DATE_HEADER, header_value(&date_time)?);
    if let Some(token) = credentials.session_token.as_deref() {
        headers.insert(SECURITY_TOKEN_HEADER, header_value(token)?);
    }

    let mut signed_header_names = headers
        .keys()
        .map(|name| name.as_str().to_string())
        .collect::<Vec<_>>();
    signed_header_names.sort();
    signed_header_names.dedup();

    let canonical_headers = canonical_headers(headers, &signed_header_names).ok_or_else(|| {
        ExporterError::InvalidArgument("request headers are not valid for signing".to_string())
    })?;
    let signed_headers = signed_header_names.join(";");

    let canonical_request = get_canonical_request(
        method,
        &canonical_uri(uri),
        &canonical_query_string(query_string),
        &canonical_headers,
        &signed_headers,
        &sha256_hex(payload),
    );

    let credential_scope = scope.credential_scope();
    let string_to_sign = get_string_to_sign(&canonical_request, &date_time, &credential_scope);
    let signing_key = get_signing_key(
        &credentials.secret_key,
        &format_amz_day(&scope.time),
        scope.region,
        scope.service,
    );
    let signature = get_signature(&signing_key, &string_to_sign);

    let credential = format!("{}/{credential_scope}", credentials.access_key);
    let authorization = format!(
        "{ALGORITHM} Credential={credential}, SignedHeaders={signed_headers}, Signature={signature}"
    );
    headers.insert(header::AUTHORIZATION, header_value(&authorization)?);
    Ok(())
}

pub fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let starts_with_slash = path.starts_with('/');
    let ends_with_slash = path.ends_with('/');
    let encoded_segments = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(percent_encode)
        .collect::<Vec<_>>();

    let mut out = String::new();
    if starts_with_slash {
        out.push('/');
    }
    out.push_str(&encoded_segments.join("/"));
    if ends_with_slash && !out.ends_with('/') {
        out.push('/');
    }
    if out.is_empty() { "/".to_string() } else { out }
}

pub fn canonical_query_string(query_string: &str) -> String {
    let mut params = query_string
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (percent_encode(name), percent_encode(value))
        })
        .collect::<Vec<_>>();

    params.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    params
        .into_iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|err| ExporterError::InvalidArgument(format!("invalid header value: {err}")))
}

fn canonical_headers(headers: &HeaderMap, signed_header_names: &[String]) -> Option<String> {
    let mut out = String::new();
    for name in signed_header_names {
        let value = headers.get(name.as_str())?;
        let value = value.to_str().ok()?;
        out.push_str(name);
        out.push(':');
        out.push_str(&normalize_header_value(value));
        out.push('\n');
    }
    Some(out)
}

fn normalize_header_value(value: &str) -> String {
    let mut out = String::new();
    let mut in_whitespace = false;
    for ch in value.trim().chars() {
        if ch.is_ascii_whitespace() {
            in_whitespace = true;
            continue;
        }
        if in_whitespace && !out.is_empty() {
            out.push(' ');
        }
        in_whitespace = false;
        out.push(ch);
    }
    out
}

fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, AWS_URI_ENCODE_SET).to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use http::{HeaderMap, HeaderValue, header};

    use super::*;

    const SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    fn example_credentials(session_token: Option<&str>) -> Credentials {
        Credentials {
            access_key: "AKIDEXAMPLE".to_string(),
            secret_key: SECRET.to_string(),
            session_token: session_token.map(str::to_string),
        }
    }

    #[test]
    fn derives_documented_signing_key() {
        let key = get_signing_key(SECRET, "20120215", "us-east-1", "iam");
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn signs_vanilla_get_request() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("example.amazonaws.com"));
        let scope = SigningScope {
            region: "us-east-1",
            service: "service",
            time: Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap(),
        };

        sign_request(&example_credentials(None), &scope, "GET", "/", "", &mut headers, b"")
            .unwrap();

        assert_eq!(headers.get(AMZ_DATE_HEADER).unwrap(), "20150830T123600Z");
        assert_eq!(
            headers.get(header::AUTHORIZATION).unwrap(),
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
             SignedHeaders=host;x-amz-date, \
             Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
    }

    #[test]
    fn session_token_is_sent_and_signed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("email.us-west-2.amazonaws.com"));
        let scope = SigningScope {
            region: "us-west-2",
            service: "ses",
            time: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };

        sign_request(
            &example_credentials(Some("session")),
            &scope,
            "POST",
            "/",
            "",
            &mut headers,
            b"Action=GetSendStatistics",
        )
        .unwrap();

        assert_eq!(headers.get(SECURITY_TOKEN_HEADER).unwrap(), "session");
        let authorization = headers.get(header::AUTHORIZATION).unwrap().to_str().unwrap();
        assert!(authorization.contains("/20240102/us-west-2/ses/aws4_request"));
        assert!(authorization.contains("SignedHeaders=host;x-amz-date;x-amz-security-token"));
    }

    #[test]
    fn canonicalizes_uri_and_query() {
        assert_eq!(canonical_uri(""), "/");
        assert_eq!(canonical_uri("/a b/c/"), "/a%20b/c/");
        assert_eq!(canonical_query_string("b=2&a=1&a=0"), "a=0&a=1&b=2");
    }
}
