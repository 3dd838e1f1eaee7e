use super::FetchedResource;
use crate::error::{Error, ResourceError, Result};
use base64::Engine;

const DATA_URL_PREFIX: &str = "data:";
const DEFAULT_MEDIA_TYPE: &str = "text/plain";
const DEFAULT_CHARSET: &str = "charset=US-ASCII";

pub(crate) fn is_data_url(url: &str) -> bool {
  url
    .get(..DATA_URL_PREFIX.len())
    .is_some_and(|scheme| scheme.eq_ignore_ascii_case(DATA_URL_PREFIX))
}

/// Decode a data: URL into bytes and content type following RFC 2397 semantics.
pub(crate) fn decode_data_url(url: &str) -> Result<FetchedResource> {
  if !is_data_url(url) {
    return Err(invalid("URL does not start with 'data:'"));
  }

  let rest = &url[DATA_URL_PREFIX.len()..];
  let (metadata, data) = rest
    .split_once(',')
    .ok_or_else(|| invalid("Missing comma in data URL"))?;

  let (content_type, is_base64) = parse_metadata(metadata);
  let bytes = if is_base64 {
    decode_base64_data(data)?
  } else {
    percent_decode(data)?
  };
  Ok(FetchedResource::new(bytes, Some(content_type)))
}

fn invalid(reason: impl Into<String>) -> Error {
  Error::Resource(ResourceError::InvalidDataUrl {
    reason: reason.into(),
  })
}

/// Split the `<mediatype>[;param]*[;base64]` header into a content type and
/// the base64 flag. A missing media type defaults to `text/plain` with an
/// US-ASCII charset unless one was given.
fn parse_metadata(metadata: &str) -> (String, bool) {
  let mut parts = metadata.split(';').map(str::trim);
  let mediatype = parts.next().unwrap_or_default();
  let (flags, mut params): (Vec<&str>, Vec<&str>) = parts
    .filter(|param| !param.is_empty())
    .partition(|param| param.eq_ignore_ascii_case("base64"));

  let mut content_type = if mediatype.is_empty() {
    let names_charset = params.iter().any(|param| {
      let name = param.split_once('=').map_or(*param, |(name, _)| name);
      name.trim().eq_ignore_ascii_case("charset")
    });
    if !names_charset {
      params.insert(0, DEFAULT_CHARSET);
    }
    DEFAULT_MEDIA_TYPE.to_string()
  } else {
    mediatype.to_string()
  };
  for param in params {
    content_type.push(';');
    content_type.push_str(param);
  }
  (content_type, !flags.is_empty())
}

/// Decode base64 payloads, tolerating ASCII whitespace.
fn decode_base64_data(data: &str) -> Result<Vec<u8>> {
  let cleaned: Vec<u8> = data
    .bytes()
    .filter(|byte| !byte.is_ascii_whitespace())
    .collect();

  base64::engine::general_purpose::STANDARD
    .decode(&cleaned)
    .map_err(|e| invalid(format!("Invalid base64: {e}")))
}

/// Percent-decode a URL payload without treating '+' specially.
fn percent_decode(input: &str) -> Result<Vec<u8>> {
  let mut out = Vec::with_capacity(input.len());
  let bytes = input.as_bytes();
  let mut i = 0;
  while i < bytes.len() {
    if bytes[i] == b'%' {
      let hex = bytes
        .get(i + 1..i + 3)
        .and_then(|pair| std::str::from_utf8(pair).ok())
        .and_then(|pair| u8::from_str_radix(pair, 16).ok())
        .ok_or_else(|| invalid(format!("Invalid percent-encoding at byte {i}")))?;
      out.push(hex);
      i += 3;
    } else {
      out.push(bytes[i]);
      i += 1;
    }
  }
  Ok(out)
}
