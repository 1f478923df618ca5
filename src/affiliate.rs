//! Affiliate tagging for deal links

use url::Url;
use log::{debug, trace};

/// Query parameters dropped from tagged links
const TRACKING_PARAMS: [&str; 3] = ["ref", "ascsubtag", "tracking_id"];

/// Apply the associates `tag` to Amazon links and strip tracking noise.
///
/// Blank input gives an empty string. Links that do not parse, have no
/// host, point somewhere other than Amazon, or arrive without a tag come
/// back unchanged (trimmed).
pub fn normalize_affiliate_url(
  raw: &str
, tag: Option<&str>
) -> String
{   let raw = raw.trim();
    if raw.is_empty()
    {   return String::new();
    }

    let tag = match tag.map(str::trim).filter(|t| !t.is_empty())
    {   Some(tag) => tag
      , None => return raw.to_string()
    };

    let mut url = match Url::parse(raw)
    {   Ok(url) => url
      , Err(e) => {
          trace!("Leaving unparsable link alone: {}", e);
          return raw.to_string();
        }
    };

    let is_amazon = url.host_str()
      .map(|h| h.to_ascii_lowercase().contains("amazon."))
      .unwrap_or(false);
    if !is_amazon
    {   return raw.to_string();
    }

    let mut pairs: Vec<(String, String)> = url.query_pairs()
      .map(|(k, v)| (k.into_owned(), v.into_owned()))
      .collect();

    match pairs.iter_mut().find(|(k, _)| k == "tag")
    {   Some(existing) => existing.1 = tag.to_string()
      , None => pairs.push(("tag".to_string(), tag.to_string()))
    }
    pairs.retain(|(k, _)| {
      !k.starts_with("utm_") && !TRACKING_PARAMS.contains(&k.as_str())
    });

    url.query_pairs_mut()
      .clear()
      .extend_pairs(pairs.iter());

    debug!("Normalized affiliate link for host {:?}", url.host_str());
    url.to_string()
}
