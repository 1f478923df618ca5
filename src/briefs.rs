//! Admin-entered briefs and the instruction/payload each one sends

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use log::debug;

use crate::config::GeneratorConfig;
use crate::request::Instruction;

const REVIEW_INSTRUCTION: &str
  = "Return strict JSON with keys: title, slug, meta_description, \
     focus_keyphrase, excerpt, content_html, pros (array), cons (array), \
     social_captions (object with threads, facebook, generic), schema \
     (Draft 07 JSON Schema for the Article-style response). Write in HTML \
     within content_html with H2/H3 structure, keeping the JSON shape and \
     HTML layout intact. Include the JSON Schema object in the schema \
     field describing the response structure you returned. Use a \
     confident, conversational editor voice with varied sentence lengths. \
     Open with a strong intro that explains why the product matters. Add \
     descriptive H2/H3 labels and cover design, performance, features, \
     software, battery, price/value, and verdict sections. Keep JSON \
     valid. Match the confident, conversational tech-journalism tone of \
     The Verge, Engadget, and Android Police.";

const DEAL_INSTRUCTION: &str
  = "Return JSON with keys: title, slug, meta_description, \
     focus_keyphrase, excerpt, content_html, cta_text, social_captions \
     (threads, facebook, generic). Content should be short, newsy, \
     urgent, and explain why the deal matters. Include HTML for \
     content_html, and keep CTA clear. Do not include markdown.";

const GUIDE_INSTRUCTION: &str
  = "Return JSON with keys: title, slug, meta_description, \
     focus_keyphrase, excerpt, content_html, faq (array of question and \
     answer objects), social_captions (threads, facebook, generic). Use \
     HTML for content_html with H2/H3 and optional lists/steps. Keep tone \
     confident and clear with the Verge/Engadget/Android Police voice. \
     Include concise, helpful FAQ entries.";

const CAPTION_INSTRUCTION: &str
  = "Return JSON with a single key \"caption\" containing a short, catchy \
     social post (max ~220 characters) suitable for general networks. Use \
     Verge/Engadget/Android Police tone, include a hook and 1-2 purposeful \
     hashtags, avoid emojis unless necessary.";

const ARTICLE_KEYS: [&str; 6] = [
  "title", "slug", "meta_description", "focus_keyphrase", "excerpt",
  "content_html",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BriefKind
{   Review
  , Deal
  , Guide
  , Caption
}

impl BriefKind
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   BriefKind::Review => "review"
          , BriefKind::Deal => "deal"
          , BriefKind::Guide => "guide"
          , BriefKind::Caption => "caption"
        }
    }
}

impl std::str::FromStr for BriefKind
{   type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {   match s.trim().to_ascii_lowercase().as_str()
        {   "review" => Ok(BriefKind::Review)
          , "deal" => Ok(BriefKind::Deal)
          , "guide" => Ok(BriefKind::Guide)
          , "caption" => Ok(BriefKind::Caption)
          , other => Err(crate::error::Error::Other(
              format!("Unknown brief kind: {}", other)
            ))
        }
    }
}

/// What a flow sends to the generator and expects back
pub trait Brief
{   fn kind(&self) -> BriefKind;

    fn instruction(&self) -> Instruction;

    /// Reject briefs missing the one field the flow needs
    fn validate(
      &self
    , config: &GeneratorConfig
    ) -> Result<(), crate::error::Error>;

    fn payload(
      &self
    , config: &GeneratorConfig
    ) -> Result<Value, crate::error::Error>;

    /// Title to use when the model returns none
    fn fallback_title(&self) -> String;

    /// Keys the instruction asks the model for
    fn required_keys(&self) -> Vec<&'static str>;

    fn generation_params(&self) -> Option<Map<String, Value>>
    {   None
    }

    /// Merge brief-side facts into the parsed response
    fn enrich(
      &self
    , _data: &mut Map<String, Value>
    , _config: &GeneratorConfig
    )
    {}
}

fn require(
  value: &str
, field: &str
) -> Result<(), crate::error::Error>
{   if value.trim().is_empty()
    {   debug!("Brief rejected, missing {}", field);
        return Err(crate::error::Error::MissingField(field.to_string()));
    }
    Ok(())
}

fn article_keys(extra: &[&'static str]) -> Vec<&'static str>
{   ARTICLE_KEYS.iter().chain(extra.iter()).copied().collect()
}

// ===== Review =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductFacts
{   pub name: String
  , pub brand: String
  , #[serde(rename = "type")]
    pub product_type: String
  , pub urls: Vec<String>
  , pub price: String
  , pub currency: String
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience
{   pub liked: String
  , pub disliked: String
  , pub surprise: String
  , pub dealbreaker: String
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewContext
{   pub usage_duration: String
  , pub competitors: String
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSeo
{   pub target_keyphrase: String
  , pub secondary_keyphrases: String
  , pub desired_word_count: String
}

/// Hands-on product review
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewBrief
{   pub product: ProductFacts
  , pub experience: Experience
  , pub context: ReviewContext
  , pub seo: ReviewSeo
}

impl Brief for ReviewBrief
{   fn kind(&self) -> BriefKind
    {   BriefKind::Review
    }

    fn instruction(&self) -> Instruction
    {   Instruction::from(REVIEW_INSTRUCTION)
    }

    fn validate(
      &self
    , _config: &GeneratorConfig
    ) -> Result<(), crate::error::Error>
    {   require(&self.product.name, "product.name")
    }

    fn payload(
      &self
    , _config: &GeneratorConfig
    ) -> Result<Value, crate::error::Error>
    {   let mut brief = self.clone();
        brief.product.urls = self.product.urls
          .iter()
          .map(|u| u.trim().to_string())
          .filter(|u| !u.is_empty())
          .collect();
        Ok(serde_json::to_value(brief)?)
    }

    fn fallback_title(&self) -> String
    {   self.product.name.trim().to_string()
    }

    fn required_keys(&self) -> Vec<&'static str>
    {   article_keys(&["pros", "cons", "social_captions", "schema"])
    }
}

// ===== Deal =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardMeta
{   pub cta_text: String
  , pub store_name: String
  , pub deal_type: String
  , pub summary: String
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pricing
{   pub current_price: String
  , pub original_price: String
  , pub currency: String
  , pub coupon: String
  , pub expires: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DealStyle
{   pub post_type: String
}

impl Default for DealStyle
{   fn default() -> Self
    {   DealStyle
        {   post_type: "quick".to_string()
        }
    }
}

/// Time-limited deal post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DealBrief
{   pub deal_url: String
  , pub image_url: String
  , pub card_meta: CardMeta
  , pub pricing: Pricing
  , pub style: DealStyle
  , pub keyphrase: String
}

impl DealBrief
{   /// Deal link with the configured affiliate tag applied
    pub fn link(&self, config: &GeneratorConfig) -> String
    {   crate::affiliate::normalize_affiliate_url(
          &self.deal_url,
          config.amazon_tag.as_deref()
        )
    }
}

fn set_if_present(
  data: &mut Map<String, Value>
, key: &str
, value: &str
)
{   if !value.trim().is_empty()
    {   data.insert(key.to_string(), Value::from(value));
    }
}

impl Brief for DealBrief
{   fn kind(&self) -> BriefKind
    {   BriefKind::Deal
    }

    fn instruction(&self) -> Instruction
    {   Instruction::from(DEAL_INSTRUCTION)
    }

    fn validate(
      &self
    , config: &GeneratorConfig
    ) -> Result<(), crate::error::Error>
    {   require(&self.link(config), "deal_url")
    }

    fn payload(
      &self
    , config: &GeneratorConfig
    ) -> Result<Value, crate::error::Error>
    {   let card_meta = serde_json::to_value(&self.card_meta)?;
        let pricing = serde_json::to_value(&self.pricing)?;
        let style = serde_json::to_value(&self.style)?;
        Ok(json!({
          "link": self.link(config),
          "image_url": self.image_url.trim(),
          "card_meta": card_meta,
          "pricing": pricing,
          "style": style,
          "seo": { "keyphrase": self.keyphrase },
        }))
    }

    fn fallback_title(&self) -> String
    {   "New Deal".to_string()
    }

    fn required_keys(&self) -> Vec<&'static str>
    {   article_keys(&["cta_text", "social_captions"])
    }

    fn enrich(
      &self
    , data: &mut Map<String, Value>
    , config: &GeneratorConfig
    )
    {   data.insert("link".to_string(), Value::from(self.link(config)));
        data.insert(
          "pricing".to_string(),
          serde_json::to_value(&self.pricing).unwrap_or_default()
        );
        data.insert(
          "card_meta".to_string(),
          serde_json::to_value(&self.card_meta).unwrap_or_default()
        );

        let model_image = data.get("image_url")
          .and_then(Value::as_str)
          .map(str::trim)
          .filter(|u| !u.is_empty())
          .map(str::to_string);
        let image = model_image
          .unwrap_or_else(|| self.image_url.trim().to_string());
        data.insert("image_url".to_string(), Value::from(image));

        let meta = &self.card_meta;
        set_if_present(data, "cta_text", &meta.cta_text);
        set_if_present(data, "store", &meta.store_name);
        set_if_present(data, "store_name", &meta.store_name);
        set_if_present(data, "deal_type", &meta.deal_type);
        set_if_present(data, "tagline", &meta.summary);
    }
}

// ===== Guide =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Topic
{   pub title: String
  , #[serde(rename = "type")]
    pub topic_type: String
  , pub audience: String
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideStructure
{   pub sections: Vec<String>
  , pub word_count: String
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideSeo
{   pub target_keyphrase: String
  , pub secondary_keyphrases: String
}

/// How-to / explainer guide
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideBrief
{   pub topic: Topic
  , pub structure: GuideStructure
  , pub seo: GuideSeo
  , pub internal_links: String
}

impl Brief for GuideBrief
{   fn kind(&self) -> BriefKind
    {   BriefKind::Guide
    }

    fn instruction(&self) -> Instruction
    {   Instruction::from(GUIDE_INSTRUCTION)
    }

    fn validate(
      &self
    , _config: &GeneratorConfig
    ) -> Result<(), crate::error::Error>
    {   require(&self.topic.title, "topic.title")
    }

    fn payload(
      &self
    , _config: &GeneratorConfig
    ) -> Result<Value, crate::error::Error>
    {   Ok(serde_json::to_value(self)?)
    }

    fn fallback_title(&self) -> String
    {   self.topic.title.trim().to_string()
    }

    fn required_keys(&self) -> Vec<&'static str>
    {   article_keys(&["faq", "social_captions"])
    }
}

// ===== Caption =====

/// Evergreen social caption for an already published post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionBrief
{   pub title: String
  , pub excerpt: String
  , pub url: String
}

impl Brief for CaptionBrief
{   fn kind(&self) -> BriefKind
    {   BriefKind::Caption
    }

    fn instruction(&self) -> Instruction
    {   Instruction::from(CAPTION_INSTRUCTION)
    }

    fn validate(
      &self
    , _config: &GeneratorConfig
    ) -> Result<(), crate::error::Error>
    {   require(&self.title, "title")
    }

    fn payload(
      &self
    , _config: &GeneratorConfig
    ) -> Result<Value, crate::error::Error>
    {   Ok(serde_json::to_value(self)?)
    }

    fn fallback_title(&self) -> String
    {   self.title.trim().to_string()
    }

    fn required_keys(&self) -> Vec<&'static str>
    {   vec!["caption"]
    }

    fn generation_params(&self) -> Option<Map<String, Value>>
    {   let mut params = Map::new();
        params.insert("temperature".to_string(), Value::from(0.6));
        Some(params)
    }
}

// ===== Any =====

/// One brief of any kind, for channels and the command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AnyBrief
{   Review(ReviewBrief)
  , Deal(DealBrief)
  , Guide(GuideBrief)
  , Caption(CaptionBrief)
}

impl AnyBrief
{   /// Parse a brief of the given kind from JSON text
    pub fn from_json(
      kind: BriefKind
    , raw: &str
    ) -> Result<Self, crate::error::Error>
    {   let brief = match kind
        {   BriefKind::Review => AnyBrief::Review(serde_json::from_str(raw)?)
          , BriefKind::Deal => AnyBrief::Deal(serde_json::from_str(raw)?)
          , BriefKind::Guide => AnyBrief::Guide(serde_json::from_str(raw)?)
          , BriefKind::Caption => {
              AnyBrief::Caption(serde_json::from_str(raw)?)
            }
        };
        Ok(brief)
    }

    fn inner(&self) -> &dyn Brief
    {   match self
        {   AnyBrief::Review(b) => b
          , AnyBrief::Deal(b) => b
          , AnyBrief::Guide(b) => b
          , AnyBrief::Caption(b) => b
        }
    }
}

impl Brief for AnyBrief
{   fn kind(&self) -> BriefKind
    {   self.inner().kind()
    }

    fn instruction(&self) -> Instruction
    {   self.inner().instruction()
    }

    fn validate(
      &self
    , config: &GeneratorConfig
    ) -> Result<(), crate::error::Error>
    {   self.inner().validate(config)
    }

    fn payload(
      &self
    , config: &GeneratorConfig
    ) -> Result<Value, crate::error::Error>
    {   self.inner().payload(config)
    }

    fn fallback_title(&self) -> String
    {   self.inner().fallback_title()
    }

    fn required_keys(&self) -> Vec<&'static str>
    {   self.inner().required_keys()
    }

    fn generation_params(&self) -> Option<Map<String, Value>>
    {   self.inner().generation_params()
    }

    fn enrich(
      &self
    , data: &mut Map<String, Value>
    , config: &GeneratorConfig
    )
    {   self.inner().enrich(data, config)
    }
}
