//! Wire model for the icon-search API.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::constants::constants;

/// One decoded search response. Cached verbatim under its query string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchResult {
  pub total_count: u64,
  pub icons: Vec<IconRecord>,
}

impl SearchResult {
  pub fn is_empty(&self) -> bool {
    self.icons.is_empty()
  }

  pub fn find_mut(&mut self, icon_id: u64) -> Option<&mut IconRecord> {
    self.icons.iter_mut().find(|icon| icon.icon_id == icon_id)
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IconRecord {
  pub icon_id: u64,
  pub tags: Vec<String>,
  pub published_at: String,
  pub is_premium: bool,
  #[serde(rename = "type")]
  pub kind: IconType,
  pub containers: Vec<Container>,
  pub raster_sizes: Vec<RasterSize>,
  #[serde(default)]
  pub vector_sizes: Option<Vec<VectorSize>>,
  pub styles: Vec<Category>,
  pub categories: Vec<Category>,
  pub is_icon_glyph: bool,
  #[serde(default)]
  pub prices: Option<Vec<Price>>,
  #[serde(default)]
  pub is_purchased: Option<bool>,
  /// Client-side only: set once the image has been handed to the gallery.
  #[serde(skip)]
  pub saved_locally: bool,
}

impl IconRecord {
  pub fn largest_raster(&self) -> Option<&RasterSize> {
    self.raster_sizes.iter().max_by_key(|r| r.size)
  }

  /// Download URL of the largest raster size, used for row thumbnails.
  pub fn thumbnail_url(&self) -> Option<&str> {
    self.largest_raster()?.formats.iter().map(|f| f.download_url.as_str()).find(|u| !u.is_empty())
  }

  /// First non-empty preview URL across all raster sizes, used when saving.
  pub fn preview_url(&self) -> Option<&str> {
    self
      .raster_sizes
      .iter()
      .flat_map(|r| r.formats.iter())
      .map(|f| f.preview_url.as_str())
      .find(|u| !u.is_empty())
  }

  pub fn dimensions_label(&self) -> String {
    match self.largest_raster() {
      Some(r) => format!("{}x{}", r.size_width, r.size_height),
      None => "0x0".to_string(),
    }
  }

  pub fn tags_summary(&self) -> String {
    self.tags.iter().take(constants().tag_limit).map(String::as_str).collect::<Vec<_>>().join(", ")
  }

  pub fn published(&self) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(&self.published_at).ok()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconType {
  Vector,
  Raster,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
  pub identifier: String,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Container {
  pub format: ContainerFormat,
  pub download_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
  Ai,
  Icns,
  Ico,
  Svg,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Price {
  pub license: License,
  pub currency: String,
  pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct License {
  pub license_id: u64,
  pub name: String,
  pub url: String,
  pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RasterSize {
  pub formats: Vec<FormatElement>,
  pub size: u32,
  pub size_width: u32,
  pub size_height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormatElement {
  pub format: RasterFormat,
  pub preview_url: String,
  pub download_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
  Png,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VectorSize {
  pub formats: Vec<Container>,
  pub target_sizes: Vec<Vec<u32>>,
  pub size: u32,
  pub size_width: u32,
  pub size_height: u32,
}


#[cfg(test)]
mod tests {
  use super::*;

  fn decode(json: &str) -> SearchResult {
    serde_json::from_str(json).unwrap()
  }

  #[test]
  fn decodes_search_response() {
    let result = decode(&fixtures::search_json(2));
    assert_eq!(result.total_count, 2);
    assert_eq!(result.icons.len(), 2);
    let icon = &result.icons[0];
    assert_eq!(icon.icon_id, 1);
    assert_eq!(icon.kind, IconType::Raster);
    assert_eq!(icon.vector_sizes, None);
    assert_eq!(icon.prices, None);
    assert!(!icon.saved_locally);
  }

  #[test]
  fn decodes_optional_vector_sizes_and_prices() {
    let json = r#"{
      "total_count": 1,
      "icons": [{
        "icon_id": 9, "tags": [], "published_at": "2020-01-01T00:00:00Z", "is_premium": true,
        "type": "vector", "containers": [{"format": "svg", "download_url": "http://x/9.svg"}],
        "raster_sizes": [],
        "vector_sizes": [{"formats": [{"format": "ai", "download_url": "http://x/9.ai"}],
                          "target_sizes": [[16, 16], [24, 24]], "size": 512, "size_width": 512, "size_height": 512}],
        "styles": [], "categories": [], "is_icon_glyph": true,
        "prices": [{"license": {"license_id": 1, "name": "Basic", "url": "http://l", "scope": "free"},
                    "currency": "USD", "price": 2}],
        "is_purchased": false
      }]
    }"#;
    let icon = &decode(json).icons[0];
    assert_eq!(icon.kind, IconType::Vector);
    assert_eq!(icon.containers[0].format, ContainerFormat::Svg);
    assert_eq!(icon.vector_sizes.as_ref().unwrap()[0].target_sizes[1], vec![24, 24]);
    assert_eq!(icon.prices.as_ref().unwrap()[0].license.name, "Basic");
    assert_eq!(icon.is_purchased, Some(false));
    assert_eq!(icon.thumbnail_url(), None);
    assert_eq!(icon.dimensions_label(), "0x0");
  }

  #[test]
  fn unknown_icon_type_is_rejected() {
    let json = fixtures::search_json(1).replace(r#""type": "raster""#, r#""type": "bitmap""#);
    assert!(serde_json::from_str::<SearchResult>(&json).is_err());
  }

  #[test]
  fn thumbnail_uses_largest_raster_download_url() {
    let icon = &decode(&fixtures::search_json(1)).icons[0];
    assert_eq!(icon.thumbnail_url(), Some("http://x/1/128/dl"));
    assert_eq!(icon.dimensions_label(), "128x128");
  }

  #[test]
  fn preview_url_is_first_non_empty_in_order() {
    let mut icon = decode(&fixtures::search_json(1)).icons.remove(0);
    assert_eq!(icon.preview_url(), Some("http://x/1/16.png"));
    icon.raster_sizes[0].formats[0].preview_url.clear();
    assert_eq!(icon.preview_url(), Some("http://x/1/128.png"));
  }

  #[test]
  fn tags_summary_is_capped() {
    let mut icon = decode(&fixtures::search_json(1)).icons.remove(0);
    icon.tags = (0..15).map(|i| format!("t{i}")).collect();
    let summary = icon.tags_summary();
    assert_eq!(summary.split(", ").count(), 10);
    assert!(summary.starts_with("t0, t1"));
  }

  #[test]
  fn published_parses_rfc3339() {
    let icon = &decode(&fixtures::search_json(1)).icons[0];
    assert_eq!(icon.published().unwrap().format("%Y-%m-%d").to_string(), "2013-04-23");
  }

  #[test]
  fn find_mut_locates_by_id() {
    let mut result = decode(&fixtures::search_json(3));
    result.find_mut(2).unwrap().saved_locally = true;
    assert!(result.icons[1].saved_locally);
    assert!(result.find_mut(42).is_none());
  }
}
