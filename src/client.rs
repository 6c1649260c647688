//! Network access for the icon-search API: search and image download.
//!
//! Both operations consult their cache first, make exactly one request on a
//! miss, and populate the cache only on success. There is no retry.

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView};
use reqwest::{Client, Url};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{ImageCache, SearchCache};
use crate::constants::constants;
use crate::error::FetchError;
use crate::model::SearchResult;

// --- Transport ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
  pub url: String,
  pub headers: Vec<(&'static str, String)>,
  pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

/// Outbound GET. Implementations report transport failures as `FetchError::Network`
/// and leave status interpretation to the caller.
#[async_trait]
pub trait HttpTransport: Send + Sync {
  async fn get(&self, request: HttpRequest) -> Result<HttpResponse, FetchError>;
}

pub struct ReqwestTransport {
  client: Client,
}

impl ReqwestTransport {
  pub fn new() -> Self {
    Self { client: Client::new() }
  }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
  async fn get(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
    let mut builder = self.client.get(&request.url);
    for (name, value) in &request.headers {
      builder = builder.header(*name, value);
    }
    if let Some(timeout) = request.timeout {
      builder = builder.timeout(timeout);
    }
    let response = builder.send().await?;
    let status = response.status().as_u16();
    let body = response.bytes().await?.to_vec();
    Ok(HttpResponse { status, body })
  }
}

// --- Image asset ---

/// A decoded image, identified by the URL it was downloaded from.
#[derive(Clone)]
pub struct ImageAsset {
  pub url: String,
  pub image: Arc<DynamicImage>,
  pub width: u32,
  pub height: u32,
}

impl ImageAsset {
  pub fn new(url: impl Into<String>, image: DynamicImage) -> Self {
    let (width, height) = image.dimensions();
    Self { url: url.into(), image: Arc::new(image), width, height }
  }
}

impl fmt::Debug for ImageAsset {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ImageAsset").field("url", &self.url).field("width", &self.width).field("height", &self.height).finish()
  }
}

// --- Fetch client ---

pub struct FetchClient {
  transport: Arc<dyn HttpTransport>,
  searches: SearchCache,
  images: ImageCache,
  endpoint: String,
  token: String,
}

impl FetchClient {
  pub fn new(
    transport: Arc<dyn HttpTransport>,
    searches: SearchCache,
    images: ImageCache,
    endpoint: impl Into<String>,
    token: impl Into<String>,
  ) -> Self {
    Self { transport, searches, images, endpoint: endpoint.into(), token: token.into() }
  }

  #[cfg(test)]
  pub fn search_cache(&self) -> &SearchCache {
    &self.searches
  }

  #[cfg(test)]
  pub fn image_cache(&self) -> &ImageCache {
    &self.images
  }

  pub fn cached_search(&self, query: &str) -> Option<SearchResult> {
    self.searches.get(query)
  }

  pub fn cached_image(&self, url: &str) -> Option<ImageAsset> {
    self.images.get(url)
  }

  /// Search icons. The query is used verbatim as both cache key and wire parameter.
  pub async fn search(&self, query: &str) -> Result<SearchResult, FetchError> {
    if let Some(hit) = self.cached_search(query) {
      debug!(query = %query, "search: cache hit");
      return Ok(hit);
    }

    let url = self.search_url(query)?;
    info!(query = %query, "search: requesting");
    let response = self.transport.get(self.request(url.clone(), Some(constants().search_timeout()))).await?;
    expect_ok(&response, &url)?;

    let result: SearchResult = serde_json::from_slice(&response.body).map_err(|e| {
      warn!(query = %query, err = %e, "search: undecodable body");
      FetchError::Decode(e.to_string())
    })?;
    info!(query = %query, total = result.total_count, icons = result.icons.len(), "search: decoded");
    self.searches.put(query.to_string(), result.clone());
    Ok(result)
  }

  /// Download and decode an image, keyed by the exact URL string.
  pub async fn download_image(&self, url: &str) -> Result<ImageAsset, FetchError> {
    if let Some(hit) = self.cached_image(url) {
      debug!(url = %url, "image: cache hit");
      return Ok(hit);
    }

    debug!(url = %url, "image: requesting");
    let response = self.transport.get(self.request(url.to_string(), None)).await?;
    expect_ok(&response, url)?;

    let image = image::load_from_memory(&response.body).map_err(|e| {
      warn!(url = %url, err = %e, "image: undecodable body");
      FetchError::Decode(e.to_string())
    })?;
    let asset = ImageAsset::new(url, image);
    self.images.put(url.to_string(), asset.clone());
    Ok(asset)
  }

  fn search_url(&self, query: &str) -> Result<String, FetchError> {
    let c = constants();
    let count = c.result_count.to_string();
    let params = [
      ("query", query),
      ("count", count.as_str()),
      ("premium", if c.premium { "true" } else { "false" }),
      ("vector", if c.vector { "true" } else { "false" }),
      ("format", c.format.as_str()),
    ];
    Url::parse_with_params(&self.endpoint, &params)
      .map(String::from)
      .map_err(|e| FetchError::Network(format!("invalid search endpoint {}: {}", self.endpoint, e)))
  }

  fn request(&self, url: String, timeout: Option<Duration>) -> HttpRequest {
    HttpRequest {
      url,
      headers: vec![("Accept", "application/json".to_string()), ("Authorization", format!("Bearer {}", self.token))],
      timeout,
    }
  }
}

fn expect_ok(response: &HttpResponse, url: &str) -> Result<(), FetchError> {
  if response.status == 200 {
    Ok(())
  } else {
    warn!(url = %url, status = response.status, "fetch: non-200 response");
    Err(FetchError::Server { status: response.status, url: url.to_string() })
  }
}

#[cfg(test)]
pub(crate) mod testing {
  use super::*;
  use std::collections::HashMap;
  use std::io::Cursor;
  use std::sync::Mutex;
  use tokio::sync::Notify;

  pub const ENDPOINT: &str = "http://api.test/v4/icons/search";

  struct Route {
    status: u16,
    body: Vec<u8>,
    gate: Option<Arc<Notify>>,
  }

  /// In-memory transport. Routes match on the URL without its query string.
  /// A gated route holds its response until `release` is called.
  #[derive(Default)]
  pub struct FakeTransport {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<HttpRequest>>,
  }

  impl FakeTransport {
    pub fn new() -> Arc<Self> {
      Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, status: u16, body: Vec<u8>) {
      self.routes.lock().unwrap().insert(url.to_string(), Route { status, body, gate: None });
    }

    pub fn respond_gated(&self, url: &str, status: u16, body: Vec<u8>) {
      let gate = Some(Arc::new(Notify::new()));
      self.routes.lock().unwrap().insert(url.to_string(), Route { status, body, gate });
    }

    pub fn release(&self, url: &str) {
      if let Some(gate) = self.routes.lock().unwrap().get(url).and_then(|r| r.gate.clone()) {
        gate.notify_one();
      }
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
      self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
      self.calls.lock().unwrap().len()
    }
  }

  #[async_trait]
  impl HttpTransport for FakeTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
      self.calls.lock().unwrap().push(request.clone());
      let base = request.url.split('?').next().unwrap_or_default().to_string();
      let (status, body, gate) = {
        let routes = self.routes.lock().unwrap();
        match routes.get(&base) {
          Some(r) => (r.status, r.body.clone(), r.gate.clone()),
          None => return Err(FetchError::Network(format!("connection refused: {base}"))),
        }
      };
      if let Some(gate) = gate {
        gate.notified().await;
      }
      Ok(HttpResponse { status, body })
    }
  }

  pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 255])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png).unwrap();
    buf
  }

  pub fn client(transport: Arc<FakeTransport>) -> FetchClient {
    FetchClient::new(transport, SearchCache::new("search"), ImageCache::new("image"), ENDPOINT, "secret")
  }
}
