use std::convert::Infallible;
use std::io::Cursor;

use rocket::http::{ContentType, Header, Status};
use rocket::request::{self, FromRequest};
use rocket::{response, Request, Response, State};

use super::params::parse_fill_path;
use crate::api::ApiError;
use crate::cache::Thumbnail;
use crate::config::AppConfig;
use crate::images::{ForwardedHeaders, PreviewService};

const CACHE_CONTROL: &str = "public, max-age=86400";

/// Raw request target plus the headers configured for pass-through.
pub struct FillRequest {
    path: String,
    query: Option<String>,
    headers: ForwardedHeaders,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for FillRequest {
    type Error = Infallible;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let mut headers = ForwardedHeaders::new();

        if let Some(config) = req.rocket().state::<AppConfig>() {
            for name in &config.forward_headers {
                for value in req.headers().get(name) {
                    headers.push(name.as_str(), value);
                }
            }
        }

        request::Outcome::Success(FillRequest {
            path: req.uri().path().as_str().to_string(),
            query: req.uri().query().map(|q| q.as_str().to_string()),
            headers,
        })
    }
}

#[get("/fill/<_..>")]
pub async fn fill(
    request: FillRequest,
    service: &State<PreviewService>,
) -> Result<ImageResponse, ApiError> {
    let params = parse_fill_path(&request.path, request.query.as_deref())?;
    log::debug!(
        "Thumbnail requested: {}x{} of {}",
        params.width,
        params.height,
        params.url
    );

    let thumbnail = service
        .resolve(params.width, params.height, &params.url, &request.headers)
        .await?;

    Ok(ImageResponse { thumbnail })
}

// Responder for thumbnail data
pub struct ImageResponse {
    pub thumbnail: Thumbnail,
}

impl<'r> response::Responder<'r, 'static> for ImageResponse {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let etag = format!("\"{:x}\"", md5::compute(self.thumbnail.data()));

        // Check If-None-Match header
        if let Some(if_none_match) = req.headers().get_one("If-None-Match") {
            if if_none_match == etag {
                return Response::build()
                    .status(Status::NotModified)
                    .header(Header::new("ETag", etag))
                    .header(Header::new("Cache-Control", CACHE_CONTROL))
                    .ok();
            }
        }

        let length = self.thumbnail.len();
        Response::build()
            .header(ContentType::JPEG)
            .header(Header::new("Content-Length", length.to_string()))
            .header(Header::new("Cache-Control", CACHE_CONTROL))
            .header(Header::new("ETag", etag))
            .sized_body(length, Cursor::new(self.thumbnail.data().clone()))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use image::GenericImageView;
    use rocket::figment::Figment;
    use rocket::http::{ContentType, Header, Status};
    use rocket::local::asynchronous::Client;
    use tempfile::TempDir;

    use crate::cache::{ImageCache, ThumbnailCache};
    use crate::config::tests::test_config;
    use crate::config::{AppConfig, ErrorFormat};
    use crate::images::testing::FakeFetcher;
    use crate::images::tools::{decode_image, tests::sample_png};
    use crate::images::PreviewService;
    use crate::storage::{FileStore, ThumbnailStore};

    struct TestServer {
        client: Client,
        cache: Arc<ImageCache>,
        store: Arc<FileStore>,
        fetcher: Arc<FakeFetcher>,
        _dir: TempDir,
    }

    async fn server_with(fetcher: FakeFetcher, tweak: impl FnOnce(&mut AppConfig)) -> TestServer {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(dir.path().join("thumbs"));
        tweak(&mut config);

        let cache = Arc::new(ImageCache::new(config.cache_capacity));
        let store = Arc::new(FileStore::open(&config.storage_path).await.unwrap());
        let fetcher = Arc::new(fetcher);
        let service = PreviewService::new(
            cache.clone(),
            store.clone(),
            fetcher.clone(),
            config.service_options(),
        );

        let figment = Figment::from(rocket::Config::debug_default());
        let client = Client::tracked(crate::server(figment, config, service))
            .await
            .unwrap();

        TestServer {
            client,
            cache,
            store,
            fetcher,
            _dir: dir,
        }
    }

    async fn server(fetcher: FakeFetcher) -> TestServer {
        server_with(fetcher, |_| {}).await
    }

    #[rocket::async_test]
    async fn serves_resized_jpeg_and_caches_it() {
        let srv = server(FakeFetcher::image(sample_png(120, 90))).await;

        let response = srv
            .client
            .get("/fill/200/300/example.com/img/gopher.png")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.content_type(), Some(ContentType::JPEG));
        assert_eq!(
            response.headers().get_one("Cache-Control"),
            Some("public, max-age=86400")
        );
        assert!(response.headers().get_one("ETag").is_some());
        let content_length = response
            .headers()
            .get_one("Content-Length")
            .map(|v| v.parse::<usize>().unwrap());
        let first = response.into_bytes().await.unwrap();
        assert_eq!(content_length, Some(first.len()));
        assert_eq!(decode_image(&first).unwrap().dimensions(), (200, 300));

        let second = srv
            .client
            .get("/fill/200/300/example.com/img/gopher.png")
            .dispatch()
            .await
            .into_bytes()
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(srv.fetcher.fetches(), 1);
        assert_eq!(srv.cache.len(), 1);
        assert_eq!(srv.store.list_keys().await.unwrap().len(), 1);
    }

    #[rocket::async_test]
    async fn scheme_variants_share_one_entry() {
        let srv = server(FakeFetcher::image(sample_png(40, 40))).await;

        for path in [
            "/fill/20/20/example.com/a.png",
            "/fill/20/20/https://example.com/a.png",
            "/fill/20/20/https:/example.com/a.png/",
        ] {
            let response = srv.client.get(path).dispatch().await;
            assert_eq!(response.status(), Status::Ok, "{}", path);
        }

        assert_eq!(srv.fetcher.fetches(), 1);
    }

    #[rocket::async_test]
    async fn matching_etag_yields_not_modified() {
        let srv = server(FakeFetcher::image(sample_png(40, 40))).await;

        let response = srv.client.get("/fill/10/10/example.com/a.png").dispatch().await;
        let etag = response.headers().get_one("ETag").unwrap().to_string();

        let response = srv
            .client
            .get("/fill/10/10/example.com/a.png")
            .header(Header::new("If-None-Match", etag.clone()))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotModified);
        assert_eq!(response.headers().get_one("ETag"), Some(etag.as_str()));
        assert!(response.into_bytes().await.unwrap_or_default().is_empty());
    }

    #[rocket::async_test]
    async fn configured_headers_are_forwarded() {
        let srv = server(FakeFetcher::image(sample_png(8, 8))).await;

        srv.client
            .get("/fill/4/4/example.com/a.png")
            .header(Header::new("Authorization", "Bearer secret"))
            .header(Header::new("X-Private", "nope"))
            .dispatch()
            .await;

        let seen = srv.fetcher.seen_headers.lock();
        let forwarded: Vec<_> = seen[0].iter().collect();
        assert_eq!(forwarded, vec![("Authorization", "Bearer secret")]);
    }

    #[rocket::async_test]
    async fn invalid_dimensions_are_rejected_with_json() {
        let srv = server(FakeFetcher::image(sample_png(8, 8))).await;

        let response = srv
            .client
            .get("/fill/0/100/example.com/a.png")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        assert_eq!(response.content_type(), Some(ContentType::JSON));

        let body: serde_json::Value =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(body["message"].as_str().unwrap().contains("width"));
        assert_eq!(srv.fetcher.fetches(), 0);
    }

    #[rocket::async_test]
    async fn non_image_is_bad_gateway() {
        let mut fetcher = FakeFetcher::image(b"{}".to_vec());
        fetcher.response.content_type = Some("application/json".to_string());
        let srv = server(fetcher).await;

        let response = srv.client.get("/fill/4/4/example.com/a.png").dispatch().await;
        assert_eq!(response.status(), Status::BadGateway);
        assert_eq!(srv.cache.len(), 0);
        assert!(srv.store.list_keys().await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn text_errors_when_configured() {
        let mut fetcher = FakeFetcher::image(sample_png(8, 8));
        fetcher.response.status = 404;
        let srv = server_with(fetcher, |c| c.error_format = ErrorFormat::Text).await;

        let response = srv.client.get("/fill/4/4/example.com/a.png").dispatch().await;
        assert_eq!(response.status(), Status::BadGateway);
        assert_eq!(response.content_type(), Some(ContentType::Plain));
        assert_eq!(
            response.into_string().await.unwrap(),
            "Image not found on remote server (status 404)"
        );
    }
}
