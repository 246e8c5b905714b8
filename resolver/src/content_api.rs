use crate::config::{ContentApiConfig, Endpoints};
use crate::errors::ResolveError;
use crate::types::{Article, ArticleIdentity, ArticleKind, ArticleRecord, IdentityRecord, MetricHit};
use async_trait::async_trait;
use http::StatusCode;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::de::DeserializeOwned;
use url::Url;

/// Characters escaped when a value is substituted into a path template.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'&')
    .add(b'=');

/// The remote content API consumed by the resolution pipeline.
///
/// 404 responses map to [`ResolveError::NotFound`], other failures to
/// [`ResolveError::Network`], and payloads missing identity fields to
/// [`ResolveError::Malformed`].
#[async_trait]
pub trait ContentApi: Send + Sync {
    async fn resolve(&self, slug: &str) -> Result<ArticleIdentity, ResolveError>;

    async fn fetch_authored(&self, category: &str, slug: &str) -> Result<Article, ResolveError>;

    async fn fetch_imported(&self, source: &str, slug: &str) -> Result<Article, ResolveError>;

    async fn fetch_authored_by_slug(&self, slug: &str) -> Result<Article, ResolveError>;

    async fn fetch_imported_by_slug(&self, slug: &str) -> Result<Article, ResolveError>;

    async fn fetch_related(&self, identity: &ArticleIdentity) -> Result<Vec<Article>, ResolveError>;

    /// Records a view and returns the updated view count.
    async fn post_metric_hit(&self, identity: &ArticleIdentity) -> Result<u64, ResolveError>;
}

#[derive(Clone)]
pub struct HttpContentApi {
    client: reqwest::Client,
    base_url: String,
    endpoints: Endpoints,
}

impl HttpContentApi {
    pub fn new(config: &ContentApiConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &ContentApiConfig) -> Self {
        HttpContentApi {
            client,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            endpoints: config.endpoints.clone(),
        }
    }

    fn url(&self, template: &str, params: &[(&str, &str)]) -> Result<Url, ResolveError> {
        let mut path = template.to_string();
        for (name, value) in params {
            let encoded = utf8_percent_encode(value, SEGMENT).to_string();
            path = path.replace(&format!("{{{name}}}"), &encoded);
        }

        let separator = if path.starts_with('/') { "" } else { "/" };
        let full = format!("{}{separator}{path}", self.base_url);
        Url::parse(&full).map_err(|e| ResolveError::Network(format!("invalid url {full}: {e}")))
    }

    fn identity_params(identity: &ArticleIdentity) -> [(&'static str, &str); 3] {
        [
            ("kind", identity.kind().as_str()),
            ("parent", identity.parent_slug()),
            ("slug", identity.slug()),
        ]
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ResolveError> {
        tracing::debug!(%url, "content api request");
        let response = self.client.get(url).send().await?;
        Self::read_json(response).await
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ResolveError> {
        match response.status() {
            status if status.is_success() => Ok(response.json::<T>().await?),
            StatusCode::NOT_FOUND => Err(ResolveError::NotFound),
            status => Err(ResolveError::Network(format!(
                "unexpected status {status} from {}",
                response.url()
            ))),
        }
    }

    async fn get_article(&self, url: Url, expected: ArticleKind) -> Result<Article, ResolveError> {
        self.get_json::<ArticleRecord>(url)
            .await?
            .into_article(expected)
    }
}

#[async_trait]
impl ContentApi for HttpContentApi {
    async fn resolve(&self, slug: &str) -> Result<ArticleIdentity, ResolveError> {
        let url = self.url(&self.endpoints.resolve, &[("slug", slug)])?;
        self.get_json::<IdentityRecord>(url).await?.into_identity()
    }

    async fn fetch_authored(&self, category: &str, slug: &str) -> Result<Article, ResolveError> {
        let url = self.url(
            &self.endpoints.authored,
            &[("category", category), ("slug", slug)],
        )?;
        self.get_article(url, ArticleKind::Authored).await
    }

    async fn fetch_imported(&self, source: &str, slug: &str) -> Result<Article, ResolveError> {
        let url = self.url(&self.endpoints.imported, &[("source", source), ("slug", slug)])?;
        self.get_article(url, ArticleKind::Imported).await
    }

    async fn fetch_authored_by_slug(&self, slug: &str) -> Result<Article, ResolveError> {
        let url = self.url(&self.endpoints.authored_by_slug, &[("slug", slug)])?;
        self.get_article(url, ArticleKind::Authored).await
    }

    async fn fetch_imported_by_slug(&self, slug: &str) -> Result<Article, ResolveError> {
        let url = self.url(&self.endpoints.imported_by_slug, &[("slug", slug)])?;
        self.get_article(url, ArticleKind::Imported).await
    }

    async fn fetch_related(&self, identity: &ArticleIdentity) -> Result<Vec<Article>, ResolveError> {
        let url = self.url(&self.endpoints.related, &Self::identity_params(identity))?;
        let records = self.get_json::<Vec<ArticleRecord>>(url).await?;

        // A broken entry drops out of the list instead of failing it
        Ok(records
            .into_iter()
            .filter_map(|record| record.into_article(identity.kind()).ok())
            .collect())
    }

    async fn post_metric_hit(&self, identity: &ArticleIdentity) -> Result<u64, ResolveError> {
        let url = self.url(&self.endpoints.metric_hit, &Self::identity_params(identity))?;
        tracing::debug!(%url, "content api metric hit");
        let response = self.client.post(url).send().await?;
        Ok(Self::read_json::<MetricHit>(response).await?.views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer) -> HttpContentApi {
        let config = ContentApiConfig {
            base_url: Url::parse(&server.uri()).unwrap(),
            endpoints: Endpoints::default(),
        };
        HttpContentApi::new(&config)
    }

    #[tokio::test]
    async fn test_resolve_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/articles/resolve/x"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"kind": "authored", "parentSlug": "politics", "slug": "x"}"#,
            ))
            .mount(&mock_server)
            .await;

        let identity = api_for(&mock_server).resolve("x").await.unwrap();
        assert_eq!(identity.canonical_path(), "/news/politics/x");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/categories/tech/articles/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/categories/tech/articles/broken"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;

        let api = api_for(&mock_server);
        assert_eq!(
            api.fetch_authored("tech", "missing").await.unwrap_err(),
            ResolveError::NotFound
        );
        assert!(matches!(
            api.fetch_authored("tech", "broken").await.unwrap_err(),
            ResolveError::Network(msg) if msg.contains("502")
        ));
    }

    #[tokio::test]
    async fn test_malformed_payloads() {
        let mock_server = MockServer::start().await;

        // Not JSON at all
        Mock::given(method("GET"))
            .and(path("/articles/resolve/garbage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;
        // JSON without an identity
        Mock::given(method("GET"))
            .and(path("/sources/reuters/articles/x"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"title": "No slug"}"#))
            .mount(&mock_server)
            .await;

        let api = api_for(&mock_server);
        let err = api.resolve("garbage").await.unwrap_err();
        assert!(matches!(err, ResolveError::Malformed(_)), "{err:?}");
        assert!(err.is_not_found());

        let err = api.fetch_imported("reuters", "x").await.unwrap_err();
        assert!(matches!(err, ResolveError::Malformed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_fetch_imported_and_encoding() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sources/reuters/articles/caf%C3%A9%20noir"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"slug": "café noir", "source": "reuters", "title": "Coffee", "link": "https://reuters.com/x"}"#,
            ))
            .mount(&mock_server)
            .await;

        let article = api_for(&mock_server)
            .fetch_imported("reuters", "café noir")
            .await
            .unwrap();
        assert_eq!(article.identity.kind(), ArticleKind::Imported);
        assert_eq!(article.canonical_path(), "/news/source/reuters/café noir");
        assert_eq!(article.title, "Coffee");
    }

    #[tokio::test]
    async fn test_satellite_endpoints() {
        let mock_server = MockServer::start().await;
        let identity = ArticleIdentity::new(ArticleKind::Authored, "tech", "abc").unwrap();

        Mock::given(method("GET"))
            .and(path("/articles/authored/tech/abc/related"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"slug": "one", "category": "tech", "title": "One"},
                    {"title": "broken"},
                    {"slug": "two", "category": "world", "title": "Two"}]"#,
            ))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/articles/authored/tech/abc/hits"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"views": 42}"#))
            .expect(1)
            .mount(&mock_server)
            .await;

        let api = api_for(&mock_server);
        let related = api.fetch_related(&identity).await.unwrap();
        let paths: Vec<String> = related.iter().map(|a| a.canonical_path()).collect();
        assert_eq!(paths, vec!["/news/tech/one", "/news/world/two"]);

        assert_eq!(api.post_metric_hit(&identity).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let config = ContentApiConfig {
            base_url: Url::parse("http://127.0.0.1:1").unwrap(),
            endpoints: Endpoints::default(),
        };
        let err = HttpContentApi::new(&config).resolve("x").await.unwrap_err();
        assert!(matches!(err, ResolveError::Network(_)), "{err:?}");
    }

    #[test]
    fn test_url_templates() {
        let config = ContentApiConfig {
            base_url: Url::parse("https://api.example.com/v1/").unwrap(),
            endpoints: Endpoints {
                resolve: "resolve?slug={slug}".into(),
                ..Endpoints::default()
            },
        };
        let api = HttpContentApi::new(&config);

        assert_eq!(
            api.url(&api.endpoints.resolve, &[("slug", "a b/c")])
                .unwrap()
                .as_str(),
            "https://api.example.com/v1/resolve?slug=a%20b%2Fc"
        );
        assert_eq!(
            api.url(&api.endpoints.authored, &[("category", "tech"), ("slug", "x")])
                .unwrap()
                .as_str(),
            "https://api.example.com/v1/categories/tech/articles/x"
        );
    }
}
